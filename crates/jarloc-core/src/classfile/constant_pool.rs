//! The constant pool: a 1-indexed table of tagged entries.
//!
//! Slot 0 is never valid, and `Long`/`Double` entries occupy two slots; the
//! second slot holds [`Constant::Unusable`]. Only `Utf8` payloads are ever
//! mutated, every other entry is a read-only lookup.

use super::mutf8;
use super::reader::ByteReader;
use crate::error::{Error, Result};
use bytes::BufMut;

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

/// A single constant-pool entry.
///
/// Numeric constants keep their raw bit patterns so that a read/write round
/// trip reproduces NaN payloads exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// Slot 0 and the upper half of a `Long`/`Double`
    Unusable,
    /// Modified UTF-8 payload
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
}

impl Constant {
    /// The class-file tag byte, `None` for [`Constant::Unusable`]
    pub fn tag(&self) -> Option<u8> {
        let tag = match self {
            Constant::Unusable => return None,
            Constant::Utf8(_) => CONSTANT_UTF8,
            Constant::Integer(_) => CONSTANT_INTEGER,
            Constant::Float(_) => CONSTANT_FLOAT,
            Constant::Long(_) => CONSTANT_LONG,
            Constant::Double(_) => CONSTANT_DOUBLE,
            Constant::Class { .. } => CONSTANT_CLASS,
            Constant::String { .. } => CONSTANT_STRING,
            Constant::FieldRef { .. } => CONSTANT_FIELD_REF,
            Constant::MethodRef { .. } => CONSTANT_METHOD_REF,
            Constant::InterfaceMethodRef { .. } => CONSTANT_INTERFACE_METHOD_REF,
            Constant::NameAndType { .. } => CONSTANT_NAME_AND_TYPE,
            Constant::MethodHandle { .. } => CONSTANT_METHOD_HANDLE,
            Constant::MethodType { .. } => CONSTANT_METHOD_TYPE,
            Constant::Dynamic { .. } => CONSTANT_DYNAMIC,
            Constant::InvokeDynamic { .. } => CONSTANT_INVOKE_DYNAMIC,
            Constant::Module { .. } => CONSTANT_MODULE,
            Constant::Package { .. } => CONSTANT_PACKAGE,
        };
        Some(tag)
    }

    /// Whether this entry occupies two pool slots
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let offset = reader.position();
        let tag = reader.u8("constant tag")?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let length = reader.u16("Utf8 length")?;
                Constant::Utf8(reader.bytes(length as usize, "Utf8 bytes")?.to_vec())
            }
            CONSTANT_INTEGER => Constant::Integer(reader.u32("Integer")?),
            CONSTANT_FLOAT => Constant::Float(reader.u32("Float")?),
            CONSTANT_LONG => Constant::Long(reader.u64("Long")?),
            CONSTANT_DOUBLE => Constant::Double(reader.u64("Double")?),
            CONSTANT_CLASS => Constant::Class {
                name_index: reader.u16("Class")?,
            },
            CONSTANT_STRING => Constant::String {
                string_index: reader.u16("String")?,
            },
            CONSTANT_FIELD_REF => Constant::FieldRef {
                class_index: reader.u16("Fieldref")?,
                name_and_type_index: reader.u16("Fieldref")?,
            },
            CONSTANT_METHOD_REF => Constant::MethodRef {
                class_index: reader.u16("Methodref")?,
                name_and_type_index: reader.u16("Methodref")?,
            },
            CONSTANT_INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                class_index: reader.u16("InterfaceMethodref")?,
                name_and_type_index: reader.u16("InterfaceMethodref")?,
            },
            CONSTANT_NAME_AND_TYPE => Constant::NameAndType {
                name_index: reader.u16("NameAndType")?,
                descriptor_index: reader.u16("NameAndType")?,
            },
            CONSTANT_METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: reader.u8("MethodHandle")?,
                reference_index: reader.u16("MethodHandle")?,
            },
            CONSTANT_METHOD_TYPE => Constant::MethodType {
                descriptor_index: reader.u16("MethodType")?,
            },
            CONSTANT_DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: reader.u16("Dynamic")?,
                name_and_type_index: reader.u16("Dynamic")?,
            },
            CONSTANT_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: reader.u16("InvokeDynamic")?,
                name_and_type_index: reader.u16("InvokeDynamic")?,
            },
            CONSTANT_MODULE => Constant::Module {
                name_index: reader.u16("Module")?,
            },
            CONSTANT_PACKAGE => Constant::Package {
                name_index: reader.u16("Package")?,
            },
            other => {
                return Err(Error::decode(
                    offset,
                    format!("unknown constant pool tag {}", other),
                ))
            }
        };
        Ok(constant)
    }

    fn write(&self, out: &mut impl BufMut) {
        let Some(tag) = self.tag() else {
            return;
        };
        out.put_u8(tag);
        match self {
            Constant::Unusable => {}
            Constant::Utf8(bytes) => {
                out.put_u16(bytes.len() as u16);
                out.put_slice(bytes);
            }
            Constant::Integer(bits) | Constant::Float(bits) => out.put_u32(*bits),
            Constant::Long(bits) | Constant::Double(bits) => out.put_u64(*bits),
            Constant::Class { name_index: index }
            | Constant::String {
                string_index: index,
            }
            | Constant::MethodType {
                descriptor_index: index,
            }
            | Constant::Module { name_index: index }
            | Constant::Package { name_index: index } => out.put_u16(*index),
            Constant::FieldRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::MethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::InterfaceMethodRef {
                class_index: first,
                name_and_type_index: second,
            }
            | Constant::NameAndType {
                name_index: first,
                descriptor_index: second,
            }
            | Constant::Dynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            }
            | Constant::InvokeDynamic {
                bootstrap_method_attr_index: first,
                name_and_type_index: second,
            } => {
                out.put_u16(*first);
                out.put_u16(*second);
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                out.put_u8(*reference_kind);
                out.put_u16(*reference_index);
            }
        }
    }
}

/// A resolved field or method reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    /// Internal name of the owning class, e.g. `org/bukkit/entity/Player`
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MemberRef {
    /// Renders `owner#name(descriptor)`
    pub fn signature(&self) -> String {
        format!("{}#{}{}", self.owner, self.name, self.descriptor)
    }
}

/// The constant pool of one class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    /// Creates a pool holding only the invalid slot 0
    pub fn new() -> Self {
        Self {
            entries: vec![Constant::Unusable],
        }
    }

    /// Appends an entry and returns its index. Wide entries reserve their
    /// second slot automatically.
    pub fn push(&mut self, constant: Constant) -> u16 {
        let index = self.entries.len() as u16;
        let wide = constant.is_wide();
        self.entries.push(constant);
        if wide {
            self.entries.push(Constant::Unusable);
        }
        index
    }

    /// The `constant_pool_count` value: number of slots including slot 0
    pub fn count(&self) -> u16 {
        self.entries.len() as u16
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let count = reader.u16("constant_pool_count")?;
        let mut pool = Self {
            entries: Vec::with_capacity(count as usize),
        };
        pool.entries.push(Constant::Unusable);

        while pool.entries.len() < count as usize {
            let constant = Constant::read(reader)?;
            let wide = constant.is_wide();
            pool.entries.push(constant);
            if wide {
                pool.entries.push(Constant::Unusable);
            }
        }

        if pool.entries.len() != count as usize {
            return Err(Error::decode(
                reader.position(),
                "wide constant overruns constant_pool_count",
            ));
        }
        Ok(pool)
    }

    pub(crate) fn write(&self, out: &mut impl BufMut) {
        out.put_u16(self.count());
        for constant in &self.entries[1..] {
            constant.write(out);
        }
    }

    /// Looks up a usable entry. Index 0, out-of-range indices and the upper
    /// half of wide entries are all invalid.
    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(Error::invalid_constant(index, "usable")),
            Some(constant) => Ok(constant),
        }
    }

    /// Raw modified UTF-8 payload of a Utf8 entry
    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            Constant::Utf8(bytes) => Ok(bytes),
            _ => Err(Error::invalid_constant(index, "Utf8")),
        }
    }

    /// Decoded text of a Utf8 entry
    pub fn utf8(&self, index: u16) -> Result<String> {
        self.utf8_bytes(index)
            .map(|bytes| mutf8::decode(bytes).into_owned())
    }

    /// Follows a String entry to the Utf8 entry it indirects to
    pub fn string_utf8_index(&self, index: u16) -> Result<u16> {
        match self.get(index)? {
            Constant::String { string_index } => {
                self.utf8_bytes(*string_index)?;
                Ok(*string_index)
            }
            _ => Err(Error::invalid_constant(index, "String")),
        }
    }

    /// Internal name held by a Class entry
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(Error::invalid_constant(index, "Class")),
        }
    }

    /// Name and descriptor held by a NameAndType entry
    pub fn name_and_type(&self, index: u16) -> Result<(String, String)> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(Error::invalid_constant(index, "NameAndType")),
        }
    }

    /// Resolves a Fieldref, Methodref or InterfaceMethodref entry
    pub fn member_ref(&self, index: u16) -> Result<MemberRef> {
        match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            }
            | Constant::MethodRef {
                class_index,
                name_and_type_index,
            }
            | Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            _ => Err(Error::invalid_constant(index, "member reference")),
        }
    }

    /// Overwrites the payload of a Utf8 entry with `value` in modified UTF-8.
    ///
    /// Fails without touching the pool if `index` is not a Utf8 entry or the
    /// encoded value does not fit the u16 length prefix.
    pub fn set_utf8(&mut self, index: u16, value: &str) -> Result<()> {
        let encoded = mutf8::encode(value);
        if encoded.len() > crate::MAX_UTF8_LEN {
            return Err(Error::StringTooLong { len: encoded.len() });
        }
        match self.entries.get_mut(index as usize) {
            Some(Constant::Utf8(bytes)) => {
                *bytes = encoded.into_owned();
                Ok(())
            }
            _ => Err(Error::invalid_constant(index, "Utf8")),
        }
    }

    /// Iterates `(index, entry)` over every usable slot
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }
}
