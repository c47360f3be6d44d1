//! Class-file model and codec.
//!
//! [`ClassFile::read`] and [`ClassFile::write`] form a lossless pair: an
//! unmodified read→write round trip reproduces the input byte for byte.
//! Attributes are carried as raw `(name_index, info)` pairs and only parsed
//! on demand (see [`attributes`]), so nothing the rewrite engine does not
//! touch is ever re-encoded from a parsed form.
//!
//! ## Layout
//!
//! ```txt
//! magic u4 | minor u2 | major u2 | constant_pool | access_flags u2
//! this_class u2 | super_class u2 | interfaces u2[] | fields | methods
//! attributes
//! ```

pub mod attributes;
pub mod constant_pool;
pub mod mutf8;
pub(crate) mod reader;

use crate::error::{Error, Result};
use bytes::BufMut;
use reader::ByteReader;
use tracing::trace;

pub use attributes::{CodeAttribute, LineNumberEntry};
pub use constant_pool::{Constant, ConstantPool, MemberRef};

/// Class-file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ENUM: u16 = 0x4000;

/// Name of the static initializer method
pub const CLINIT: &str = "<clinit>";

/// An attribute kept as its raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Constant-pool index of the attribute name
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub(crate) fn read_all(reader: &mut ByteReader<'_>) -> Result<Vec<Self>> {
        let count = reader.u16("attributes_count")?;
        let mut attributes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = reader.u16("attribute_name_index")?;
            let length = reader.u32("attribute_length")?;
            let info = reader.bytes(length as usize, "attribute info")?.to_vec();
            attributes.push(Self { name_index, info });
        }
        Ok(attributes)
    }

    fn write_all(attributes: &[Self], out: &mut impl BufMut) {
        out.put_u16(attributes.len() as u16);
        for attribute in attributes {
            out.put_u16(attribute.name_index);
            out.put_u32(attribute.info.len() as u32);
            out.put_slice(&attribute.info);
        }
    }

    /// Finds the first attribute whose name resolves to `name`
    pub fn find<'a>(attributes: &'a [Self], pool: &ConstantPool, name: &str) -> Option<&'a Self> {
        attributes.iter().find(|attribute| {
            pool.utf8_bytes(attribute.name_index)
                .map(|bytes| bytes == name.as_bytes())
                .unwrap_or(false)
        })
    }
}

/// A field or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MemberInfo {
    fn read_all(reader: &mut ByteReader<'_>, what: &str) -> Result<Vec<Self>> {
        let count = reader.u16(what)?;
        let mut members = Vec::with_capacity(count as usize);
        for _ in 0..count {
            members.push(Self {
                access_flags: reader.u16("member access_flags")?,
                name_index: reader.u16("member name_index")?,
                descriptor_index: reader.u16("member descriptor_index")?,
                attributes: AttributeInfo::read_all(reader)?,
            });
        }
        Ok(members)
    }

    fn write_all(members: &[Self], out: &mut impl BufMut) {
        out.put_u16(members.len() as u16);
        for member in members {
            out.put_u16(member.access_flags);
            out.put_u16(member.name_index);
            out.put_u16(member.descriptor_index);
            AttributeInfo::write_all(&member.attributes, out);
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }

    pub fn name(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor(&self, pool: &ConstantPool) -> Result<String> {
        pool.utf8(self.descriptor_index)
    }

    /// Parses the `Code` attribute, `None` for abstract and native methods
    pub fn code(&self, pool: &ConstantPool) -> Result<Option<CodeAttribute>> {
        AttributeInfo::find(&self.attributes, pool, "Code")
            .map(|attribute| CodeAttribute::parse(&attribute.info))
            .transpose()
    }
}

/// A decoded class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    /// Decodes a complete class file. Trailing bytes are an error.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);

        let magic = reader.u32("magic")?;
        if magic != MAGIC {
            return Err(Error::decode(0, format!("bad magic 0x{:08x}", magic)));
        }

        let minor_version = reader.u16("minor_version")?;
        let major_version = reader.u16("major_version")?;
        let constant_pool = ConstantPool::read(&mut reader)?;
        let access_flags = reader.u16("access_flags")?;
        let this_class = reader.u16("this_class")?;
        let super_class = reader.u16("super_class")?;

        let interfaces_count = reader.u16("interfaces_count")?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(reader.u16("interface index")?);
        }

        let fields = MemberInfo::read_all(&mut reader, "fields_count")?;
        let methods = MemberInfo::read_all(&mut reader, "methods_count")?;
        let attributes = AttributeInfo::read_all(&mut reader)?;

        if reader.remaining() != 0 {
            return Err(Error::decode(
                reader.position(),
                format!("{} trailing bytes after class attributes", reader.remaining()),
            ));
        }

        trace!(
            "Decoded class file v{}.{}: {} constants, {} methods",
            major_version,
            minor_version,
            constant_pool.count(),
            methods.len()
        );

        Ok(Self {
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Encodes the class file
    pub fn write(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32(MAGIC);
        out.put_u16(self.minor_version);
        out.put_u16(self.major_version);
        self.constant_pool.write(&mut out);
        out.put_u16(self.access_flags);
        out.put_u16(self.this_class);
        out.put_u16(self.super_class);
        out.put_u16(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            out.put_u16(*interface);
        }
        MemberInfo::write_all(&self.fields, &mut out);
        MemberInfo::write_all(&self.methods, &mut out);
        AttributeInfo::write_all(&self.attributes, &mut out);
        out
    }

    /// Internal name of this class, e.g. `com/example/Main`
    pub fn class_name(&self) -> Result<String> {
        self.constant_pool.class_name(self.this_class)
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & ACC_ENUM != 0
    }
}
