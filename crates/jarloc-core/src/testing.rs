//! Synthetic class-file assembly for tests.

use crate::bytecode::opcodes;
use crate::classfile::{
    AttributeInfo, ClassFile, Constant, ConstantPool, MemberInfo, ACC_ABSTRACT,
};
use std::collections::HashMap;

#[derive(Default)]
pub(crate) struct PoolBuilder {
    pool: ConstantPool,
    utf8s: HashMap<String, u16>,
    strings: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl PoolBuilder {
    pub(crate) fn utf8(&mut self, text: &str) -> u16 {
        if let Some(index) = self.utf8s.get(text) {
            return *index;
        }
        let bytes = crate::classfile::mutf8::encode(text).into_owned();
        let index = self.pool.push(Constant::Utf8(bytes));
        self.utf8s.insert(text.to_string(), index);
        index
    }

    pub(crate) fn string(&mut self, text: &str) -> u16 {
        if let Some(index) = self.strings.get(text) {
            return *index;
        }
        let string_index = self.utf8(text);
        let index = self.pool.push(Constant::String { string_index });
        self.strings.insert(text.to_string(), index);
        index
    }

    pub(crate) fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let index = self.pool.push(Constant::Class { name_index });
        self.classes.insert(name.to_string(), index);
        index
    }

    pub(crate) fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.pool.push(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    pub(crate) fn interface_method(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.pool.push(Constant::InterfaceMethodRef {
            class_index,
            name_and_type_index,
        })
    }

    pub(crate) fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.pool.push(Constant::MethodRef {
            class_index,
            name_and_type_index,
        })
    }
}

/// Emits bytecode for one method body
pub(crate) struct CodeBuilder<'a> {
    pool: &'a mut PoolBuilder,
    code: Vec<u8>,
    lines: Vec<(u16, u16)>,
}

impl CodeBuilder<'_> {
    pub(crate) fn offset(&self) -> u16 {
        self.code.len() as u16
    }

    /// Starts a new source line at the current offset
    pub(crate) fn line(&mut self, line_number: u16) {
        self.lines.push((self.offset(), line_number));
    }

    pub(crate) fn op(&mut self, opcode: u8) {
        self.code.push(opcode);
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Loads a string constant with LDC, or LDC_W when the index needs it
    pub(crate) fn ldc_string(&mut self, text: &str) -> u16 {
        let index = self.pool.string(text);
        self.ldc_index(index);
        index
    }

    /// Loads a string constant with LDC_W regardless of its index
    pub(crate) fn ldc_w_string(&mut self, text: &str) -> u16 {
        let index = self.pool.string(text);
        self.code.push(opcodes::LDC_W);
        self.code.extend_from_slice(&index.to_be_bytes());
        index
    }

    pub(crate) fn ldc_index(&mut self, index: u16) {
        if index <= u8::MAX as u16 {
            self.code.push(opcodes::LDC);
            self.code.push(index as u8);
        } else {
            self.code.push(opcodes::LDC_W);
            self.code.extend_from_slice(&index.to_be_bytes());
        }
    }

    pub(crate) fn constant(&mut self, constant: Constant) -> u16 {
        self.pool.pool.push(constant)
    }

    pub(crate) fn invoke_interface(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.interface_method(owner, name, descriptor);
        self.code.push(opcodes::INVOKEINTERFACE);
        self.code.extend_from_slice(&index.to_be_bytes());
        self.code.extend_from_slice(&[2, 0]);
    }

    pub(crate) fn invoke_virtual(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.method_ref(owner, name, descriptor);
        self.code.push(opcodes::INVOKEVIRTUAL);
        self.code.extend_from_slice(&index.to_be_bytes());
    }
}

/// Assembles a class file through the public [`ClassFile`] model
pub(crate) struct ClassBuilder {
    pool: PoolBuilder,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    methods: Vec<MemberInfo>,
    attributes: Vec<AttributeInfo>,
}

impl ClassBuilder {
    pub(crate) fn new(name: &str) -> Self {
        let mut pool = PoolBuilder::default();
        let this_class = pool.class(name);
        let super_class = pool.class("java/lang/Object");
        Self {
            pool,
            access_flags: 0x0021,
            this_class,
            super_class,
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub(crate) fn access_flags(&mut self, flags: u16) -> &mut Self {
        self.access_flags = flags;
        self
    }

    pub(crate) fn constant(&mut self, constant: Constant) -> u16 {
        self.pool.pool.push(constant)
    }

    pub(crate) fn string(&mut self, text: &str) -> u16 {
        self.pool.string(text)
    }

    /// Pushes `count` Integer constants so later strings get wide indices
    pub(crate) fn pad_pool(&mut self, count: u16) {
        for i in 0..count {
            self.pool.pool.push(Constant::Integer(i as u32));
        }
    }

    pub(crate) fn method(
        &mut self,
        name: &str,
        descriptor: &str,
        body: impl FnOnce(&mut CodeBuilder<'_>),
    ) -> &mut Self {
        self.method_with_flags(0x0001, name, descriptor, body)
    }

    pub(crate) fn method_with_flags(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        body: impl FnOnce(&mut CodeBuilder<'_>),
    ) -> &mut Self {
        let mut builder = CodeBuilder {
            pool: &mut self.pool,
            code: Vec::new(),
            lines: Vec::new(),
        };
        body(&mut builder);
        let CodeBuilder { code, lines, .. } = builder;

        let mut code_attributes = Vec::new();
        if !lines.is_empty() {
            let mut info = Vec::new();
            info.extend_from_slice(&(lines.len() as u16).to_be_bytes());
            for (start_pc, line_number) in &lines {
                info.extend_from_slice(&start_pc.to_be_bytes());
                info.extend_from_slice(&line_number.to_be_bytes());
            }
            code_attributes.push(AttributeInfo {
                name_index: self.pool.utf8("LineNumberTable"),
                info,
            });
        }

        let mut info = Vec::new();
        info.extend_from_slice(&4u16.to_be_bytes());
        info.extend_from_slice(&4u16.to_be_bytes());
        info.extend_from_slice(&(code.len() as u32).to_be_bytes());
        info.extend_from_slice(&code);
        info.extend_from_slice(&0u16.to_be_bytes());
        info.extend_from_slice(&(code_attributes.len() as u16).to_be_bytes());
        for attribute in &code_attributes {
            info.extend_from_slice(&attribute.name_index.to_be_bytes());
            info.extend_from_slice(&(attribute.info.len() as u32).to_be_bytes());
            info.extend_from_slice(&attribute.info);
        }

        let code_attribute = AttributeInfo {
            name_index: self.pool.utf8("Code"),
            info,
        };
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        self.methods.push(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes: vec![code_attribute],
        });
        self
    }

    pub(crate) fn abstract_method(&mut self, name: &str, descriptor: &str) -> &mut Self {
        let name_index = self.pool.utf8(name);
        let descriptor_index = self.pool.utf8(descriptor);
        self.methods.push(MemberInfo {
            access_flags: 0x0001 | ACC_ABSTRACT,
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
        self
    }

    pub(crate) fn class_attribute(&mut self, name: &str, info: Vec<u8>) -> &mut Self {
        let name_index = self.pool.utf8(name);
        self.attributes.push(AttributeInfo { name_index, info });
        self
    }

    pub(crate) fn build_class(&self) -> ClassFile {
        ClassFile {
            minor_version: 0,
            major_version: 52,
            constant_pool: self.pool.pool.clone(),
            access_flags: self.access_flags,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: self.methods.clone(),
            attributes: self.attributes.clone(),
        }
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        self.build_class().write()
    }
}
