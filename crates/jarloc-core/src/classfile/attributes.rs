//! Lazily parsed views over raw attributes.
//!
//! Attributes stay as raw bytes inside [`super::ClassFile`]; the scanner only
//! needs `Code` and its `LineNumberTable`, so those are parsed on demand and
//! never written back.

use super::reader::ByteReader;
use super::AttributeInfo;
use crate::error::Result;

/// The parts of a `Code` attribute the scanner reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Raw bytecode
    pub code: Vec<u8>,
    /// Nested attributes such as `LineNumberTable`
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    /// Parses the payload of a `Code` attribute
    pub fn parse(info: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(info);
        let max_stack = reader.u16("Code max_stack")?;
        let max_locals = reader.u16("Code max_locals")?;
        let code_length = reader.u32("Code code_length")?;
        let code = reader.bytes(code_length as usize, "Code bytecode")?.to_vec();
        let exception_table_length = reader.u16("Code exception_table_length")?;
        reader.skip(exception_table_length as usize * 8, "Code exception table")?;
        let attributes = AttributeInfo::read_all(&mut reader)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
            attributes,
        })
    }
}

/// One `LineNumberTable` row: bytecode offset where `line_number` begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

/// Parses the payload of a `LineNumberTable` attribute
pub fn parse_line_number_table(info: &[u8]) -> Result<Vec<LineNumberEntry>> {
    let mut reader = ByteReader::new(info);
    let length = reader.u16("LineNumberTable length")?;
    let mut rows = Vec::with_capacity(length as usize);
    for _ in 0..length {
        rows.push(LineNumberEntry {
            start_pc: reader.u16("LineNumberTable start_pc")?,
            line_number: reader.u16("LineNumberTable line_number")?,
        });
    }
    Ok(rows)
}
