//! Source locations for string loads.

use crate::classfile::attributes::{parse_line_number_table, LineNumberEntry};
use crate::classfile::{ClassFile, CodeAttribute, MemberInfo};
use crate::error::Result;

/// Where a string constant is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Internal name of the class, e.g. `com/example/Main`
    pub class_name: String,
    /// Method name followed by its descriptor, e.g. `main([Ljava/lang/String;)V`
    pub method_signature: String,
    /// Source line, when the method carries a `LineNumberTable`
    pub line_number: Option<u16>,
}

/// Collects every `LineNumberTable` row of a method body, in table order
pub fn line_number_rows(class: &ClassFile, code: &CodeAttribute) -> Result<Vec<LineNumberEntry>> {
    let mut rows = Vec::new();
    for attribute in &code.attributes {
        let is_table = class
            .constant_pool
            .utf8_bytes(attribute.name_index)
            .map(|name| name == b"LineNumberTable")
            .unwrap_or(false);
        if is_table {
            rows.extend(parse_line_number_table(&attribute.info)?);
        }
    }
    Ok(rows)
}

/// Maps a bytecode offset to a source line.
///
/// Row `i` covers offsets from its `start_pc` up to the next row's
/// `start_pc`; the last row is open-ended. An offset sitting exactly on a
/// row boundary belongs to the row that starts there, which is where the
/// class file says that line begins. Rows are tried in order and the first
/// covering row wins.
pub fn line_for_offset(rows: &[LineNumberEntry], offset: usize) -> Option<u16> {
    rows.iter().enumerate().find_map(|(i, row)| {
        let start = row.start_pc as usize;
        let covers = match rows.get(i + 1) {
            Some(next) => offset >= start && offset < next.start_pc as usize,
            None => offset >= start,
        };
        covers.then_some(row.line_number)
    })
}

/// Resolves class name, method signature and source line for the
/// instruction at `offset` in `method`.
///
/// A missing `LineNumberTable` leaves the line unknown; it is not an error.
pub fn resolve_location(
    class: &ClassFile,
    method: &MemberInfo,
    code: &CodeAttribute,
    offset: usize,
) -> Result<Location> {
    let pool = &class.constant_pool;
    let class_name = class.class_name()?;
    let method_signature = format!("{}{}", method.name(pool)?, method.descriptor(pool)?);
    let rows = line_number_rows(class, code)?;
    Ok(Location {
        class_name,
        method_signature,
        line_number: line_for_offset(&rows, offset),
    })
}
