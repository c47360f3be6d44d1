//! Instruction decoding for method bytecode.
//!
//! [`decode`] walks a `Code` buffer opcode by opcode and yields
//! [`Instruction`]s that borrow their operand bytes from the buffer. The
//! sizes of the decoded instructions always sum to the buffer length.

pub mod opcodes;

use crate::error::{Error, Result};
use opcodes::Operands;

/// One decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    /// Byte offset of the opcode within the code buffer
    pub offset: usize,
    pub opcode: u8,
    /// Operand bytes, including switch alignment padding
    pub operands: &'a [u8],
}

impl Instruction<'_> {
    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        1 + self.operands.len()
    }

    /// Big-endian u16 made of the first two operand bytes
    pub fn u16_operand(&self) -> Option<u16> {
        match self.operands {
            [high, low, ..] => Some(u16::from_be_bytes([*high, *low])),
            _ => None,
        }
    }

    /// Constant-pool index loaded by `ldc` / `ldc_w`
    pub fn ldc_index(&self) -> Option<u16> {
        match self.opcode {
            opcodes::LDC => self.operands.first().map(|index| *index as u16),
            opcodes::LDC_W => self.u16_operand(),
            _ => None,
        }
    }
}

/// Decodes a complete code buffer.
///
/// Fails on unknown opcodes and on instructions that run past the end of the
/// buffer.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction<'_>>> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while offset < code.len() {
        let opcode = code[offset];
        let layout = opcodes::operands(opcode).ok_or(Error::UnknownOpcode { opcode, offset })?;
        let length = operand_length(code, offset, layout)?;
        let start = offset + 1;
        let end = start + length;
        if end > code.len() {
            return Err(truncated(offset, opcode, end, code.len()));
        }

        instructions.push(Instruction {
            offset,
            opcode,
            operands: &code[start..end],
        });
        offset = end;
    }

    Ok(instructions)
}

fn truncated(offset: usize, opcode: u8, needed: usize, available: usize) -> Error {
    Error::decode(
        offset,
        format!(
            "opcode 0x{:02x} needs {} bytes of code, buffer has {}",
            opcode, needed, available
        ),
    )
}

fn read_i32(code: &[u8], at: usize, opcode_offset: usize, opcode: u8) -> Result<i32> {
    code.get(at..at + 4)
        .map(|bytes| i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .ok_or_else(|| truncated(opcode_offset, opcode, at + 4, code.len()))
}

/// Operand byte count of the instruction at `offset`
fn operand_length(code: &[u8], offset: usize, layout: Operands) -> Result<usize> {
    let opcode = code[offset];
    match layout {
        Operands::Fixed(length) => Ok(length),
        Operands::Wide => match code.get(offset + 1) {
            Some(&opcodes::IINC) => Ok(5),
            Some(&modified) => match modified {
                // iload..aload, istore..astore, ret
                0x15..=0x19 | 0x36..=0x3A | 0xA9 => Ok(3),
                _ => Err(Error::decode(
                    offset,
                    format!("wide cannot modify opcode 0x{:02x}", modified),
                )),
            },
            None => Err(truncated(offset, opcode, offset + 2, code.len())),
        },
        Operands::TableSwitch | Operands::LookupSwitch => {
            // Operands start at the next multiple of four from the code start
            let padding = (4 - (offset + 1) % 4) % 4;
            let base = offset + 1 + padding;
            let count = if layout == Operands::TableSwitch {
                let low = read_i32(code, base + 4, offset, opcode)?;
                let high = read_i32(code, base + 8, offset, opcode)?;
                if high < low {
                    return Err(Error::decode(
                        offset,
                        format!("tableswitch high {} below low {}", high, low),
                    ));
                }
                let entries = (high as i64 - low as i64 + 1) as usize;
                12 + entries * 4
            } else {
                let pairs = read_i32(code, base + 4, offset, opcode)?;
                if pairs < 0 {
                    return Err(Error::decode(
                        offset,
                        format!("lookupswitch has negative npairs {}", pairs),
                    ));
                }
                8 + pairs as usize * 8
            };
            Ok(padding + count)
        }
    }
}
