//! JVM opcode operand widths.
//!
//! Every opcode must be skipped by exactly its operand width or every offset
//! after it desynchronizes, so the table covers the whole instruction set.

pub const LDC: u8 = 0x12;
pub const LDC_W: u8 = 0x13;
pub const IINC: u8 = 0x84;
pub const TABLESWITCH: u8 = 0xAA;
pub const LOOKUPSWITCH: u8 = 0xAB;
pub const INVOKEVIRTUAL: u8 = 0xB6;
pub const INVOKEINTERFACE: u8 = 0xB9;
pub const WIDE: u8 = 0xC4;

/// How many operand bytes follow an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    /// A fixed number of bytes
    Fixed(usize),
    /// `tableswitch`: padding, default, low, high, jump table
    TableSwitch,
    /// `lookupswitch`: padding, default, npairs, match/offset pairs
    LookupSwitch,
    /// `wide`: 3 bytes, or 5 when the modified opcode is `iinc`
    Wide,
}

/// Operand layout of `opcode`, `None` for reserved or unassigned opcodes
pub fn operands(opcode: u8) -> Option<Operands> {
    let operands = match opcode {
        // nop, aconst_null, iconst_*, lconst_*, fconst_*, dconst_*
        0x00..=0x0F => Operands::Fixed(0),
        // bipush
        0x10 => Operands::Fixed(1),
        // sipush
        0x11 => Operands::Fixed(2),
        LDC => Operands::Fixed(1),
        // ldc_w, ldc2_w
        LDC_W | 0x14 => Operands::Fixed(2),
        // iload, lload, fload, dload, aload
        0x15..=0x19 => Operands::Fixed(1),
        // *load_<n>, *aload
        0x1A..=0x35 => Operands::Fixed(0),
        // istore, lstore, fstore, dstore, astore
        0x36..=0x3A => Operands::Fixed(1),
        // *store_<n>, *astore, stack ops, arithmetic
        0x3B..=0x83 => Operands::Fixed(0),
        IINC => Operands::Fixed(2),
        // conversions, comparisons
        0x85..=0x98 => Operands::Fixed(0),
        // if*, if_*cmp*, goto, jsr
        0x99..=0xA8 => Operands::Fixed(2),
        // ret
        0xA9 => Operands::Fixed(1),
        TABLESWITCH => Operands::TableSwitch,
        LOOKUPSWITCH => Operands::LookupSwitch,
        // *return
        0xAC..=0xB1 => Operands::Fixed(0),
        // getstatic, putstatic, getfield, putfield, invokevirtual,
        // invokespecial, invokestatic
        0xB2..=0xB8 => Operands::Fixed(2),
        // invokeinterface, invokedynamic
        INVOKEINTERFACE | 0xBA => Operands::Fixed(4),
        // new
        0xBB => Operands::Fixed(2),
        // newarray
        0xBC => Operands::Fixed(1),
        // anewarray
        0xBD => Operands::Fixed(2),
        // arraylength, athrow
        0xBE | 0xBF => Operands::Fixed(0),
        // checkcast, instanceof
        0xC0 | 0xC1 => Operands::Fixed(2),
        // monitorenter, monitorexit
        0xC2 | 0xC3 => Operands::Fixed(0),
        WIDE => Operands::Wide,
        // multianewarray
        0xC5 => Operands::Fixed(3),
        // ifnull, ifnonnull
        0xC6 | 0xC7 => Operands::Fixed(2),
        // goto_w, jsr_w
        0xC8 | 0xC9 => Operands::Fixed(4),
        _ => return None,
    };
    Some(operands)
}
