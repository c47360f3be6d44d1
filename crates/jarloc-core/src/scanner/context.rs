//! Use-site classification of loaded strings.
//!
//! Only the instruction immediately after the load is inspected. A string
//! that is concatenated, stored in a local, or passed through a builder
//! chain before reaching a sink is not classified.

use crate::bytecode::{opcodes, Instruction};
use crate::classfile::ConstantPool;
use std::fmt;
use tracing::trace;

/// What a string constant is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Passed straight to a chat/console message send
    SendMessage,
    /// Passed straight to an item display-name setter
    ItemDisplayName,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SendMessage => "SendMessage",
            Category::ItemDisplayName => "ItemDisplayName",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known sink signatures, `owner#name(descriptor)`
const SINKS: &[(&str, Category)] = &[
    (
        "org/bukkit/command/CommandSender#sendMessage(Ljava/lang/String;)V",
        Category::SendMessage,
    ),
    (
        "org/bukkit/entity/Player#sendMessage(Ljava/lang/String;)V",
        Category::SendMessage,
    ),
    (
        "org/bukkit/inventory/meta/ItemMeta#setDisplayName(Ljava/lang/String;)V",
        Category::ItemDisplayName,
    ),
];

/// Looks up a sink signature
pub fn sink_category(signature: &str) -> Option<Category> {
    SINKS
        .iter()
        .find(|(sink, _)| *sink == signature)
        .map(|(_, category)| *category)
}

/// Classifies the string loaded by `instructions[load_index]`.
///
/// Returns `None` unless the next instruction is an `invokeinterface` whose
/// method reference is a known sink. Unresolvable references also yield
/// `None`; classification never fails a scan.
pub fn classify(
    pool: &ConstantPool,
    instructions: &[Instruction<'_>],
    load_index: usize,
) -> Option<Category> {
    let next = instructions.get(load_index + 1)?;
    if next.opcode != opcodes::INVOKEINTERFACE {
        return None;
    }

    let method_index = next.u16_operand()?;
    let member = match pool.member_ref(method_index) {
        Ok(member) => member,
        Err(e) => {
            trace!("Unresolvable invokeinterface target at {}: {}", next.offset, e);
            return None;
        }
    };
    sink_category(&member.signature())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::decode;
    use crate::classfile::ClassFile;
    use crate::testing::{ClassBuilder, CodeBuilder};

    fn classify_first_load(build: impl FnOnce(&mut CodeBuilder<'_>)) -> Option<Category> {
        let mut builder = ClassBuilder::new("Plugin");
        builder.method("run", "()V", build);
        let class = ClassFile::read(&builder.build()).unwrap();
        let code = class.methods[0]
            .code(&class.constant_pool)
            .unwrap()
            .unwrap();
        let instructions = decode(&code.code).unwrap();
        let load = instructions
            .iter()
            .position(|i| i.ldc_index().is_some())
            .unwrap();
        classify(&class.constant_pool, &instructions, load)
    }

    #[test]
    fn test_send_message_sinks() {
        for owner in ["org/bukkit/entity/Player", "org/bukkit/command/CommandSender"] {
            let category = classify_first_load(|m| {
                m.op(0x2B); // aload_1
                m.ldc_string("Welcome!");
                m.invoke_interface(owner, "sendMessage", "(Ljava/lang/String;)V");
                m.op(0xB1);
            });
            assert_eq!(category, Some(Category::SendMessage));
        }
    }

    #[test]
    fn test_display_name_sink() {
        let category = classify_first_load(|m| {
            m.ldc_string("Excalibur");
            m.invoke_interface(
                "org/bukkit/inventory/meta/ItemMeta",
                "setDisplayName",
                "(Ljava/lang/String;)V",
            );
            m.op(0xB1);
        });
        assert_eq!(category, Some(Category::ItemDisplayName));
    }

    #[test]
    fn test_unknown_interface_method() {
        let category = classify_first_load(|m| {
            m.ldc_string("key");
            m.invoke_interface("java/util/Map", "get", "(Ljava/lang/Object;)Ljava/lang/Object;");
            m.op(0xB1);
        });
        assert_eq!(category, None);
    }

    #[test]
    fn test_virtual_call_is_not_classified() {
        let category = classify_first_load(|m| {
            m.ldc_string("Hello");
            m.invoke_virtual("org/bukkit/entity/Player", "sendMessage", "(Ljava/lang/String;)V");
            m.op(0xB1);
        });
        assert_eq!(category, None);
    }

    #[test]
    fn test_only_next_instruction_counts() {
        let category = classify_first_load(|m| {
            m.ldc_string("Hello");
            m.op(0x4C); // astore_1
            m.op(0x2B); // aload_1
            m.invoke_interface("org/bukkit/entity/Player", "sendMessage", "(Ljava/lang/String;)V");
            m.op(0xB1);
        });
        assert_eq!(category, None);
    }

    #[test]
    fn test_load_as_last_instruction() {
        let category = classify_first_load(|m| {
            m.ldc_string("dangling");
        });
        assert_eq!(category, None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        fn send_hi(m: &mut CodeBuilder<'_>) {
            m.ldc_string("Hi");
            m.invoke_interface("org/bukkit/entity/Player", "sendMessage", "(Ljava/lang/String;)V");
            m.op(0xB1);
        }
        let first = classify_first_load(send_hi);
        let second = classify_first_load(send_hi);
        assert_eq!(first, second);
    }
}
