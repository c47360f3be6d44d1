//! Applying string edits back into an archive.
//!
//! Edits are grouped by the entry that owns them. Each owner is decoded once
//! per [`rewrite`] call no matter how many edits target it, patched in its
//! constant pool, re-encoded and written back. Entries without edits are
//! never read, so they stay byte-identical.

use crate::archive::Archive;
use crate::classfile::{ClassFile, Constant};
use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Replacement text for one Utf8 constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Archive entry holding the class file
    pub owner_entry: String,
    /// Constant-pool index of the Utf8 entry to overwrite
    pub utf8_index: u16,
    pub new_value: String,
}

impl Edit {
    pub fn new(owner_entry: impl Into<String>, utf8_index: u16, new_value: impl Into<String>) -> Self {
        Self {
            owner_entry: owner_entry.into(),
            utf8_index,
            new_value: new_value.into(),
        }
    }
}

/// What a rewrite call touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Entries re-encoded and replaced
    pub entries: usize,
    /// Edits applied
    pub edits: usize,
}

/// Applies `edits` to `archive`.
///
/// Every owner is checked for presence before any entry is decoded; a
/// missing owner fails the whole call with `ArchiveEntryMissing`. A failure
/// while patching one owner (an index that is not a Utf8 entry, a value too
/// long to encode) aborts the call; owners already written back stay written.
/// Later edits to the same index win.
pub fn rewrite<A: Archive + ?Sized>(archive: &mut A, edits: &[Edit]) -> Result<RewriteSummary> {
    // Owners in first-appearance order, each with its edits in call order
    let mut owners: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Edit>> = HashMap::new();
    for edit in edits {
        let group = groups.entry(edit.owner_entry.as_str()).or_insert_with(|| {
            owners.push(edit.owner_entry.as_str());
            Vec::new()
        });
        group.push(edit);
    }

    if let Some(missing) = owners.iter().find(|owner| !archive.contains(owner)) {
        return Err(Error::entry_missing(*missing));
    }

    let mut summary = RewriteSummary::default();
    for owner in owners {
        let group = groups.remove(owner).unwrap_or_default();
        let data = archive.read_entry(owner)?;
        let mut class = ClassFile::read(&data)?;

        for edit in &group {
            trace!("{} #{} -> {:?}", owner, edit.utf8_index, edit.new_value);
            if has_non_string_use(&class, edit.utf8_index) {
                warn!(
                    "{} #{} is also used as a name or descriptor; renaming it too",
                    owner, edit.utf8_index
                );
            }
            class
                .constant_pool
                .set_utf8(edit.utf8_index, &edit.new_value)?;
        }

        archive.replace_entry(owner, class.write())?;
        debug!("Rewrote {} with {} edits", owner, group.len());
        summary.entries += 1;
        summary.edits += group.len();
    }

    Ok(summary)
}

/// Whether anything other than a `String` constant points at Utf8 `index`:
/// class, member and attribute names, descriptors, module and package names.
fn has_non_string_use(class: &ClassFile, index: u16) -> bool {
    let in_pool = class.constant_pool.iter().any(|(_, constant)| match constant {
        Constant::Class { name_index }
        | Constant::Module { name_index }
        | Constant::Package { name_index } => *name_index == index,
        Constant::NameAndType {
            name_index,
            descriptor_index,
        } => *name_index == index || *descriptor_index == index,
        Constant::MethodType { descriptor_index } => *descriptor_index == index,
        _ => false,
    });

    let in_members = class.fields.iter().chain(&class.methods).any(|member| {
        member.name_index == index
            || member.descriptor_index == index
            || member.attributes.iter().any(|a| a.name_index == index)
    });

    in_pool || in_members || class.attributes.iter().any(|a| a.name_index == index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::classfile::Constant;
    use crate::scanner::Scanner;
    use crate::testing::ClassBuilder;
    use pretty_assertions::assert_eq;

    fn greeting_class() -> Vec<u8> {
        let mut builder = ClassBuilder::new("com/example/Greeter");
        builder.method("greet", "()V", |m| {
            m.line(1);
            m.ldc_string("Hello");
            m.op(0x57);
            m.ldc_string("World");
            m.op(0x57);
            m.op(0xB1);
        });
        builder.build()
    }

    fn archive_with(entries: &[(&str, Vec<u8>)]) -> MemoryArchive {
        entries
            .iter()
            .map(|(name, data)| (name.to_string(), data.clone()))
            .collect()
    }

    #[test]
    fn test_rewrite_changes_only_target_entry() {
        let original = greeting_class();
        let mut archive = archive_with(&[("Greeter.class", original.clone())]);
        let scan = Scanner::new().scan("Greeter.class", &original).unwrap();
        let hello = scan.strings().find(|s| s.value == "Hello").unwrap();

        let summary = rewrite(&mut archive, &[hello.edit("Hola")]).unwrap();
        assert_eq!(summary, RewriteSummary { entries: 1, edits: 1 });

        let before = ClassFile::read(&original).unwrap();
        let after = ClassFile::read(archive.get("Greeter.class").unwrap()).unwrap();
        assert_eq!(after.constant_pool.utf8(hello.utf8_index).unwrap(), "Hola");

        for (index, constant) in before.constant_pool.iter() {
            if index != hello.utf8_index {
                assert_eq!(after.constant_pool.get(index).unwrap(), constant);
            }
        }
        assert_eq!(after.methods, before.methods);
        assert_eq!(after.attributes, before.attributes);
    }

    #[test]
    fn test_untouched_entries_stay_identical() {
        let greeter = greeting_class();
        let other = ClassBuilder::new("Other").build();
        let mut archive = archive_with(&[
            ("Greeter.class", greeter.clone()),
            ("Other.class", other.clone()),
            ("plugin.yml", b"name: Demo".to_vec()),
        ]);
        let scan = Scanner::new().scan("Greeter.class", &greeter).unwrap();
        let edits: Vec<_> = scan.strings().map(|s| s.edit(s.value.to_uppercase())).collect();

        let summary = rewrite(&mut archive, &edits).unwrap();
        assert_eq!(summary, RewriteSummary { entries: 1, edits: 2 });
        assert_eq!(archive.get("Other.class"), Some(other.as_slice()));
        assert_eq!(archive.get("plugin.yml"), Some(&b"name: Demo"[..]));

        let rescanned = Scanner::new()
            .scan("Greeter.class", archive.get("Greeter.class").unwrap())
            .unwrap();
        let values: Vec<_> = rescanned.strings().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["HELLO", "WORLD"]);
    }

    #[test]
    fn test_empty_edit_list_is_a_no_op() {
        let mut archive = archive_with(&[("Greeter.class", greeting_class())]);
        let before = archive.clone();
        assert_eq!(rewrite(&mut archive, &[]).unwrap(), RewriteSummary::default());
        assert_eq!(archive, before);
    }

    #[test]
    fn test_supplementary_and_nul_characters() {
        let original = greeting_class();
        let mut archive = archive_with(&[("Greeter.class", original.clone())]);
        let scan = Scanner::new().scan("Greeter.class", &original).unwrap();
        let hello = scan.strings().next().unwrap();

        let value = "Hi \u{1F600}\0end";
        rewrite(&mut archive, &[hello.edit(value)]).unwrap();

        let class = ClassFile::read(archive.get("Greeter.class").unwrap()).unwrap();
        let raw = class.constant_pool.utf8_bytes(hello.utf8_index).unwrap();
        // Surrogate pair as two 3-byte sequences, NUL as 0xC0 0x80
        assert!(raw.windows(2).any(|w| w == [0xC0, 0x80]));
        assert!(!raw.contains(&0x00));
        assert!(!raw.contains(&0xF0));
        assert_eq!(class.constant_pool.utf8(hello.utf8_index).unwrap(), value);
    }

    #[test]
    fn test_missing_owner_fails_before_writing() {
        let original = greeting_class();
        let mut archive = archive_with(&[("Greeter.class", original.clone())]);
        let edits = [
            Edit::new("Greeter.class", 1, "changed"),
            Edit::new("Gone.class", 1, "x"),
        ];
        let err = rewrite(&mut archive, &edits).unwrap_err();
        assert!(matches!(err, Error::ArchiveEntryMissing { ref name } if name == "Gone.class"));
        assert_eq!(archive.get("Greeter.class"), Some(original.as_slice()));
    }

    #[test]
    fn test_non_utf8_target_rejected() {
        let mut builder = ClassBuilder::new("Numbers");
        let int_index = builder.constant(Constant::Integer(7));
        let string_index = builder.string("text");
        let mut archive = archive_with(&[("Numbers.class", builder.build())]);

        for index in [int_index, string_index, 0, 999] {
            let err = rewrite(&mut archive, &[Edit::new("Numbers.class", index, "x")]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConstantReference { .. }),
                "index {}: {}",
                index,
                err
            );
        }
    }

    #[test]
    fn test_value_too_long() {
        let original = greeting_class();
        let mut archive = archive_with(&[("Greeter.class", original.clone())]);
        let scan = Scanner::new().scan("Greeter.class", &original).unwrap();
        let hello = scan.strings().next().unwrap();

        let err = rewrite(&mut archive, &[hello.edit("x".repeat(70_000))]).unwrap_err();
        assert!(matches!(err, Error::StringTooLong { len: 70_000 }));
    }

    #[test]
    fn test_repeated_index_last_edit_wins() {
        let original = greeting_class();
        let mut archive = archive_with(&[("Greeter.class", original.clone())]);
        let scan = Scanner::new().scan("Greeter.class", &original).unwrap();
        let hello = scan.strings().next().unwrap();

        let summary = rewrite(&mut archive, &[hello.edit("first"), hello.edit("second")]).unwrap();
        assert_eq!(summary, RewriteSummary { entries: 1, edits: 2 });
        let class = ClassFile::read(archive.get("Greeter.class").unwrap()).unwrap();
        assert_eq!(class.constant_pool.utf8(hello.utf8_index).unwrap(), "second");
    }

    #[test]
    fn test_shared_utf8_is_detected_and_still_rewritten() {
        let mut builder = ClassBuilder::new("com/example/Cmd");
        // The method name and the literal share one Utf8 entry
        builder.method("reload", "()V", |m| {
            m.ldc_string("reload");
            m.op(0x57);
            m.ldc_string("Reloaded!");
            m.op(0x57);
            m.op(0xB1);
        });
        let original = builder.build();
        let scan = Scanner::new().scan("Cmd.class", &original).unwrap();
        let shared = scan.strings().find(|s| s.value == "reload").unwrap();
        let plain = scan.strings().find(|s| s.value == "Reloaded!").unwrap();

        let class = ClassFile::read(&original).unwrap();
        assert!(has_non_string_use(&class, shared.utf8_index));
        assert!(!has_non_string_use(&class, plain.utf8_index));

        let mut archive = archive_with(&[("Cmd.class", original)]);
        rewrite(&mut archive, &[shared.edit("recargar")]).unwrap();
        let class = ClassFile::read(archive.get("Cmd.class").unwrap()).unwrap();
        assert_eq!(class.methods[0].name(&class.constant_pool).unwrap(), "recargar");
    }
}
