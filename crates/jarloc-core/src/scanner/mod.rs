//! String constant scanning for single class files.
//!
//! ## Algorithm Overview
//!
//! 1. Decode the class file and walk its methods in declaration order
//! 2. Skip abstract methods, methods without `Code`, and the static
//!    initializer of enum classes (its strings are compiler-synthesized
//!    constant names)
//! 3. Decode each method body and look at every `ldc` / `ldc_w`
//! 4. Keep loads of `String` constants whose Utf8 index has not been seen
//!    yet in this class, resolving location and use-site category
//!
//! Methods that yield no strings are left out of the result.

pub mod context;
pub mod location;

use crate::bytecode;
use crate::classfile::{ClassFile, Constant, MemberInfo, CLINIT};
use crate::error::Result;
use crate::rewrite::Edit;
use std::collections::HashSet;
use tracing::{debug, trace};

pub use context::{classify, Category};
pub use location::{line_for_offset, resolve_location, Location};

/// A string constant found in a class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundString {
    /// Position in discovery order across one scan run
    pub id: usize,
    /// Archive entry holding the class file
    pub owner_entry: String,
    /// Index of the Utf8 entry holding the text; edits target this index
    pub utf8_index: u16,
    /// Index of the String entry the load referenced
    pub string_index: u16,
    pub value: String,
    pub class_name: String,
    pub method_signature: String,
    pub line_number: Option<u16>,
    pub context: Option<Category>,
}

impl FoundString {
    /// Builds an edit replacing this string's text
    pub fn edit(&self, new_value: impl Into<String>) -> Edit {
        Edit {
            owner_entry: self.owner_entry.clone(),
            utf8_index: self.utf8_index,
            new_value: new_value.into(),
        }
    }
}

/// Strings found in one method, in load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodStrings {
    /// Position of the method in the class file's method table
    pub method_index: usize,
    pub method_signature: String,
    pub strings: Vec<FoundString>,
}

/// Result of scanning one class file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassScan {
    /// Archive entry the class was read from
    pub entry: String,
    pub class_name: String,
    pub methods: Vec<MethodStrings>,
}

impl ClassScan {
    /// All found strings in discovery order
    pub fn strings(&self) -> impl Iterator<Item = &FoundString> + '_ {
        self.methods.iter().flat_map(|method| method.strings.iter())
    }

    /// Number of found strings
    pub fn len(&self) -> usize {
        self.methods.iter().map(|method| method.strings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Skip `<clinit>` of enum classes
    pub skip_enum_initializers: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_enum_initializers: true,
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether enum static initializers are skipped
    pub fn skip_enum_initializers(mut self, skip: bool) -> Self {
        self.skip_enum_initializers = skip;
        self
    }
}

/// Scanner for string constants in class files
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Scans one class file. `entry` names its archive entry and is copied
    /// into every [`FoundString`]; ids are numbered from zero.
    ///
    /// Any decoding failure fails the whole class file.
    pub fn scan(&self, entry: &str, data: &[u8]) -> Result<ClassScan> {
        let class_file = ClassFile::read(data)?;
        let class_name = class_file.class_name()?;
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        let mut next_id = 0;

        for (method_index, method) in class_file.methods.iter().enumerate() {
            if let Some(found) = self.scan_method(
                &class_file,
                &class_name,
                entry,
                method_index,
                method,
                &mut seen,
                &mut next_id,
            )? {
                methods.push(found);
            }
        }

        debug!(
            "Scanned {}: {} strings in {} methods",
            entry,
            seen.len(),
            methods.len()
        );

        Ok(ClassScan {
            entry: entry.to_string(),
            class_name,
            methods,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_method(
        &self,
        class_file: &ClassFile,
        class_name: &str,
        entry: &str,
        method_index: usize,
        method: &MemberInfo,
        seen: &mut HashSet<u16>,
        next_id: &mut usize,
    ) -> Result<Option<MethodStrings>> {
        if method.is_abstract() {
            return Ok(None);
        }

        let pool = &class_file.constant_pool;
        let name = method.name(pool)?;
        let descriptor = method.descriptor(pool)?;

        if self.config.skip_enum_initializers
            && class_file.is_enum()
            && name == CLINIT
            && descriptor == "()V"
        {
            trace!("Skipping enum initializer of {}", class_name);
            return Ok(None);
        }

        let Some(code) = method.code(pool)? else {
            return Ok(None);
        };
        if code.code.is_empty() {
            return Ok(None);
        }

        let instructions = bytecode::decode(&code.code)?;
        let method_signature = format!("{}{}", name, descriptor);
        let mut strings = Vec::new();

        for (i, instruction) in instructions.iter().enumerate() {
            let Some(index) = instruction.ldc_index() else {
                continue;
            };
            if !matches!(pool.get(index)?, Constant::String { .. }) {
                continue;
            }

            let utf8_index = pool.string_utf8_index(index)?;
            if !seen.insert(utf8_index) {
                continue;
            }

            let value = pool.utf8(utf8_index)?;
            let location = resolve_location(class_file, method, &code, instruction.offset)?;
            trace!(
                "{}#{} offset {}: #{} {:?}",
                class_name,
                method_signature,
                instruction.offset,
                utf8_index,
                value
            );

            strings.push(FoundString {
                id: *next_id,
                owner_entry: entry.to_string(),
                utf8_index,
                string_index: index,
                value,
                class_name: location.class_name,
                method_signature: location.method_signature,
                line_number: location.line_number,
                context: classify(pool, &instructions, i),
            });
            *next_id += 1;
        }

        if strings.is_empty() {
            return Ok(None);
        }
        Ok(Some(MethodStrings {
            method_index,
            method_signature,
            strings,
        }))
    }
}
