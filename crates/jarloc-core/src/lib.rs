//! # jarloc-core
//!
//! A library for locating and rewriting the string constants compiled into
//! JVM class files inside a jar, without decompiling them.
//!
//! This crate provides the core functionality for:
//! - Decoding and re-encoding class files losslessly
//! - Finding every string a method loads, with its source line and use site
//! - Overwriting those strings in place and writing the jar back out
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`classfile`]: Class-file model, constant pool and modified UTF-8
//! - [`bytecode`]: Instruction decoding for method bodies
//! - [`scanner`]: Per-class string discovery, use-site classification, line mapping
//! - [`rewrite`]: Applying edits back into an archive
//! - [`archive`]: Jar and in-memory entry containers
//! - [`pipeline`]: Sequential scan over a whole archive with progress and cancellation
//! - [`filter`]: Word filtering over found strings
//! - [`descriptor`]: Java-source rendering of method descriptors
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use jarloc_core::{rewrite, JarArchive, ScanPipeline};
//!
//! let mut jar = JarArchive::open("./plugin.jar")?;
//! let report = ScanPipeline::new().run_with(&mut jar, |_| {});
//!
//! let edits: Vec<_> = report
//!     .strings()
//!     .filter(|s| s.value == "Hello")
//!     .map(|s| s.edit("Hola"))
//!     .collect();
//! rewrite(&mut jar, &edits)?;
//! jar.save("./Translated.jar")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! [`Archive`] abstracts the container: anything that can list, read and
//! replace named entries can be scanned and rewritten.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, unreachable_pub)]

pub mod archive;
pub mod bytecode;
pub mod classfile;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod rewrite;
pub mod scanner;

#[cfg(test)]
mod testing;

// Re-export primary types for convenience
pub use archive::{Archive, JarArchive, MemoryArchive};
pub use classfile::ClassFile;
pub use descriptor::pretty_method;
pub use error::{Error, Result};
pub use filter::{filter_strings, FilterConfig};
pub use pipeline::{CancelToken, PipelineConfig, ScanEvent, ScanPipeline, ScanReport, SkippedEntry};
pub use rewrite::{rewrite, Edit, RewriteSummary};
pub use scanner::{Category, ClassScan, FoundString, Location, MethodStrings, Scanner, ScannerConfig};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest encoded length of a Utf8 constant
pub const MAX_UTF8_LEN: usize = u16::MAX as usize;
