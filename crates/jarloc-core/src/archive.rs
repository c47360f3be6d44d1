//! Archive access for the scan and rewrite passes.
//!
//! The core only needs to list entries, read them, and replace their bytes.
//! [`JarArchive`] keeps the zip container closed over untouched entries:
//! when saved, those are raw-copied so their compressed bytes stay as they
//! were, and only replaced entries are recompressed.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, trace};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// An ordered collection of named byte entries
pub trait Archive {
    /// Entry names in listing order
    fn entry_names(&self) -> Vec<String>;

    /// Reads the current bytes of an entry
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Replaces the bytes of an existing entry
    fn replace_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()>;

    fn contains(&self, name: &str) -> bool;

    /// Names of `.class` entries in listing order
    fn class_entries(&self) -> Vec<String> {
        self.entry_names()
            .into_iter()
            .filter(|name| is_class_entry(name))
            .collect()
    }
}

/// Whether an entry name denotes a class file
pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class")
}

/// Entries held in memory, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryArchive {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, or overwrites it in place if the name exists
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, bytes)) => *bytes = data,
            None => self.entries.push((name, data)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<u8>)> for MemoryArchive {
    fn from_iter<I: IntoIterator<Item = (N, Vec<u8>)>>(iter: I) -> Self {
        let mut archive = Self::new();
        for (name, data) in iter {
            archive.insert(name, data);
        }
        archive
    }
}

impl Archive for MemoryArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.get(name)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::entry_missing(name))
    }

    fn replace_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        let slot = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .ok_or_else(|| Error::entry_missing(name))?;
        slot.1 = data;
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// A jar (zip) file with pending entry replacements
pub struct JarArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    names: Vec<String>,
    replaced: HashMap<String, Vec<u8>>,
}

impl std::fmt::Debug for JarArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JarArchive")
            .field("entries", &self.names.len())
            .field("replaced", &self.replaced.len())
            .finish()
    }
}

impl JarArchive {
    /// Opens a jar file from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| Error::file_read(path, e))?;
        debug!("Opened {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    /// Reads a jar held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut zip = ZipArchive::new(Cursor::new(data))?;
        // Index order is the central directory listing; file_names() is hash ordered
        let mut names = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            names.push(zip.by_index_raw(index)?.name().to_string());
        }
        trace!("Jar lists {} entries", names.len());
        Ok(Self {
            zip,
            names,
            replaced: HashMap::new(),
        })
    }

    /// Whether any entry has been replaced since opening
    pub fn is_modified(&self) -> bool {
        !self.replaced.is_empty()
    }

    /// Writes the archive with all replacements applied
    pub fn write_to<W: Write + Seek>(&mut self, writer: W) -> Result<W> {
        let mut out = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..self.zip.len() {
            let file = self.zip.by_index_raw(index)?;
            let name = file.name().to_string();
            match self.replaced.get(&name) {
                Some(data) => {
                    out.start_file(name.as_str(), options)?;
                    out.write_all(data).map_err(ZipError::from)?;
                    trace!("Recompressed {}", name);
                }
                None => out.raw_copy_file(file)?,
            }
        }

        Ok(out.finish()?)
    }

    /// Writes the archive to `path`
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.write_to(Cursor::new(Vec::new()))?.into_inner();
        fs::write(path, &bytes).map_err(|e| Error::file_write(path, e))?;
        debug!(
            "Saved {} ({} entries replaced)",
            path.display(),
            self.replaced.len()
        );
        Ok(())
    }
}

impl Archive for JarArchive {
    fn entry_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        if let Some(data) = self.replaced.get(name) {
            return Ok(data.clone());
        }
        let mut file = match self.zip.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Err(Error::entry_missing(name)),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data).map_err(ZipError::from)?;
        Ok(data)
    }

    fn replace_entry(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::entry_missing(name));
        }
        self.replaced.insert(name.to_string(), data);
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }
}

/// Builds a jar in memory from `(name, bytes)` pairs, Deflate-compressed
pub fn build_jar<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Result<Vec<u8>> {
    let mut out = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        if name.ends_with('/') {
            out.add_directory(name, options)?;
        } else {
            out.start_file(name, options)?;
            out.write_all(data).map_err(ZipError::from)?;
        }
    }
    Ok(out.finish()?.into_inner())
}
