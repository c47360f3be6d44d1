//! Sequential scan over every class entry of an archive.
//!
//! Entries are visited one at a time in listing order so that only one
//! decompressed class is alive at once. Observers receive a
//! [`ScanEvent::Progress`] every `progress_interval` entries, a
//! [`ScanEvent::Found`] per string, and exactly one terminal
//! [`ScanEvent::Finished`] carrying the report, partial if cancelled.

use crate::archive::Archive;
use crate::scanner::{ClassScan, FoundString, Scanner, ScannerConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag shared between a pipeline and its caller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the running scan stops before its next entry
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A signal emitted while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// `processed` of `total` class entries visited
    Progress { processed: usize, total: usize },
    Found(FoundString),
    Finished(ScanReport),
}

/// A class entry that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub entry: String,
    pub reason: String,
}

/// Accumulated result of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Classes that yielded at least one string, in listing order
    pub classes: Vec<ClassScan>,
    /// Class entries visited, including skipped ones
    pub processed: usize,
    /// Class entries in the archive
    pub total: usize,
    pub skipped: Vec<SkippedEntry>,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

impl ScanReport {
    /// All found strings in discovery order
    pub fn strings(&self) -> impl Iterator<Item = &FoundString> + '_ {
        self.classes.iter().flat_map(|class| class.strings())
    }

    pub fn string_count(&self) -> usize {
        self.classes.iter().map(ClassScan::len).sum()
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Entries between progress events; zero is treated as one
    pub progress_interval: usize,
    pub scanner: ScannerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            scanner: ScannerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of entries between progress events (minimum 1)
    pub fn progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn scanner(mut self, config: ScannerConfig) -> Self {
        self.scanner = config;
        self
    }
}

/// Drives a [`Scanner`] over an archive
#[derive(Debug, Clone, Default)]
pub struct ScanPipeline {
    config: PipelineConfig,
    cancel: CancelToken,
}

impl ScanPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Uses `token` instead of the pipeline's own cancellation flag
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this pipeline's runs
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the scan, sending events on `events`.
    ///
    /// A hung-up receiver does not stop the scan; the report is returned
    /// either way.
    pub fn run<A: Archive + ?Sized>(&self, archive: &mut A, events: &Sender<ScanEvent>) -> ScanReport {
        self.run_with(archive, |event| {
            let _ = events.send(event.clone());
        })
    }

    /// Runs the scan, handing each event to `observer` on the calling thread.
    ///
    /// Any failure to read or scan one entry, whether a malformed class or a
    /// broken archive member, is logged and recorded in
    /// [`ScanReport::skipped`]; the run moves on to the next entry.
    pub fn run_with<A, F>(&self, archive: &mut A, mut observer: F) -> ScanReport
    where
        A: Archive + ?Sized,
        F: FnMut(&ScanEvent),
    {
        let scanner = Scanner::with_config(self.config.scanner.clone());
        let interval = self.config.progress_interval.max(1);
        let entries = archive.class_entries();
        let mut report = ScanReport {
            total: entries.len(),
            ..ScanReport::default()
        };
        let mut next_id = 0;

        info!("Scanning {} class entries", report.total);

        for entry in &entries {
            if self.cancel.is_cancelled() {
                info!(
                    "Scan cancelled after {} of {} entries",
                    report.processed, report.total
                );
                report.cancelled = true;
                break;
            }

            let scanned = archive
                .read_entry(entry)
                .and_then(|data| scanner.scan(entry, &data));
            match scanned {
                Ok(mut class) => {
                    for method in &mut class.methods {
                        for found in &mut method.strings {
                            found.id = next_id;
                            next_id += 1;
                            observer(&ScanEvent::Found(found.clone()));
                        }
                    }
                    if !class.is_empty() {
                        report.classes.push(class);
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", entry, e);
                    report.skipped.push(SkippedEntry {
                        entry: entry.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            report.processed += 1;
            if report.processed % interval == 0 {
                debug!("Processed {}/{}", report.processed, report.total);
                observer(&ScanEvent::Progress {
                    processed: report.processed,
                    total: report.total,
                });
            }
        }

        info!(
            "Found {} strings in {} classes ({} skipped)",
            next_id,
            report.classes.len(),
            report.skipped.len()
        );
        observer(&ScanEvent::Finished(report.clone()));
        report
    }
}
