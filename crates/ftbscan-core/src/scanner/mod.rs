/// Scanner module — orchestrates plugin discovery and validation.
///
/// A scan walks every configured search root in order, classifies each
/// regular file by extension, validates the candidates one at a time and
/// appends exactly one record per candidate to the catalog.
///
/// [`PluginScanner`] is shared behind an `Arc`. The catalog sits behind a
/// mutex that is only held to clear, append, replace or snapshot; plugin
/// code never runs with it held. The configuration is snapshotted when a
/// scan starts, so edits during a scan apply to the next one.
pub mod classify;
pub mod progress;
pub mod walker;

use crate::config::ScanConfig;
use crate::model::{display_file_name, FormatMask, PluginRecord};
use crate::platform::detect_architecture;
use crate::preset::{self, PresetError};
use crate::validate::{NativeHost, PluginHost, Validator};
use progress::{ScanProgress, ScanReport, INDETERMINATE};
use walker::{DirectoryWalker, WalkEvent};

use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Maximum number of progress messages that may queue up in the channel.
///
/// Updates beyond this are dropped rather than blocking the scanner; only
/// the final [`ScanProgress::Finished`] is always delivered.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// How often [`PluginScanner::stop`] re-checks the scanning flag.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("a scan is already running")]
    AlreadyScanning,
    #[error("failed to spawn scanner thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Clears the scanning flag when a scan ends, including by unwinding.
struct ScanningGuard<'a>(&'a AtomicBool);

impl Drop for ScanningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct PluginScanner {
    config: RwLock<ScanConfig>,
    catalog: Mutex<Vec<PluginRecord>>,
    scanning: AtomicBool,
    stop_requested: AtomicBool,
    validator: Validator,
}

impl PluginScanner {
    /// Scanner over the platform default roots, using the built-in host.
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self::with_host(config, Arc::new(NativeHost::new()))
    }

    /// Scanner that validates VST2/VST3 candidates through `host`.
    pub fn with_host(config: ScanConfig, host: Arc<dyn PluginHost>) -> Self {
        Self {
            config: RwLock::new(config),
            catalog: Mutex::new(Vec::new()),
            scanning: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            validator: Validator::new(host, detect_architecture()),
        }
    }

    /// Run a scan on the calling thread.
    ///
    /// `progress` receives `(message, fraction)` pairs, with a fraction of
    /// [`INDETERMINATE`] for per-file messages. Returns `None` without doing
    /// anything if a scan is already running.
    pub fn scan<F>(&self, mut progress: F) -> Option<ScanReport>
    where
        F: FnMut(&str, f32),
    {
        if !self.try_begin() {
            debug!("Scan requested while one is running; ignoring");
            return None;
        }
        let _guard = ScanningGuard(&self.scanning);
        Some(self.run(&mut progress))
    }

    /// Run a scan on a dedicated `ftbscan-scanner` thread.
    ///
    /// Progress arrives on the handle's channel as [`ScanProgress::Update`]
    /// messages followed by exactly one [`ScanProgress::Finished`].
    pub fn spawn_scan(self: &Arc<Self>) -> Result<ScanHandle, SpawnError> {
        if !self.try_begin() {
            return Err(SpawnError::AlreadyScanning);
        }

        let (progress_tx, progress_rx) =
            crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
        let scanner = Arc::clone(self);

        let spawned = thread::Builder::new()
            .name("ftbscan-scanner".into())
            .spawn(move || {
                let _guard = ScanningGuard(&scanner.scanning);
                let report = scanner.run(&mut |message: &str, fraction: f32| {
                    let _ = progress_tx.try_send(ScanProgress::Update {
                        message: message.to_string(),
                        progress: fraction,
                    });
                });
                let _ = progress_tx.send(ScanProgress::Finished(report.clone()));
                report
            });

        match spawned {
            Ok(thread) => Ok(ScanHandle {
                progress_rx,
                scanner: Arc::clone(self),
                thread: Some(thread),
            }),
            Err(err) => {
                self.scanning.store(false, Ordering::SeqCst);
                Err(SpawnError::Thread(err))
            }
        }
    }

    /// Claim the scanning flag and clear any stale stop request.
    fn try_begin(&self) -> bool {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        true
    }

    fn run(&self, progress: &mut dyn FnMut(&str, f32)) -> ScanReport {
        let start = Instant::now();
        let config = self.config.read().clone();
        self.catalog.lock().clear();

        info!(
            "Starting plugin scan of {} search paths",
            config.search_paths.len()
        );

        let walker = DirectoryWalker::new(config.formats);
        let total = config.search_paths.len();
        let mut report = ScanReport::default();

        for (index, root) in config.search_paths.iter().enumerate() {
            if self.stop_requested.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            progress(
                &format!("Scanning: {}", root.display()),
                index as f32 / total as f32,
            );

            let outcome = walker.walk(root, &self.stop_requested, |event| match event {
                WalkEvent::Candidate { path, format } => {
                    progress(
                        &format!("Scanning: {}", display_file_name(&path)),
                        INDETERMINATE,
                    );

                    let record = self.validator.validate(&path, format);
                    report.plugins_found += 1;
                    if record.is_valid {
                        report.valid_plugins += 1;
                    }
                    self.catalog.lock().push(record);
                }
                WalkEvent::Error { message, .. } => {
                    progress(
                        &format!("Error scanning directory: {message}"),
                        INDETERMINATE,
                    );
                }
            });
            report.traversal_errors += outcome.errors;
            if outcome.stopped {
                report.cancelled = true;
                break;
            }
        }

        report.duration = start.elapsed();
        if report.cancelled {
            progress("Scan cancelled", 1.0);
            info!("Scan cancelled after {} plugins", report.plugins_found);
        } else {
            progress("Scan completed", 1.0);
            info!(
                "Scan complete: {} plugins ({} valid) in {:?}",
                report.plugins_found, report.valid_plugins, report.duration
            );
        }
        report
    }

    /// Ask a running scan to stop and wait until it has.
    ///
    /// Must not be called from a progress callback: the scan cannot finish
    /// while its own callback is blocked here.
    pub fn stop(&self) {
        if !self.scanning.load(Ordering::SeqCst) {
            return;
        }
        self.request_stop();
        while self.scanning.load(Ordering::SeqCst) {
            thread::sleep(STOP_POLL_INTERVAL);
        }
    }

    /// Ask a running scan to stop without waiting.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Append a search root. Roots that do not exist are ignored and
    /// `false` is returned; a root added twice is scanned twice.
    pub fn add_search_path(&self, path: impl Into<PathBuf>) -> bool {
        self.config.write().add_search_path(path)
    }

    pub fn clear_search_paths(&self) {
        self.config.write().search_paths.clear();
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.config.read().search_paths.clone()
    }

    pub fn set_formats_to_scan(&self, vst2: bool, vst3: bool, clap: bool) {
        self.config.write().formats = FormatMask::new(vst2, vst3, clap);
    }

    pub fn formats(&self) -> FormatMask {
        self.config.read().formats
    }

    /// Snapshot of the catalog.
    pub fn plugins(&self) -> Vec<PluginRecord> {
        self.catalog.lock().clone()
    }

    pub fn total_plugins_found(&self) -> usize {
        self.catalog.lock().len()
    }

    /// Write the current catalog to a preset file.
    pub fn save_preset(&self, path: &Path) -> Result<(), PresetError> {
        let snapshot = self.plugins();
        preset::write_preset(path, &snapshot)
    }

    /// Replace the catalog with the records in a preset file.
    ///
    /// The file is parsed completely first; on error the catalog is left
    /// untouched. Returns the number of records loaded.
    pub fn load_preset(&self, path: &Path) -> Result<usize, PresetError> {
        let records = preset::read_preset(path)?;
        let count = records.len();
        *self.catalog.lock() = records;
        debug!("Loaded {count} records from {}", path.display());
        Ok(count)
    }
}

impl Default for PluginScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a scan running on its own thread.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    scanner: Arc<PluginScanner>,
    thread: Option<thread::JoinHandle<ScanReport>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.scanner.request_stop();
    }

    /// Wait for the scan thread. `None` if it panicked.
    ///
    /// Drain `progress_rx` first when the channel may be full, since the
    /// final message is sent with a blocking send.
    pub fn join(mut self) -> Option<ScanReport> {
        self.thread.take()?.join().ok()
    }
}
