/// Scan progress reporting — lightweight messages sent from the scan
/// thread to a front end via a crossbeam channel.
use std::time::Duration;

/// Progress value meaning "working, amount unknown".
pub const INDETERMINATE: f32 = -1.0;

/// Summary of one finished (or cancelled) scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    /// Records appended to the catalog, valid or not.
    pub plugins_found: usize,
    pub valid_plugins: usize,
    /// Directory entries that could not be read.
    pub traversal_errors: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl ScanReport {
    pub fn invalid_plugins(&self) -> usize {
        self.plugins_found - self.valid_plugins
    }
}

/// Messages sent from the scan thread by [`spawn_scan`](super::PluginScanner::spawn_scan).
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// A progress callback fired. `progress` is in `0.0..=1.0`, or
    /// [`INDETERMINATE`].
    Update { message: String, progress: f32 },
    /// The scan is over; no further messages follow.
    Finished(ScanReport),
}

/// Render a progress value for a console line.
pub fn format_progress(message: &str, progress: f32) -> String {
    if progress < 0.0 {
        message.to_string()
    } else {
        format!("{message} ({:.0}%)", progress.clamp(0.0, 1.0) * 100.0)
    }
}
