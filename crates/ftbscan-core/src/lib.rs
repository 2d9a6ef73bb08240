/// ftbscan core — plugin discovery, validation and preset persistence.
///
/// This crate contains all scanning logic with zero front-end dependencies.
/// It is designed to be reusable across different frontends (CLI, GUI).
///
/// # Modules
///
/// - [`model`] — Plugin records, format and architecture tags.
/// - [`scanner`] — Directory walking, classification and the scan orchestrator.
/// - [`validate`] — Per-format validators and the plugin-host boundary.
/// - [`preset`] — `.ftbpreset` XML persistence.
/// - [`config`] — Search roots and enabled formats, persisted as JSON.
/// - [`analysis`] — Catalog summary and CSV export.
/// - [`platform`] — Architecture detection and default search roots.
pub mod analysis;
pub mod config;
pub mod model;
pub mod platform;
pub mod preset;
pub mod scanner;
pub mod validate;

pub use config::ScanConfig;
pub use model::{Architecture, FormatMask, PluginFormat, PluginId, PluginRecord};
pub use scanner::progress::{ScanProgress, ScanReport};
pub use scanner::{PluginScanner, ScanHandle};
