/// Data model for scan results.
///
/// Re-exports the catalog record and the format/architecture tags it uses.
pub mod format;
pub mod record;

pub use format::{Architecture, FormatMask, PluginFormat};
pub use record::{display_file_name, name_from_path, sanitize_text, PluginId, PluginRecord};
