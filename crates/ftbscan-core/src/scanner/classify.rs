/// Extension-based format classification.
///
/// Decides whether a visited file is a scan candidate. The mapping is fixed
/// per platform; only the enabled-format mask varies between scans.
use crate::model::{FormatMask, PluginFormat};
use std::path::Path;

/// Dynamic-library suffixes that identify a VST2 plugin on this platform.
#[cfg(windows)]
pub const VST2_EXTENSIONS: &[&str] = &["dll"];
#[cfg(target_os = "macos")]
pub const VST2_EXTENSIONS: &[&str] = &["vst", "dylib"];
#[cfg(all(not(windows), not(target_os = "macos")))]
pub const VST2_EXTENSIONS: &[&str] = &["so"];

pub const VST3_EXTENSION: &str = "vst3";
pub const CLAP_EXTENSION: &str = "clap";

/// Classify a path by its extension.
///
/// Returns `None` for files that match no enabled format; those are skipped
/// silently by the walker. Extensions compare ASCII-case-insensitively so
/// `Synth.DLL` is picked up on Windows.
pub fn classify(path: &Path, formats: FormatMask) -> Option<PluginFormat> {
    let ext = path.extension()?.to_str()?;
    classify_extension(ext, formats)
}

/// Classify a bare extension (without the leading dot).
pub fn classify_extension(ext: &str, formats: FormatMask) -> Option<PluginFormat> {
    let format = if VST2_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)) {
        PluginFormat::Vst2
    } else if ext.eq_ignore_ascii_case(VST3_EXTENSION) {
        PluginFormat::Vst3
    } else if ext.eq_ignore_ascii_case(CLAP_EXTENSION) {
        PluginFormat::Clap
    } else {
        return None;
    };
    formats.is_enabled(format).then_some(format)
}
