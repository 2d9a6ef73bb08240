/// A single catalog entry: everything the scanner learned about one
/// candidate file.
///
/// Every candidate produces exactly one record. Files that could not be
/// validated stay in the catalog with `is_valid == false` and an error, so
/// the catalog always mirrors what is on disk.
use super::format::{Architecture, PluginFormat};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// Version and vendor placeholder for records that failed validation.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Format-specific unique identifier.
///
/// Host-mediated formats (VST2/VST3) expose a numeric id; CLAP plugins use
/// a reverse-domain string such as `com.vendor.synth`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginId {
    Numeric(i32),
    Text(String),
}

impl PluginId {
    /// Decode an id stored as text. CLAP ids are always text; other formats
    /// are numeric when the text parses as one.
    pub fn parse(text: &str, format: PluginFormat) -> Self {
        if format != PluginFormat::Clap {
            if let Ok(n) = text.trim().parse::<i32>() {
                return Self::Numeric(n);
            }
        }
        Self::Text(text.to_string())
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Location of the candidate file on disk.
    pub path: PathBuf,
    pub format: PluginFormat,
    /// Architecture of the machine that ran the scan.
    pub architecture: Architecture,

    pub name: String,
    pub version: String,
    pub vendor: String,
    pub unique_id: Option<PluginId>,

    /// Host-reported categories (e.g. `Fx`, `Synth`).
    pub categories: Vec<String>,
    /// CLAP feature tags (e.g. `instrument`, `stereo`).
    pub features: Vec<String>,

    pub is_synth: bool,
    pub is_effect: bool,
    pub accepts_midi: bool,
    pub produces_midi: bool,
    pub num_inputs: u32,
    pub num_outputs: u32,

    pub is_valid: bool,
    /// Why validation failed. `Some` exactly when `is_valid` is `false`.
    pub error: Option<String>,
}

impl PluginRecord {
    /// A blank, not-yet-validated record for `path`.
    pub fn new(path: impl Into<PathBuf>, format: PluginFormat, architecture: Architecture) -> Self {
        Self {
            path: path.into(),
            format,
            architecture,
            name: String::new(),
            version: String::new(),
            vendor: String::new(),
            unique_id: None,
            categories: Vec::new(),
            features: Vec::new(),
            is_synth: false,
            is_effect: false,
            accepts_midi: false,
            produces_midi: false,
            num_inputs: 0,
            num_outputs: 0,
            is_valid: false,
            error: None,
        }
    }

    /// Mark the record invalid, keeping a best-effort name from the file stem.
    pub fn mark_invalid(&mut self, error: impl Into<String>) {
        let mut error = error.into();
        if error.is_empty() {
            error = "Unknown validation failure".to_string();
        }
        self.is_valid = false;
        self.error = Some(error);
        self.name = name_from_path(&self.path);
        self.version = UNKNOWN_FIELD.to_string();
        self.vendor = UNKNOWN_FIELD.to_string();
    }

    /// Short "Instrument" / "Effect" label for display.
    pub fn kind_label(&self) -> &'static str {
        match (self.is_synth, self.is_effect) {
            (true, true) => "Instrument, Effect",
            (true, false) => "Instrument",
            (false, true) => "Effect",
            (false, false) => "",
        }
    }
}

/// Replace characters XML 1.0 cannot carry (most C0 controls, U+FFFE and
/// U+FFFF) with U+FFFD. Strings read out of plugin binaries go through this
/// before they reach a record.
pub fn sanitize_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        )
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

/// Final component of `path`, for progress messages. Empty for paths
/// without one.
pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Display name derived from a file name, minus its extension.
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_record_keeps_name_from_file_stem() {
        let mut record = PluginRecord::new(
            "/plugins/Fancy Reverb.vst3",
            PluginFormat::Vst3,
            Architecture::X86_64,
        );
        record.mark_invalid("No plugin found in file");

        assert!(!record.is_valid);
        assert_eq!(record.name, "Fancy Reverb");
        assert_eq!(record.version, UNKNOWN_FIELD);
        assert_eq!(record.vendor, UNKNOWN_FIELD);
        assert_eq!(record.error.as_deref(), Some("No plugin found in file"));
    }

    #[test]
    fn empty_error_text_is_replaced() {
        let mut record = PluginRecord::new("x.clap", PluginFormat::Clap, Architecture::Unknown);
        record.mark_invalid("");
        assert!(!record.error.unwrap().is_empty());
    }

    #[test]
    fn control_characters_are_replaced() {
        assert!(matches!(sanitize_text("Acme\tAudio\r\n"), Cow::Borrowed(_)));
        assert_eq!(sanitize_text("Bad\u{1}Name\u{FFFF}"), "Bad\u{FFFD}Name\u{FFFD}");
    }

    #[test]
    fn plugin_id_parse_depends_on_format() {
        assert_eq!(
            PluginId::parse("1234", PluginFormat::Vst2),
            PluginId::Numeric(1234)
        );
        assert_eq!(
            PluginId::parse("-17", PluginFormat::Vst3),
            PluginId::Numeric(-17)
        );
        assert_eq!(
            PluginId::parse("1234", PluginFormat::Clap),
            PluginId::Text("1234".into())
        );
        assert_eq!(
            PluginId::parse("com.acme.delay", PluginFormat::Vst3),
            PluginId::Text("com.acme.delay".into())
        );
    }
}
