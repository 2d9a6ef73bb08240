/// Plugin format and processor architecture tags.
///
/// Both enums carry a fixed string form used by the preset document and the
/// CLI. Parsing is infallible: anything unrecognised maps to `Unknown`, the
/// same way an unreadable tag in a preset degrades instead of failing.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The plugin format a candidate file was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginFormat {
    Vst2,
    Vst3,
    Clap,
    Unknown,
}

impl PluginFormat {
    /// Tag written to the `<Format>` element.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vst2 => "VST2",
            Self::Vst3 => "VST3",
            Self::Clap => "CLAP",
            Self::Unknown => "Unknown",
        }
    }

    /// Inverse of [`as_str`](Self::as_str). Unrecognised tags yield `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "VST2" => Self::Vst2,
            "VST3" => Self::Vst3,
            "CLAP" => Self::Clap,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PluginFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processor architecture of the host that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    X86_64,
    X86,
    Arm64,
    Arm32,
    Unknown,
}

impl Architecture {
    /// Tag written to the `<Architecture>` element.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm32 => "arm32",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "x86_64" => Self::X86_64,
            "x86" => Self::X86,
            "arm64" => Self::Arm64,
            "arm32" => Self::Arm32,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which plugin formats a scan should pick up.
///
/// Toggling a format only affects classification of future scans; records
/// already in a catalog are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatMask {
    pub vst2: bool,
    pub vst3: bool,
    pub clap: bool,
}

impl FormatMask {
    /// All formats enabled.
    pub const ALL: FormatMask = FormatMask {
        vst2: true,
        vst3: true,
        clap: true,
    };

    /// No format enabled. A scan with this mask produces an empty catalog.
    pub const NONE: FormatMask = FormatMask {
        vst2: false,
        vst3: false,
        clap: false,
    };

    pub fn new(vst2: bool, vst3: bool, clap: bool) -> Self {
        Self { vst2, vst3, clap }
    }

    #[inline]
    pub fn is_enabled(self, format: PluginFormat) -> bool {
        match format {
            PluginFormat::Vst2 => self.vst2,
            PluginFormat::Vst3 => self.vst3,
            PluginFormat::Clap => self.clap,
            PluginFormat::Unknown => false,
        }
    }

    /// Returns `true` if no format is enabled.
    pub fn is_empty(self) -> bool {
        !(self.vst2 || self.vst3 || self.clap)
    }
}

impl Default for FormatMask {
    fn default() -> Self {
        Self::ALL
    }
}
