/// The plugin-hosting SDK boundary used for VST2 and VST3 validation.
///
/// The scanner never talks to VST binaries directly on this path: it asks a
/// [`PluginHost`] to describe the file and copies whatever comes back. A GUI
/// embedding a full hosting SDK can plug its own implementation in;
/// [`NativeHost`](super::NativeHost) is the built-in one.
use crate::model::PluginFormat;
use std::path::Path;
use thiserror::Error;

/// Description of one plugin type found in a file, as reported by a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDescription {
    pub name: String,
    pub version: String,
    pub manufacturer: String,
    /// Host category string (e.g. `Fx|Delay`, `Synth`). May be empty.
    pub category: String,
    pub unique_id: i32,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub is_instrument: bool,
}

impl PluginDescription {
    /// A description with no name carries no usable identity.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Errors a host may report while probing a file.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to load library: {0}")]
    Load(String),
    #[error("missing entry point `{0}`")]
    MissingSymbol(&'static str),
    #[error("{0}")]
    Plugin(String),
    #[error("format {0} is not handled by this host")]
    UnsupportedFormat(PluginFormat),
}

/// A plugin-hosting SDK able to describe plugin files.
///
/// Implementations may load and run third-party code. They are allowed to
/// fail or even panic; the validator isolates both.
pub trait PluginHost: Send + Sync {
    /// Describe every plugin type contained in `path`. An empty vector means
    /// the file holds no recognisable plugin.
    fn find_all_types_for_file(
        &self,
        path: &Path,
        format: PluginFormat,
    ) -> Result<Vec<PluginDescription>, HostError>;
}
