/// Candidate validation: turns one file into one [`PluginRecord`].
///
/// Two independent strategies:
/// - **Host-mediated (VST2/VST3):** delegates to a [`PluginHost`], the
///   boundary to whatever plugin-hosting SDK is in use. [`NativeHost`] is the
///   built-in implementation.
/// - **ABI probing (CLAP):** loads the library directly and walks the CLAP
///   entry/factory/descriptor protocol.
///
/// Neither strategy lets a failure escape: load errors, missing symbols and
/// panics inside the host all end up as `is_valid == false` on the record.
/// This module is the isolation layer between untrusted plugin binaries and
/// the rest of the scanner.
pub mod clap;
pub mod host;
pub mod library;
pub mod native;
pub mod sdk;

pub use host::{HostError, PluginDescription, PluginHost};
pub use library::{live_library_count, LoadedLibrary};
pub use native::NativeHost;

use crate::model::{Architecture, PluginFormat, PluginRecord};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a candidate failed validation. The `Display` text is what ends up in
/// the record's `error` field.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Failed to load library: {0}")]
    Load(String),
    #[error("No CLAP entry point found")]
    MissingEntry,
    #[error("Incompatible CLAP version {major}.{minor}.{revision}")]
    IncompatibleVersion { major: u32, minor: u32, revision: u32 },
    #[error("CLAP entry initialization failed")]
    InitFailed,
    #[error("No CLAP factory found")]
    NoFactory,
    #[error("No CLAP plugins found in factory")]
    NoPlugins,
    #[error("Failed to get plugin descriptor")]
    NoDescriptor,
    #[error("No plugin found in file")]
    NoPluginFound,
    #[error("Invalid plugin description")]
    InvalidDescription,
    #[error("Validation error: {0}")]
    Host(#[from] HostError),
    #[error("Validation error: plugin host panicked: {0}")]
    HostPanicked(String),
    #[error("Validation error: plugin probe panicked: {0}")]
    ProbePanicked(String),
    #[error("Unsupported format")]
    UnsupportedFormat,
}

/// Validates candidates of every format, dispatching on the classified
/// format. Cheap to share across threads.
#[derive(Clone)]
pub struct Validator {
    host: Arc<dyn PluginHost>,
    architecture: Architecture,
}

impl Validator {
    /// `architecture` is stamped on every record this validator produces.
    pub fn new(host: Arc<dyn PluginHost>, architecture: Architecture) -> Self {
        Self { host, architecture }
    }

    /// Validate one candidate. Always returns a record; failures are
    /// recorded on it rather than returned.
    pub fn validate(&self, path: &Path, format: PluginFormat) -> PluginRecord {
        let mut record = PluginRecord::new(path, format, self.architecture);

        let outcome = match format {
            PluginFormat::Clap => {
                clap::validate_clap(path).map(|info| info.apply_to(&mut record))
            }
            PluginFormat::Vst2 | PluginFormat::Vst3 => {
                sdk::validate_with_host(self.host.as_ref(), path, format)
                    .map(|desc| sdk::apply_description(&desc, &mut record))
            }
            PluginFormat::Unknown => Err(ValidationError::UnsupportedFormat),
        };

        match outcome {
            Ok(()) => debug!("Validated {} plugin {}", format, path.display()),
            Err(err) => {
                debug!("Rejected {}: {err}", path.display());
                record.mark_invalid(err.to_string());
            }
        }
        record
    }
}

/// Extract a readable message from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct RefusingHost;

    impl PluginHost for RefusingHost {
        fn find_all_types_for_file(
            &self,
            _path: &Path,
            _format: PluginFormat,
        ) -> Result<Vec<PluginDescription>, HostError> {
            Ok(Vec::new())
        }
    }

    fn validator() -> Validator {
        Validator::new(Arc::new(RefusingHost), Architecture::Arm64)
    }

    #[test]
    fn host_failure_still_produces_named_record() {
        let record = validator().validate(Path::new("/p/Chorus.vst3"), PluginFormat::Vst3);
        assert!(!record.is_valid);
        assert_eq!(record.name, "Chorus");
        assert_eq!(record.architecture, Architecture::Arm64);
        assert_eq!(record.error.as_deref(), Some("No plugin found in file"));
    }

    #[test]
    fn empty_clap_file_is_invalid_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Empty Thing.clap");
        std::fs::File::create(&path).unwrap().write_all(b"").unwrap();

        let record = validator().validate(&path, PluginFormat::Clap);
        assert!(!record.is_valid);
        assert_eq!(record.name, "Empty Thing");
        let error = record.error.expect("error must be set");
        assert!(error.starts_with("Failed to load library"), "{error}");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let record = validator().validate(Path::new("x.bin"), PluginFormat::Unknown);
        assert!(!record.is_valid);
        assert_eq!(record.error.as_deref(), Some("Unsupported format"));
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic payload");
    }
}
