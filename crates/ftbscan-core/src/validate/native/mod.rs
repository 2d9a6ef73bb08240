/// Built-in [`PluginHost`] that reads VST2 and VST3 binaries directly.
///
/// It only reads identity metadata: it never creates processing instances
/// beyond what the format requires to answer a description query, and it
/// unloads the library before returning.
pub mod vst2;
pub mod vst3;

use super::host::{HostError, PluginDescription, PluginHost};
use crate::model::{sanitize_text, PluginFormat};
use std::ffi::c_char;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHost;

impl NativeHost {
    pub fn new() -> Self {
        Self
    }
}

impl PluginHost for NativeHost {
    fn find_all_types_for_file(
        &self,
        path: &Path,
        format: PluginFormat,
    ) -> Result<Vec<PluginDescription>, HostError> {
        match format {
            PluginFormat::Vst2 => vst2::describe(path).map(|desc| vec![desc]),
            PluginFormat::Vst3 => vst3::describe(path),
            other => Err(HostError::UnsupportedFormat(other)),
        }
    }
}

/// Decode a fixed-size, NUL-padded C string buffer.
pub(crate) fn fixed_c_str(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    sanitize_text(String::from_utf8_lossy(&bytes).trim()).into_owned()
}
