/// Host-mediated validation for VST2 and VST3.
///
/// Asks the configured [`PluginHost`] for the plugin types in a file and
/// copies the first description onto the record. Host errors and host panics
/// are both converted into [`ValidationError`]s here and never propagate.
use super::host::{PluginDescription, PluginHost};
use super::{panic_message, ValidationError};
use crate::model::{sanitize_text, PluginFormat, PluginId, PluginRecord};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Probe `path` through `host` and return the first plugin description.
pub fn validate_with_host(
    host: &dyn PluginHost,
    path: &Path,
    format: PluginFormat,
) -> Result<PluginDescription, ValidationError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        host.find_all_types_for_file(path, format)
    }));

    let descriptions = match outcome {
        Ok(Ok(descriptions)) => descriptions,
        Ok(Err(err)) => return Err(ValidationError::Host(err)),
        Err(payload) => return Err(ValidationError::HostPanicked(panic_message(payload))),
    };

    let first = descriptions
        .into_iter()
        .next()
        .ok_or(ValidationError::NoPluginFound)?;
    if first.is_empty() {
        return Err(ValidationError::InvalidDescription);
    }
    Ok(first)
}

/// Copy a host description onto a record and mark it valid.
///
/// MIDI input follows the instrument flag; hosts of this kind do not report
/// MIDI capabilities separately.
pub fn apply_description(desc: &PluginDescription, record: &mut PluginRecord) {
    record.name = sanitize_text(&desc.name).into_owned();
    record.version = sanitize_text(&desc.version).into_owned();
    record.vendor = sanitize_text(&desc.manufacturer).into_owned();
    record.unique_id = Some(PluginId::Numeric(desc.unique_id));
    record.num_inputs = desc.num_inputs;
    record.num_outputs = desc.num_outputs;
    record.categories = if desc.category.is_empty() {
        Vec::new()
    } else {
        vec![sanitize_text(&desc.category).into_owned()]
    };
    record.is_synth = desc.is_instrument;
    record.is_effect = !desc.is_instrument;
    record.accepts_midi = desc.is_instrument;
    record.is_valid = true;
    record.error = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Architecture;
    use crate::validate::HostError;

    /// Host with a canned answer, so each failure mode can be driven directly.
    enum FakeHost {
        Describes(Vec<PluginDescription>),
        Fails,
        Panics,
    }

    impl PluginHost for FakeHost {
        fn find_all_types_for_file(
            &self,
            _path: &Path,
            _format: PluginFormat,
        ) -> Result<Vec<PluginDescription>, HostError> {
            match self {
                FakeHost::Describes(list) => Ok(list.clone()),
                FakeHost::Fails => Err(HostError::Plugin("bad magic".into())),
                FakeHost::Panics => panic!("plugin exploded"),
            }
        }
    }

    fn synth() -> PluginDescription {
        PluginDescription {
            name: "Big Synth".into(),
            version: "2.1.0".into(),
            manufacturer: "Acme".into(),
            category: "Synth".into(),
            unique_id: 0x4163_6d65,
            num_inputs: 0,
            num_outputs: 2,
            is_instrument: true,
        }
    }

    fn validate(host: FakeHost) -> Result<PluginDescription, ValidationError> {
        validate_with_host(&host, Path::new("/p/Big Synth.vst3"), PluginFormat::Vst3)
    }

    #[test]
    fn first_description_is_copied_verbatim() {
        let mut effect = synth();
        effect.name = "Second".into();
        let desc = validate(FakeHost::Describes(vec![synth(), effect])).unwrap();

        let mut record = PluginRecord::new("/p/Big Synth.vst3", PluginFormat::Vst3, Architecture::X86_64);
        apply_description(&desc, &mut record);

        assert!(record.is_valid);
        assert_eq!(record.error, None);
        assert_eq!(record.name, "Big Synth");
        assert_eq!(record.vendor, "Acme");
        assert_eq!(record.version, "2.1.0");
        assert_eq!(record.unique_id, Some(PluginId::Numeric(0x4163_6d65)));
        assert_eq!(record.categories, vec!["Synth".to_string()]);
        assert_eq!((record.num_inputs, record.num_outputs), (0, 2));
        assert!(record.is_synth && !record.is_effect && record.accepts_midi);
        assert!(!record.produces_midi);
    }

    #[test]
    fn no_descriptions_means_no_plugin() {
        let err = validate(FakeHost::Describes(Vec::new())).unwrap_err();
        assert_eq!(err.to_string(), "No plugin found in file");
    }

    #[test]
    fn empty_description_is_invalid() {
        let err = validate(FakeHost::Describes(vec![PluginDescription::default()])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid plugin description");
    }

    #[test]
    fn host_errors_are_wrapped() {
        let err = validate(FakeHost::Fails).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: bad magic");
    }

    #[test]
    fn host_panics_do_not_escape() {
        let err = validate(FakeHost::Panics).unwrap_err();
        assert!(matches!(err, ValidationError::HostPanicked(ref msg) if msg == "plugin exploded"));
    }
}
