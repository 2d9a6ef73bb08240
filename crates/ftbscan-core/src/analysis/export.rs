/// CSV export of a catalog, one row per record.
///
/// List fields are joined with `;` so every record stays on one row.
use crate::model::PluginRecord;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat row shape; the header is derived from the field names.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    name: &'a str,
    format: &'static str,
    version: &'a str,
    vendor: &'a str,
    architecture: &'static str,
    path: String,
    unique_id: String,
    is_valid: bool,
    error: &'a str,
    is_synth: bool,
    is_effect: bool,
    accepts_midi: bool,
    produces_midi: bool,
    num_inputs: u32,
    num_outputs: u32,
    categories: String,
    features: String,
}

impl<'a> From<&'a PluginRecord> for CsvRow<'a> {
    fn from(r: &'a PluginRecord) -> Self {
        Self {
            name: &r.name,
            format: r.format.as_str(),
            version: &r.version,
            vendor: &r.vendor,
            architecture: r.architecture.as_str(),
            path: r.path.to_string_lossy().into_owned(),
            unique_id: r.unique_id.as_ref().map(ToString::to_string).unwrap_or_default(),
            is_valid: r.is_valid,
            error: r.error.as_deref().unwrap_or(""),
            is_synth: r.is_synth,
            is_effect: r.is_effect,
            accepts_midi: r.accepts_midi,
            produces_midi: r.produces_midi,
            num_inputs: r.num_inputs,
            num_outputs: r.num_outputs,
            categories: r.categories.join(";"),
            features: r.features.join(";"),
        }
    }
}

/// Write `records` as CSV to any writer.
pub fn write_csv<W: Write>(writer: W, records: &[PluginRecord]) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(CsvRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `records` as CSV to `path`.
pub fn export_csv(path: &Path, records: &[PluginRecord]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(file, records)
}
