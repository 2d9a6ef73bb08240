/// Catalog totals: valid plugins, per-format counts and instrument/effect
/// split, as printed at the end of a scan.
use crate::model::{PluginFormat, PluginRecord};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub total: usize,
    pub valid: usize,
    pub vst2: usize,
    pub vst3: usize,
    pub clap: usize,
    pub instruments: usize,
    pub effects: usize,
}

impl CatalogSummary {
    /// Count `records`. Format and kind counts cover invalid records too.
    pub fn from_records(records: &[PluginRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.is_valid {
                summary.valid += 1;
            }
            match record.format {
                PluginFormat::Vst2 => summary.vst2 += 1,
                PluginFormat::Vst3 => summary.vst3 += 1,
                PluginFormat::Clap => summary.clap += 1,
                PluginFormat::Unknown => {}
            }
            if record.is_synth {
                summary.instruments += 1;
            }
            if record.is_effect {
                summary.effects += 1;
            }
        }
        summary
    }

    pub fn invalid(&self) -> usize {
        self.total - self.valid
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total plugins found: {}", self.total)?;
        writeln!(f, "Valid plugins: {}", self.valid)?;
        writeln!(f, "Invalid plugins: {}", self.invalid())?;
        writeln!(f, "VST2 plugins: {}", self.vst2)?;
        writeln!(f, "VST3 plugins: {}", self.vst3)?;
        writeln!(f, "CLAP plugins: {}", self.clap)?;
        writeln!(f, "Instruments: {}", self.instruments)?;
        write!(f, "Effects: {}", self.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Architecture;

    fn record(format: PluginFormat, valid: bool, synth: bool) -> PluginRecord {
        let mut r = PluginRecord::new("/p/x", format, Architecture::X86_64);
        r.is_valid = valid;
        r.is_synth = synth;
        r.is_effect = !synth;
        r
    }

    #[test]
    fn every_record_is_classified() {
        let records = vec![
            record(PluginFormat::Clap, true, true),
            record(PluginFormat::Vst3, true, false),
            record(PluginFormat::Vst3, false, false),
            record(PluginFormat::Vst2, true, false),
        ];
        let summary = CatalogSummary::from_records(&records);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.valid, 3);
        assert_eq!(summary.invalid(), 1);
        assert_eq!((summary.vst2, summary.vst3, summary.clap), (1, 2, 1));
        assert_eq!((summary.instruments, summary.effects), (1, 3));
    }

    #[test]
    fn empty_catalog_is_all_zero() {
        assert_eq!(CatalogSummary::from_records(&[]), CatalogSummary::default());
    }

    #[test]
    fn display_lists_every_count() {
        let text = CatalogSummary::from_records(&[record(PluginFormat::Clap, true, true)]).to_string();
        assert!(text.contains("Valid plugins: 1"));
        assert!(text.contains("CLAP plugins: 1"));
        assert!(text.ends_with("Effects: 0"));
    }
}
