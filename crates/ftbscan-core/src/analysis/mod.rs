/// Analysis modules — post-scan views over a catalog.

pub mod export;
pub mod summary;

pub use export::{export_csv, write_csv, ExportError};
pub use summary::CatalogSummary;
