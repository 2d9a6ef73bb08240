/// Platform-specific functionality: host architecture detection and the
/// default plugin search locations.

pub mod arch;
pub mod paths;

pub use arch::detect_architecture;
pub use paths::default_search_paths;
