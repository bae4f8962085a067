pub mod catalog;
pub mod process_checker;
pub mod process_spec;
pub mod registry;
pub mod stats_collector;

pub use catalog::NamespaceCatalog;
pub use process_checker::{PgrepSearch, PidSearch, SysinfoSearch};
pub use process_spec::ProcessSpec;
pub use registry::{Collection, ProcessRegistry, SpecFailure};
pub use stats_collector::{ProcessHandle, ProcessStatsProvider, SysinfoProvider};
