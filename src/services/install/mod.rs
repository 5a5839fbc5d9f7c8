pub mod conflict;
pub mod executor;
pub mod plan;

pub use conflict::{ConflictRecord, ConflictResolver};
pub use executor::{ConflictPolicy, InstallExecutor, InstallProgress, InstallReport, RestoreReport};
pub use plan::{plan_install, InstallPlan, PlannedFile};
