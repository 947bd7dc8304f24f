pub mod commands;
pub mod profiles;

use clap::ValueEnum;
use pail_pipeline::sync::ConflictPolicy;

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliConflictPolicy {
    Skip,
    PreferLocal,
    PreferStore,
}

impl From<CliConflictPolicy> for ConflictPolicy {
    fn from(p: CliConflictPolicy) -> Self {
        match p {
            // The local tree is always the left side of a pass.
            CliConflictPolicy::Skip => ConflictPolicy::Skip,
            CliConflictPolicy::PreferLocal => ConflictPolicy::PreferLeft,
            CliConflictPolicy::PreferStore => ConflictPolicy::PreferRight,
        }
    }
}
