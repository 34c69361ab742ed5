pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    banner, error, heading, nothing, picker_group, snapshot_clean, snapshot_removed,
    snapshot_with_issues, status, success, warn,
};
pub use progress::CheckProgress;
pub use table::{dependents_table, issues_table, scope_table, stats_table, TableBuilder};
pub use theme::{theme, Theme};
