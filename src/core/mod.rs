//! Validation engine: per-sheet checks and multi-sheet runs

pub mod validator;
pub mod workflow;

pub use validator::{find_validation_errors, select_validation_columns, summarize_errors};
pub use workflow::{
    build_validation_plan, default_scope_index, derive_table_for_sheet, run_selection, scope_options,
    validate_all, validate_one_sheet, ProgressCallback, Selection,
};
