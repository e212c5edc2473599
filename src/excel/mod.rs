//! Excel input/output
//!
//! - Loader: user workbooks, whole sheets or named tables (calamine)
//! - Rules: the read-only reference workbook (`Columns`, `Messages`)
//! - Annotator: validated data written back to .xlsx with failing cells coloured

mod annotator;
pub mod loader;
pub mod rules;

pub use annotator::AnnotatedExporter;
pub use loader::{load_excel_data, Workbook};
pub use rules::{load_backend_validations, load_rule_book};
