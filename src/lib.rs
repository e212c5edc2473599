//! MyCarbon validator - check Excel workbooks against a reference rule workbook
//!
//! A user workbook is loaded one scope (sheet) at a time, optionally narrowed to
//! a named Excel table, and every cell of the columns named by the rules is
//! checked for emptiness, placeholder values and datatype.
//!
//! # Example
//!
//! ```no_run
//! use mycarbon_validator::core::validate_one_sheet;
//! use mycarbon_validator::excel::{load_backend_validations, Workbook};
//! use mycarbon_validator::report::summary_lines;
//! use std::path::Path;
//!
//! let rules = load_backend_validations(Path::new("./data/mycarbon"))?;
//! let mut workbook = Workbook::open("upload.xlsx")?;
//! let result = validate_one_sheet(&mut workbook, &rules, "TestScope", Some("TestScopeCalcs"))?;
//!
//! for line in summary_lines(&result.counts, &rules) {
//!     println!("{}", line);
//! }
//! # Ok::<(), mycarbon_validator::error::ValidatorError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod logging;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use config::ValidatorConfig;
pub use error::{ValidatorError, ValidatorResult};
pub use types::{CellValue, ErrorKind, RuleBook, SheetData, SheetResult};
