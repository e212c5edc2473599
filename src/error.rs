use thiserror::Error;

pub type ValidatorResult<T> = Result<T, ValidatorError>;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel read error: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("Excel export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("SHEET_NOT_FOUND: Sheet '{sheet}' not found in workbook")]
    SheetNotFound { sheet: String },

    #[error("TABLE_NOT_FOUND: Table '{table}' not found in sheet '{sheet}'")]
    TableNotFound { table: String, sheet: String },

    #[error("ACCESS_DENIED: '{path}' is outside the server's file root")]
    AccessDenied { path: String },

    #[error("Invalid validations workbook: {0}")]
    Rules(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Validation failed: {0} error cell(s) found")]
    ValidationFailed(usize),
}
