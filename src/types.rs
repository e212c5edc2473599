use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// Cell values
//==============================================================================

/// A single cell read from a workbook
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Date/time rendered as `YYYY-MM-DD HH:MM:SS`
    DateTime(String),
    /// Excel error literal such as `#N/A` or `#DIV/0!`
    Error(String),
}

impl CellValue {
    /// True for blank cells and empty strings
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// True when the cell holds no value at all (not even an empty string)
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, CellValue::Bool(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Error(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => {
                // Whole numbers print without a fractional part, as spreadsheet users see them
                if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{v}")
                }
            }
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

//==============================================================================
// Loaded sheet data
//==============================================================================

pub(crate) static EMPTY_CELL: CellValue = CellValue::Empty;

/// Tabular data loaded from a sheet or a named table.
///
/// Rows are indexed from 0 (the header row is not counted).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// Rule columns that were not found in the loaded data
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_required: Vec<String>,
}

impl SheetData {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            missing_required: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate `(row_index, cell)` for one column. Short rows yield `Empty`.
    pub fn column_cells<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = (usize, &'a CellValue)> + 'a> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .enumerate()
                .map(move |(row, cells)| (row, cells.get(idx).unwrap_or(&EMPTY_CELL))),
        )
    }

    /// First `n` rows, for previews
    pub fn head(&self, n: usize) -> SheetData {
        SheetData {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
            missing_required: self.missing_required.clone(),
        }
    }
}

//==============================================================================
// Reference workbook
//==============================================================================

/// One row of the `Columns` sheet in the validations workbook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub sheet: Option<String>,
    pub table_name: Option<String>,
    pub column: String,
    pub datatype: String,
    pub required: bool,
    pub allow_broken_refs: bool,
}

impl ValidationRule {
    pub fn applies_to(&self, sheet: &str) -> bool {
        self.sheet.as_deref() == Some(sheet)
    }
}

/// One row of the `Messages` sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error_type: String,
    pub message: String,
}

/// Validation rules plus user-facing messages, loaded once and read-only
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleBook {
    pub rules: Vec<ValidationRule>,
    pub messages: Vec<ErrorMessage>,
    /// Whether the `Columns` sheet has a `Sheet` header
    pub has_sheet_column: bool,
    /// Whether the `Columns` sheet has a `TableName` header
    pub has_table_column: bool,
}

impl RuleBook {
    pub fn new(rules: Vec<ValidationRule>, messages: Vec<ErrorMessage>) -> Self {
        Self {
            rules,
            messages,
            has_sheet_column: true,
            has_table_column: true,
        }
    }

    pub fn rules_for<'a>(&'a self, sheet: &'a str) -> impl Iterator<Item = &'a ValidationRule> + 'a {
        self.rules.iter().filter(move |r| r.applies_to(sheet))
    }

    /// Message for an error kind, if the reference workbook defines one
    pub fn message_for(&self, kind: ErrorKind) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.error_type == kind.as_str())
            .map(|m| m.message.as_str())
    }
}

//==============================================================================
// Findings
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingColumn,
    EmptyRequired,
    BlankIndicator,
    InvalidYear,
    InvalidInteger,
    InvalidFloat,
    InvalidBoolean,
    SheetNotFound,
    TableNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingColumn => "missing_column",
            ErrorKind::EmptyRequired => "empty_required",
            ErrorKind::BlankIndicator => "blank_indicator",
            ErrorKind::InvalidYear => "invalid_year",
            ErrorKind::InvalidInteger => "invalid_integer",
            ErrorKind::InvalidFloat => "invalid_float",
            ErrorKind::InvalidBoolean => "invalid_boolean",
            ErrorKind::SheetNotFound => "sheet_not_found",
            ErrorKind::TableNotFound => "table_not_found",
        }
    }

    pub fn is_type_error(&self) -> bool {
        self.as_str().starts_with("invalid_")
    }

    /// Human label: `empty_required` → `empty required`
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Map a load failure to the count it contributes to a run
    pub fn from_load_error(err: &crate::error::ValidatorError) -> Option<Self> {
        match err {
            crate::error::ValidatorError::SheetNotFound { .. } => Some(ErrorKind::SheetNotFound),
            crate::error::ValidatorError::TableNotFound { .. } => Some(ErrorKind::TableNotFound),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a finding. `row == None` marks a whole column (missing column).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: Option<usize>,
    pub column: String,
}

impl CellKey {
    pub fn cell(row: usize, column: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            column: column.into(),
        }
    }

    pub fn whole_column(column: impl Into<String>) -> Self {
        Self {
            row: None,
            column: column.into(),
        }
    }
}

/// Findings keyed by cell; a later finding for the same cell replaces the earlier one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorCells(BTreeMap<CellKey, ErrorKind>);

impl ErrorCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CellKey, kind: ErrorKind) {
        self.0.insert(key, kind);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<ErrorKind> {
        self.0.get(&CellKey::cell(row, column)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &ErrorKind)> {
        self.0.iter()
    }
}

impl Serialize for ErrorCells {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            row: Option<usize>,
            column: &'a str,
            error_type: ErrorKind,
        }

        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (key, kind) in &self.0 {
            seq.serialize_element(&Entry {
                row: key.row,
                column: &key.column,
                error_type: *kind,
            })?;
        }
        seq.end()
    }
}

pub type ErrorCounts = BTreeMap<ErrorKind, usize>;

//==============================================================================
// Run results
//==============================================================================

/// One `(Sheet, TableName)` pair from the validation plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanEntry {
    pub sheet: String,
    pub table_name: Option<String>,
}

impl PlanEntry {
    pub fn new(sheet: impl Into<String>, table_name: Option<String>) -> Self {
        Self {
            sheet: sheet.into(),
            table_name,
        }
    }
}

/// Outcome of validating one sheet/table
#[derive(Debug, Clone, Default, Serialize)]
pub struct SheetResult {
    pub sheet: String,
    pub table_name: Option<String>,
    pub error: Option<String>,
    /// Size of the sheet/table as read, before narrowing to rule columns
    pub loaded_rows: usize,
    pub loaded_columns: usize,
    pub counts: ErrorCounts,
    #[serde(skip)]
    pub html: String,
    pub missing_required: Vec<String>,
    #[serde(skip)]
    pub data: SheetData,
    pub errors: ErrorCells,
}

impl SheetResult {
    pub fn error_total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_display_drops_integral_fraction() {
        assert_eq!(CellValue::Float(2023.0).to_string(), "2023");
        assert_eq!(CellValue::Float(12.5).to_string(), "12.5");
        assert_eq!(CellValue::Float(-3.0).to_string(), "-3");
    }

    #[test]
    fn test_bool_display_matches_spreadsheet_text() {
        assert_eq!(CellValue::Bool(true).to_string(), "True");
        assert_eq!(CellValue::Bool(false).to_string(), "False");
    }

    #[test]
    fn test_empty_detection() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::Text(String::new()).is_empty());
        assert!(!CellValue::Text(" ".to_string()).is_empty());
        assert!(!CellValue::Int(0).is_empty());
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(ErrorKind::EmptyRequired.as_str(), "empty_required");
        assert_eq!(ErrorKind::InvalidYear.label(), "invalid year");
        assert!(ErrorKind::InvalidBoolean.is_type_error());
        assert!(!ErrorKind::BlankIndicator.is_type_error());
    }

    #[test]
    fn test_error_cells_last_write_wins() {
        let mut cells = ErrorCells::new();
        cells.insert(CellKey::cell(0, "Year"), ErrorKind::EmptyRequired);
        cells.insert(CellKey::cell(0, "Year"), ErrorKind::InvalidYear);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells.get(0, "Year"), Some(ErrorKind::InvalidYear));
    }

    #[test]
    fn test_error_cells_serialize_as_list() {
        let mut cells = ErrorCells::new();
        cells.insert(CellKey::whole_column("Fuel"), ErrorKind::MissingColumn);
        cells.insert(CellKey::cell(2, "Year"), ErrorKind::InvalidYear);

        let json = serde_json::to_value(&cells).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"row": null, "column": "Fuel", "error_type": "missing_column"},
                {"row": 2, "column": "Year", "error_type": "invalid_year"}
            ])
        );
    }

    #[test]
    fn test_column_cells_pads_short_rows() {
        let data = SheetData::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![CellValue::Int(1)], vec![CellValue::Int(2), CellValue::Int(3)]],
        );
        let cells: Vec<_> = data.column_cells("B").unwrap().collect();
        assert_eq!(cells, vec![(0, &CellValue::Empty), (1, &CellValue::Int(3))]);
        assert!(data.column_cells("C").is_none());
    }
}
