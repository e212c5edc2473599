//! Cell-by-cell validation of loaded sheet data against the rules for one scope

use crate::types::{CellKey, CellValue, ErrorCells, ErrorCounts, ErrorKind, RuleBook, SheetData};

/// Placeholder strings that stand in for a missing value
pub const BLANK_INDICATORS: &[&str] = &[
    "N/A", "n/a", "#N/A", "#n/a", "NA#", "na#", "#NA", "#na", "NULL", "null", "#ERROR", "#Error",
];

/// Text accepted in `bool` / `boolean` columns
pub const VALID_BOOLEAN_VALUES: &[&str] = &[
    "true", "false", "y", "n", "yes", "no", "1", "0", "True", "False", "Y", "N", "Yes", "No",
    "TRUE", "FALSE", "YES", "NO",
];

pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 2100;

/// Expected type of a column, from the rule's `Datatype` (case-insensitive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Year,
    Integer,
    Float,
    Boolean,
    /// Any other datatype; no type check is applied
    Unchecked,
}

impl ColumnType {
    pub fn parse(datatype: &str) -> Self {
        match datatype.trim().to_lowercase().as_str() {
            "year" => ColumnType::Year,
            "int" | "integer" => ColumnType::Integer,
            "float" | "number" | "numeric" => ColumnType::Float,
            "bool" | "boolean" => ColumnType::Boolean,
            _ => ColumnType::Unchecked,
        }
    }

    /// Type error for a clean (non-empty, non-placeholder) cell, if any
    pub fn check(&self, value: &CellValue) -> Option<ErrorKind> {
        match self {
            ColumnType::Year => match parse_integer(value) {
                Some(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => None,
                _ => Some(ErrorKind::InvalidYear),
            },
            ColumnType::Integer => match parse_integer(value) {
                Some(_) => None,
                None => Some(ErrorKind::InvalidInteger),
            },
            ColumnType::Float => match parse_float(value) {
                Some(_) => None,
                None => Some(ErrorKind::InvalidFloat),
            },
            ColumnType::Boolean => {
                if value.is_bool() || VALID_BOOLEAN_VALUES.contains(&value.to_string().trim()) {
                    None
                } else {
                    Some(ErrorKind::InvalidBoolean)
                }
            }
            ColumnType::Unchecked => None,
        }
    }
}

/// Parse the cell's text as a float (surrounding whitespace allowed)
pub fn parse_float(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Int(i) => Some(*i as f64),
        CellValue::Float(f) => Some(*f),
        other => other.to_string().trim().parse::<f64>().ok(),
    }
}

/// Parse as float then truncate toward zero; NaN and infinities are rejected
pub fn parse_integer(value: &CellValue) -> Option<i64> {
    let f = parse_float(value)?;
    if f.is_finite() {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

pub fn is_blank_indicator(value: &CellValue) -> bool {
    if value.is_missing() {
        return false;
    }
    BLANK_INDICATORS.contains(&value.to_string().trim())
}

/// Keep only the columns the rules list for `sheet`.
///
/// Columns keep rule order (first occurrence wins). Rule columns absent from
/// `data` are recorded in `missing_required` on the result. With no rule
/// column present the result has no rows either.
pub fn select_validation_columns(data: &SheetData, rules: &RuleBook, sheet: &str) -> SheetData {
    let mut present: Vec<(String, usize)> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    for rule in rules.rules_for(sheet) {
        let name = &rule.column;
        if present.iter().any(|(c, _)| c == name) || missing.contains(name) {
            continue;
        }
        match data.column_index(name) {
            Some(idx) => present.push((name.clone(), idx)),
            None => missing.push(name.clone()),
        }
    }

    if present.is_empty() {
        return SheetData {
            missing_required: missing,
            ..SheetData::default()
        };
    }

    let rows = data
        .rows
        .iter()
        .map(|row| {
            present
                .iter()
                .map(|(_, idx)| row.get(*idx).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();

    SheetData {
        columns: present.into_iter().map(|(name, _)| name).collect(),
        rows,
        missing_required: missing,
    }
}

/// Find every failing cell of `data` under the rules for `sheet`.
///
/// Each missing rule column yields one whole-column `missing_column` finding.
/// For present columns, checks run in order: empty required cells, blank
/// indicators (unless the rule allows broken refs), then the datatype check
/// on the remaining clean cells.
pub fn find_validation_errors(data: &SheetData, rules: &RuleBook, sheet: &str) -> ErrorCells {
    let mut cells = ErrorCells::new();

    for column in &data.missing_required {
        cells.insert(CellKey::whole_column(column.clone()), ErrorKind::MissingColumn);
    }

    for rule in rules.rules_for(sheet) {
        let Some(column_cells) = data.column_cells(&rule.column) else {
            continue;
        };
        let column_cells: Vec<(usize, &CellValue)> = column_cells.collect();
        let column_type = ColumnType::parse(&rule.datatype);

        if rule.required {
            for (row, value) in &column_cells {
                if value.is_empty() {
                    cells.insert(CellKey::cell(*row, &rule.column), ErrorKind::EmptyRequired);
                }
            }
        }

        if !rule.allow_broken_refs {
            for (row, value) in &column_cells {
                if is_blank_indicator(value) {
                    cells.insert(CellKey::cell(*row, &rule.column), ErrorKind::BlankIndicator);
                }
            }
        }

        for (row, value) in &column_cells {
            if value.is_empty() || is_blank_indicator(value) {
                continue;
            }
            if let Some(kind) = column_type.check(value) {
                cells.insert(CellKey::cell(*row, &rule.column), kind);
            }
        }
    }

    cells
}

/// Count findings per error kind
pub fn summarize_errors(cells: &ErrorCells) -> ErrorCounts {
    let mut counts = ErrorCounts::new();
    for (_, kind) in cells.iter() {
        *counts.entry(*kind).or_insert(0) += 1;
    }
    counts
}
