//! Reference workbook reader - validation rules (`Columns`) and messages (`Messages`)

use crate::config::validations_path;
use crate::error::{ValidatorError, ValidatorResult};
use crate::excel::loader::Workbook;
use crate::types::{CellValue, ErrorMessage, RuleBook, SheetData, ValidationRule, EMPTY_CELL};
use std::path::Path;

pub const RULES_SHEET: &str = "Columns";
pub const MESSAGES_SHEET: &str = "Messages";

/// Load validation rules and error messages from `<client_data_path>/Validations/validations.xlsx`.
///
/// The workbook is only ever read; users cannot edit it through this tool.
pub fn load_backend_validations(client_data_path: &Path) -> ValidatorResult<RuleBook> {
    let path = validations_path(Some(client_data_path));
    if !path.exists() {
        return Err(ValidatorError::Rules(format!(
            "Validations workbook not found: {}",
            path.display()
        )));
    }
    let mut workbook = Workbook::open(&path)?;
    load_rule_book(&mut workbook)
}

/// Read both reference sheets from an opened workbook
pub fn load_rule_book(workbook: &mut Workbook) -> ValidatorResult<RuleBook> {
    let columns_sheet = workbook.load(Some(RULES_SHEET), None)?;
    let messages_sheet = workbook.load(Some(MESSAGES_SHEET), None)?;

    let mut book = RuleBook::new(parse_rules(&columns_sheet)?, parse_messages(&messages_sheet)?);
    book.has_sheet_column = columns_sheet.has_column("Sheet");
    book.has_table_column = columns_sheet.has_column("TableName");

    tracing::debug!(
        "Loaded {} validation rules and {} messages",
        book.rules.len(),
        book.messages.len()
    );
    Ok(book)
}

/// Parse the `Columns` sheet. `Sheet` and `TableName` are optional headers.
pub fn parse_rules(sheet: &SheetData) -> ValidatorResult<Vec<ValidationRule>> {
    let column_idx = required_header(sheet, RULES_SHEET, "Column")?;
    let datatype_idx = required_header(sheet, RULES_SHEET, "Datatype")?;
    let required_idx = required_header(sheet, RULES_SHEET, "Required")?;
    let broken_refs_idx = required_header(sheet, RULES_SHEET, "AllowBrokenRefs")?;
    let sheet_idx = sheet.column_index("Sheet");
    let table_idx = sheet.column_index("TableName");

    let mut rules = Vec::new();
    for row in &sheet.rows {
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

        let Some(column) = text_of(cell(column_idx)) else {
            // rows without a column name carry no rule
            continue;
        };

        rules.push(ValidationRule {
            sheet: sheet_idx.and_then(|i| text_of(cell(i))),
            table_name: table_idx.and_then(|i| text_of(cell(i))),
            column,
            datatype: cell(datatype_idx).to_string(),
            required: is_truthy(cell(required_idx)),
            allow_broken_refs: is_truthy(cell(broken_refs_idx)),
        });
    }
    Ok(rules)
}

/// Parse the `Messages` sheet (`ErrorType`, `Message`)
pub fn parse_messages(sheet: &SheetData) -> ValidatorResult<Vec<ErrorMessage>> {
    let type_idx = required_header(sheet, MESSAGES_SHEET, "ErrorType")?;
    let message_idx = required_header(sheet, MESSAGES_SHEET, "Message")?;

    Ok(sheet
        .rows
        .iter()
        .filter_map(|row| {
            let error_type = row.get(type_idx).and_then(text_of)?;
            let message = row.get(message_idx).map(|c| c.to_string()).unwrap_or_default();
            Some(ErrorMessage {
                error_type,
                message,
            })
        })
        .collect())
}

fn required_header(sheet: &SheetData, sheet_name: &str, header: &str) -> ValidatorResult<usize> {
    sheet.column_index(header).ok_or_else(|| {
        ValidatorError::Rules(format!(
            "Sheet '{}' has no '{}' column",
            sheet_name, header
        ))
    })
}

/// Cell text as written, or `None` when the cell is blank or whitespace.
/// Names are matched against sheet headers exactly, so they are not trimmed.
fn text_of(cell: &CellValue) -> Option<String> {
    let text = cell.to_string();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Flag cells: booleans, non-zero numbers, or `true/yes/y/1` text. Blank is false.
pub fn is_truthy(cell: &CellValue) -> bool {
    match cell {
        CellValue::Bool(b) => *b,
        CellValue::Int(i) => *i != 0,
        CellValue::Float(f) => *f != 0.0 && !f.is_nan(),
        CellValue::Text(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}
