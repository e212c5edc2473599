//! Annotated workbook export - validated data with failing cells coloured

use crate::error::ValidatorResult;
use crate::report::summary_lines;
use crate::types::{CellValue, ErrorCounts, ErrorKind, RuleBook, SheetResult, EMPTY_CELL};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;

/// Excel's sheet name limit
const MAX_SHEET_NAME: usize = 31;

/// Writes sheet results to a new `.xlsx`, one worksheet per result plus a summary
pub struct AnnotatedExporter<'a> {
    results: &'a [SheetResult],
    overall: &'a ErrorCounts,
    rules: &'a RuleBook,
}

impl<'a> AnnotatedExporter<'a> {
    pub fn new(results: &'a [SheetResult], overall: &'a ErrorCounts, rules: &'a RuleBook) -> Self {
        Self {
            results,
            overall,
            rules,
        }
    }

    /// Save to a file
    pub fn export(&self, output_path: &Path) -> ValidatorResult<()> {
        let mut workbook = self.build()?;
        workbook.save(output_path)?;
        Ok(())
    }

    /// Serialize to bytes (for downloads)
    pub fn to_bytes(&self) -> ValidatorResult<Vec<u8>> {
        let mut workbook = self.build()?;
        Ok(workbook.save_to_buffer()?)
    }

    fn build(&self) -> ValidatorResult<Workbook> {
        let mut workbook = Workbook::new();
        let mut used_names: HashSet<String> = HashSet::new();
        used_names.insert("summary".to_string());

        self.write_summary(workbook.add_worksheet())?;

        for result in self.results {
            let name = unique_sheet_name(&result.sheet, &mut used_names);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&name)?;
            self.write_result(worksheet, result)?;
        }

        Ok(workbook)
    }

    fn write_summary(&self, worksheet: &mut Worksheet) -> ValidatorResult<()> {
        let bold = Format::new().set_bold();
        worksheet.set_name("Summary")?;
        worksheet.write_string_with_format(0, 0, "Error type", &bold)?;
        worksheet.write_string_with_format(0, 1, "Count", &bold)?;
        worksheet.write_string_with_format(0, 2, "Message", &bold)?;

        let lines = summary_lines(self.overall, self.rules);
        for (idx, ((kind, count), line)) in self.overall.iter().zip(lines).enumerate() {
            let row = idx as u32 + 1;
            worksheet.write_string(row, 0, kind.as_str())?;
            worksheet.write_number(row, 1, *count as f64)?;
            worksheet.write_string(row, 2, &line)?;
        }

        if self.overall.is_empty() {
            worksheet.write_string(1, 0, "No validation errors found!")?;
        }
        worksheet.set_column_width(0, 20)?;
        worksheet.set_column_width(2, 60)?;
        Ok(())
    }

    fn write_result(&self, worksheet: &mut Worksheet, result: &SheetResult) -> ValidatorResult<()> {
        let bold = Format::new().set_bold();

        if let Some(error) = &result.error {
            worksheet.write_string(0, 0, error)?;
            return Ok(());
        }

        let data = &result.data;
        for (col, name) in data.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &bold)?;
        }

        for (row_idx, row) in data.rows.iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            for (col_idx, column) in data.columns.iter().enumerate() {
                let value = row.get(col_idx).unwrap_or(&EMPTY_CELL);
                let format = result.errors.get(row_idx, column).and_then(error_format);
                write_cell(worksheet, row_num, col_idx as u16, value, format.as_ref())?;
            }
        }

        if !result.missing_required.is_empty() {
            let note_row = data.rows.len() as u32 + 2;
            worksheet.write_string_with_format(note_row, 0, "Missing columns", &bold)?;
            for (i, column) in result.missing_required.iter().enumerate() {
                worksheet.write_string(note_row + 1 + i as u32, 0, column)?;
            }
        }
        Ok(())
    }
}

/// Fill colours matching the HTML report
fn error_format(kind: ErrorKind) -> Option<Format> {
    let format = match kind {
        ErrorKind::EmptyRequired => Format::new()
            .set_background_color(Color::RGB(0xFF6B6B))
            .set_font_color(Color::White),
        ErrorKind::BlankIndicator => Format::new()
            .set_background_color(Color::RGB(0xFF8787))
            .set_font_color(Color::White),
        k if k.is_type_error() => Format::new()
            .set_background_color(Color::RGB(0xFFA8A8))
            .set_font_color(Color::Black),
        _ => return None,
    };
    Some(format.set_bold())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> ValidatorResult<()> {
    let default = Format::new();
    let format = format.unwrap_or(&default);
    match value {
        CellValue::Empty => {
            worksheet.write_blank(row, col, format)?;
        }
        CellValue::Int(i) => {
            worksheet.write_number_with_format(row, col, *i as f64, format)?;
        }
        CellValue::Float(f) => {
            worksheet.write_number_with_format(row, col, *f, format)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        other => {
            worksheet.write_string_with_format(row, col, other.to_string(), format)?;
        }
    }
    Ok(())
}

/// Excel-safe, unique worksheet name
fn unique_sheet_name(sheet: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = sheet
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            _ => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let base = if cleaned.trim().is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    };

    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.len());
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(name.to_lowercase());
    name
}
