//! Workbook loading - user workbooks (sheet or named table) and cell conversion

use crate::error::{ValidatorError, ValidatorResult};
use crate::types::{CellValue, SheetData};
use calamine::{Data, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// An opened `.xlsx` workbook, read from disk or from uploaded bytes
pub struct Workbook {
    inner: Xlsx<Cursor<Vec<u8>>>,
    tables_loaded: bool,
}

impl Workbook {
    /// Open a workbook from a filesystem path
    pub fn open<P: AsRef<Path>>(path: P) -> ValidatorResult<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_bytes(bytes)
    }

    /// Open a workbook from in-memory bytes (an upload)
    pub fn from_bytes(bytes: Vec<u8>) -> ValidatorResult<Self> {
        let inner = Xlsx::new(Cursor::new(bytes))?;
        Ok(Self {
            inner,
            tables_loaded: false,
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names().to_vec()
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.inner.sheet_names().iter().any(|s| s == sheet)
    }

    /// Resolve an optional sheet name to an existing sheet (first sheet when `None`)
    fn resolve_sheet(&self, sheet: Option<&str>) -> ValidatorResult<String> {
        match sheet {
            Some(name) if self.has_sheet(name) => Ok(name.to_string()),
            Some(name) => Err(ValidatorError::SheetNotFound {
                sheet: name.to_string(),
            }),
            None => self
                .inner
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ValidatorError::SheetNotFound {
                    sheet: "<first sheet>".to_string(),
                }),
        }
    }

    /// Raw used range of a sheet
    pub fn sheet_range(&mut self, sheet: &str) -> ValidatorResult<Range<Data>> {
        if !self.has_sheet(sheet) {
            return Err(ValidatorError::SheetNotFound {
                sheet: sheet.to_string(),
            });
        }
        Ok(self.inner.worksheet_range(sheet)?)
    }

    /// Names of the Excel tables defined on a sheet
    pub fn table_names_in_sheet(&mut self, sheet: &str) -> ValidatorResult<Vec<String>> {
        self.ensure_tables()?;
        Ok(self
            .inner
            .table_names_in_sheet(sheet)
            .into_iter()
            .cloned()
            .collect())
    }

    fn ensure_tables(&mut self) -> ValidatorResult<()> {
        if !self.tables_loaded {
            self.inner.load_tables()?;
            self.tables_loaded = true;
        }
        Ok(())
    }

    /// Load a sheet, or only a named table on it.
    ///
    /// - With `table_name`, the table must sit on the resolved sheet. The table
    ///   header row gives the columns and the table body gives the rows.
    /// - Without it, the sheet's used range is read with its first row as header.
    pub fn load(
        &mut self,
        sheet_name: Option<&str>,
        table_name: Option<&str>,
    ) -> ValidatorResult<SheetData> {
        let sheet = self.resolve_sheet(sheet_name)?;

        match table_name {
            Some(table) => self.load_table(&sheet, table),
            None => {
                let range = self.sheet_range(&sheet)?;
                Ok(sheet_from_range(&range))
            }
        }
    }

    fn load_table(&mut self, sheet: &str, table: &str) -> ValidatorResult<SheetData> {
        let on_sheet = self.table_names_in_sheet(sheet)?;
        if !on_sheet.iter().any(|t| t == table) {
            return Err(ValidatorError::TableNotFound {
                table: table.to_string(),
                sheet: sheet.to_string(),
            });
        }

        let excel_table = self.inner.table_by_name(table)?;
        let columns = excel_table.columns().to_vec();
        let width = columns.len();
        let rows = excel_table
            .data()
            .rows()
            .map(|row| {
                let mut cells: Vec<CellValue> = row.iter().map(convert_cell).collect();
                cells.resize(width, CellValue::Empty);
                cells
            })
            .collect();

        tracing::debug!("Loaded table '{}' from sheet '{}'", table, sheet);
        Ok(SheetData::new(columns, rows))
    }
}

/// Load a sheet or named table from a workbook
pub fn load_excel_data(
    workbook: &mut Workbook,
    sheet_name: Option<&str>,
    table_name: Option<&str>,
) -> ValidatorResult<SheetData> {
    workbook.load(sheet_name, table_name)
}

/// Build sheet data from a used range, first row as header.
///
/// calamine trims empty leading columns from the used range. They are put
/// back so header positions (and `Unnamed: <i>` names) count from column A.
pub fn sheet_from_range(range: &Range<Data>) -> SheetData {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return SheetData::default();
    };
    let lead = range.start().map_or(0, |(_, col)| col as usize);

    let mut header = vec![Data::Empty; lead];
    header.extend_from_slice(header_row);
    let columns = header_names(&header);
    let width = columns.len();
    let body = rows
        .map(|row| {
            let mut cells = vec![CellValue::Empty; lead];
            cells.extend(row.iter().map(convert_cell));
            cells.resize(width, CellValue::Empty);
            cells
        })
        .collect();

    SheetData::new(columns, body)
}

/// Header names for a sheet read without a table.
///
/// Blank headers become `Unnamed: <i>`; repeated names get `.1`, `.2`, ... suffixes.
pub fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(row.len());

    for (idx, cell) in row.iter().enumerate() {
        let raw = convert_cell(cell).to_string();
        let base = if raw.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            raw
        };

        let name = match seen.get_mut(&base) {
            Some(count) => {
                *count += 1;
                format!("{}.{}", base, count)
            }
            None => base.clone(),
        };
        seen.entry(base).or_insert(0);
        names.push(name);
    }

    names
}

/// Convert a calamine cell to a `CellValue`
pub fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) => CellValue::DateTime(excel_datetime_to_string(dt.as_f64())),
        Data::DateTimeIso(s) => CellValue::DateTime(s.replace('T', " ")),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Excel serial date (1900 system) → `YYYY-MM-DD HH:MM:SS`
pub fn excel_datetime_to_string(serial: f64) -> String {
    use chrono::{Duration, NaiveDate};

    let Some(base) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return serial.to_string();
    };
    let days = serial.trunc() as i64;
    let seconds = ((serial - days as f64) * 86400.0).round() as i64;
    let datetime = base + Duration::days(days) + Duration::seconds(seconds);
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}
