//! Shared workbook fixtures for integration tests
//!
//! Builds a client data folder holding `Validations/validations.xlsx` plus
//! upload workbooks, all inside a temp dir.

#![allow(dead_code)]

use rust_xlsxwriter::{Table, TableColumn, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Rules rows: Sheet, TableName, Column, Datatype, Required, AllowBrokenRefs
const RULES: &[(&str, &str, &str, &str, Flag, Flag)] = &[
    ("TestScope", "TestScopeCalcs", "Year", "year", Flag::Bool(true), Flag::Bool(false)),
    ("TestScope", "TestScopeCalcs", "Amount", "float", Flag::Text("yes"), Flag::Blank),
    ("TestScope", "TestScopeCalcs", "Count", "integer", Flag::Number(0.0), Flag::Number(0.0)),
    ("TestScope", "TestScopeCalcs", "Active", "boolean", Flag::Bool(false), Flag::Bool(false)),
    ("TestScope", "TestScopeCalcs", "Notes", "text", Flag::Bool(false), Flag::Bool(true)),
    ("Scope 1", "", "Fuel", "text", Flag::Bool(true), Flag::Bool(false)),
    ("Scope 1", "", "Quantity", "number", Flag::Bool(true), Flag::Bool(false)),
    ("Scope 1", "", "Unit", "text", Flag::Bool(true), Flag::Bool(false)),
    ("Scope 2", "Scope2Calcs", "Year", "year", Flag::Bool(true), Flag::Bool(false)),
    ("Missing Sheet", "", "Site", "text", Flag::Bool(true), Flag::Bool(false)),
];

const MESSAGES: &[(&str, &str)] = &[
    ("empty_required", "Required value is empty"),
    ("blank_indicator", "Placeholder value found"),
];

#[derive(Clone, Copy)]
enum Flag {
    Bool(bool),
    Number(f64),
    Text(&'static str),
    Blank,
}

fn write_flag(ws: &mut Worksheet, row: u32, col: u16, flag: Flag) {
    match flag {
        Flag::Bool(b) => {
            ws.write_boolean(row, col, b).unwrap();
        }
        Flag::Number(n) => {
            ws.write_number(row, col, n).unwrap();
        }
        Flag::Text(s) => {
            ws.write_string(row, col, s).unwrap();
        }
        Flag::Blank => {}
    }
}

/// Write `<client_data>/Validations/validations.xlsx`
pub fn write_validations(client_data: &Path) -> PathBuf {
    let dir = client_data.join("Validations");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("validations.xlsx");

    let mut workbook = Workbook::new();

    let ws = workbook.add_worksheet();
    ws.set_name("Columns").unwrap();
    let headers = ["Sheet", "TableName", "Column", "Datatype", "Required", "AllowBrokenRefs"];
    for (col, header) in headers.iter().enumerate() {
        ws.write_string(0, col as u16, *header).unwrap();
    }
    for (idx, (sheet, table, column, datatype, required, broken)) in RULES.iter().enumerate() {
        let row = idx as u32 + 1;
        ws.write_string(row, 0, *sheet).unwrap();
        if !table.is_empty() {
            ws.write_string(row, 1, *table).unwrap();
        }
        ws.write_string(row, 2, *column).unwrap();
        ws.write_string(row, 3, *datatype).unwrap();
        write_flag(ws, row, 4, *required);
        write_flag(ws, row, 5, *broken);
    }

    let ws = workbook.add_worksheet();
    ws.set_name("Messages").unwrap();
    ws.write_string(0, 0, "ErrorType").unwrap();
    ws.write_string(0, 1, "Message").unwrap();
    for (idx, (error_type, message)) in MESSAGES.iter().enumerate() {
        ws.write_string(idx as u32 + 1, 0, *error_type).unwrap();
        ws.write_string(idx as u32 + 1, 1, *message).unwrap();
    }

    workbook.save(&path).unwrap();
    path
}

fn add_named_table(ws: &mut Worksheet, name: &str, headers: &[&str], last_row: u32) {
    let columns: Vec<TableColumn> = headers
        .iter()
        .map(|h| TableColumn::new().set_header(*h))
        .collect();
    let table = Table::new().set_name(name).set_columns(&columns);
    ws.add_table(0, 0, last_row, headers.len() as u16 - 1, &table)
        .unwrap();
}

/// Upload with findings on every checked sheet.
///
/// `TestScope` (table `TestScopeCalcs`): invalid_year, invalid_float,
/// invalid_integer, invalid_boolean, empty_required and blank_indicator, one each.
/// `Scope 1` (plain range): empty_required, blank_indicator, missing_column (`Unit`).
/// `Scope 2` has data but no `Scope2Calcs` table.
pub fn write_upload(path: &Path) {
    let mut workbook = Workbook::new();

    let ws = workbook.add_worksheet();
    ws.set_name("TestScope").unwrap();
    add_named_table(
        ws,
        "TestScopeCalcs",
        &["Year", "Amount", "Count", "Active", "Notes", "Extra"],
        3,
    );
    // clean row
    ws.write_number(1, 0, 2021.0).unwrap();
    ws.write_number(1, 1, 10.5).unwrap();
    ws.write_number(1, 2, 3.0).unwrap();
    ws.write_string(1, 3, "yes").unwrap();
    ws.write_string(1, 4, "ok").unwrap();
    ws.write_string(1, 5, "x").unwrap();
    // type errors; Notes allows broken refs
    ws.write_number(2, 0, 1800.0).unwrap();
    ws.write_string(2, 1, "abc").unwrap();
    ws.write_string(2, 2, "three").unwrap();
    ws.write_string(2, 3, "maybe").unwrap();
    ws.write_string(2, 4, "N/A").unwrap();
    // empty required Year, placeholder Amount
    ws.write_string(3, 1, "N/A").unwrap();
    ws.write_number(3, 2, 4.0).unwrap();
    ws.write_string(3, 3, "TRUE").unwrap();

    let ws = workbook.add_worksheet();
    ws.set_name("Scope 1").unwrap();
    ws.write_string(0, 0, "Fuel").unwrap();
    ws.write_string(0, 1, "Quantity").unwrap();
    ws.write_string(1, 0, "Diesel").unwrap();
    ws.write_number(1, 1, 12.0).unwrap();
    ws.write_string(2, 1, "NULL").unwrap();

    let ws = workbook.add_worksheet();
    ws.set_name("Scope 2").unwrap();
    ws.write_string(0, 0, "Year").unwrap();
    ws.write_number(1, 0, 2020.0).unwrap();

    workbook.save(path).unwrap();
}

/// Upload whose `TestScope` table passes every rule
pub fn write_clean_upload(path: &Path) {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("TestScope").unwrap();
    add_named_table(
        ws,
        "TestScopeCalcs",
        &["Year", "Amount", "Count", "Active", "Notes"],
        2,
    );
    ws.write_number(1, 0, 2022.0).unwrap();
    ws.write_number(1, 1, 1.5).unwrap();
    ws.write_number(1, 2, 2.0).unwrap();
    ws.write_boolean(1, 3, true).unwrap();
    ws.write_string(1, 4, "fine").unwrap();
    ws.write_number(2, 0, 2023.0).unwrap();
    ws.write_string(2, 1, " 7.25 ").unwrap();
    ws.write_string(2, 2, "12").unwrap();
    ws.write_string(2, 3, "No").unwrap();
    workbook.save(path).unwrap();
}

/// Temp client data folder with the reference workbook and both uploads
pub struct Fixture {
    pub dir: TempDir,
    pub client_data: PathBuf,
    pub upload: PathBuf,
    pub clean_upload: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let client_data = dir.path().join("client");
        write_validations(&client_data);

        let upload = dir.path().join("upload.xlsx");
        write_upload(&upload);
        let clean_upload = dir.path().join("clean.xlsx");
        write_clean_upload(&clean_upload);

        Self {
            dir,
            client_data,
            upload,
            clean_upload,
        }
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
