//! Validation plan and multi-sheet runs

use crate::core::validator::{find_validation_errors, select_validation_columns, summarize_errors};
use crate::error::ValidatorResult;
use crate::excel::Workbook;
use crate::report::style_errors_as_html;
use crate::types::{ErrorCounts, ErrorKind, PlanEntry, RuleBook, SheetResult};

/// Unique `(Sheet, TableName)` pairs from the rules, in first-seen order.
///
/// Rules without a sheet are ignored. Empty when the rules have no `Sheet` column.
pub fn build_validation_plan(rules: &RuleBook) -> Vec<PlanEntry> {
    if !rules.has_sheet_column {
        return Vec::new();
    }

    let mut plan: Vec<PlanEntry> = Vec::new();
    for rule in &rules.rules {
        let Some(sheet) = &rule.sheet else {
            continue;
        };
        let table_name = if rules.has_table_column {
            rule.table_name.clone()
        } else {
            None
        };
        let entry = PlanEntry::new(sheet.clone(), table_name);
        if !plan.contains(&entry) {
            plan.push(entry);
        }
    }
    plan
}

/// First table name the rules give for `sheet`, if any
pub fn derive_table_for_sheet(rules: &RuleBook, sheet: &str) -> Option<String> {
    if !rules.has_table_column || !rules.has_sheet_column {
        return None;
    }
    rules
        .rules_for(sheet)
        .find_map(|rule| rule.table_name.clone())
}

/// Sorted unique scopes (sheet names) named by the rules
pub fn scope_options(rules: &RuleBook) -> Vec<String> {
    let mut options: Vec<String> = rules
        .rules
        .iter()
        .filter_map(|rule| rule.sheet.clone())
        .collect();
    options.sort();
    options.dedup();
    options
}

/// Index of `default` within `options`, falling back to the first option
pub fn default_scope_index(options: &[String], default: &str) -> usize {
    options.iter().position(|o| o == default).unwrap_or(0)
}

/// Load, narrow and check one sheet/table of the workbook
pub fn validate_one_sheet(
    workbook: &mut Workbook,
    rules: &RuleBook,
    sheet: &str,
    table_name: Option<&str>,
) -> ValidatorResult<SheetResult> {
    let loaded = workbook.load(Some(sheet), table_name)?;
    let data = select_validation_columns(&loaded, rules, sheet);
    let errors = find_validation_errors(&data, rules, sheet);
    let counts = summarize_errors(&errors);
    let html = style_errors_as_html(&data, &errors);

    tracing::debug!(
        "Validated '{}' ({} rows): {} error cells",
        sheet,
        data.row_count(),
        errors.len()
    );

    Ok(SheetResult {
        sheet: sheet.to_string(),
        table_name: table_name.map(str::to_string),
        error: None,
        loaded_rows: loaded.row_count(),
        loaded_columns: loaded.column_count(),
        counts,
        html,
        missing_required: data.missing_required.clone(),
        data,
        errors,
    })
}

/// Called after each plan entry with `(index, total, sheet, result)`; index starts at 1
pub type ProgressCallback<'a> = dyn FnMut(usize, usize, &str, &SheetResult) + 'a;

/// Validate every entry of the plan (built from the rules when `None`).
///
/// A sheet or table that cannot be loaded does not stop the run: it becomes a
/// result carrying the error text and a `sheet_not_found` / `table_not_found`
/// count. Returns the summed counts and the per-sheet results in plan order.
pub fn validate_all(
    workbook: &mut Workbook,
    rules: &RuleBook,
    plan: Option<&[PlanEntry]>,
    mut progress: Option<&mut ProgressCallback<'_>>,
) -> (ErrorCounts, Vec<SheetResult>) {
    let built;
    let plan = match plan {
        Some(p) => p,
        None => {
            built = build_validation_plan(rules);
            &built[..]
        }
    };

    let mut overall = ErrorCounts::new();
    let mut results = Vec::with_capacity(plan.len());
    let total = plan.len();

    for (idx, entry) in plan.iter().enumerate() {
        let result = match validate_one_sheet(
            workbook,
            rules,
            &entry.sheet,
            entry.table_name.as_deref(),
        ) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Could not validate '{}': {}", entry.sheet, e);
                let mut counts = ErrorCounts::new();
                if let Some(kind) = ErrorKind::from_load_error(&e) {
                    counts.insert(kind, 1);
                }
                SheetResult {
                    sheet: entry.sheet.clone(),
                    table_name: entry.table_name.clone(),
                    error: Some(e.to_string()),
                    counts,
                    ..SheetResult::default()
                }
            }
        };

        for (kind, count) in &result.counts {
            *overall.entry(*kind).or_insert(0) += count;
        }

        if let Some(callback) = progress.as_deref_mut() {
            callback(idx + 1, total, &entry.sheet, &result);
        }
        results.push(result);
    }

    (overall, results)
}

/// What to validate in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// One scope, optionally narrowed to a named table
    Single { scope: String, table: Option<String> },
    /// Every `(Sheet, TableName)` pair of the validation plan
    All,
}

impl Selection {
    /// Resolve user choices against the rules and configured defaults.
    ///
    /// The table is the explicit one, else the first one the rules give for the
    /// scope, else `default_table`. A blank explicit table, or an empty
    /// `default_table`, reads the whole sheet.
    pub fn resolve(
        rules: &RuleBook,
        scope: Option<&str>,
        table: Option<&str>,
        all: bool,
        default_scope: &str,
        default_table: &str,
    ) -> Self {
        if all {
            return Selection::All;
        }
        let scope = scope.unwrap_or(default_scope).to_string();
        let table = match table {
            Some(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
            Some(_) => None,
            None => derive_table_for_sheet(rules, &scope)
                .or_else(|| (!default_table.is_empty()).then(|| default_table.to_string())),
        };
        Selection::Single { scope, table }
    }
}

/// Run a selection. A single scope that cannot be loaded is an error; in an
/// `All` run load failures are recorded per sheet instead.
pub fn run_selection(
    workbook: &mut Workbook,
    rules: &RuleBook,
    selection: &Selection,
    progress: Option<&mut ProgressCallback<'_>>,
) -> ValidatorResult<(ErrorCounts, Vec<SheetResult>)> {
    match selection {
        Selection::Single { scope, table } => {
            let result = validate_one_sheet(workbook, rules, scope, table.as_deref())?;
            Ok((result.counts.clone(), vec![result]))
        }
        Selection::All => Ok(validate_all(workbook, rules, None, progress)),
    }
}
