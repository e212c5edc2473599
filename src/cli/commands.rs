use crate::config::ValidatorConfig;
use crate::core::{
    default_scope_index, run_selection, scope_options, ProgressCallback, Selection,
};
use crate::error::{ValidatorError, ValidatorResult};
use crate::excel::{load_backend_validations, AnnotatedExporter, Workbook};
use crate::report::{render_results_page, summary_lines};
use crate::types::{ErrorCounts, RuleBook, SheetData, SheetResult};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

const REPORT_TITLE: &str = "Validation Report";

/// Rows shown per sheet with `--verbose`
const PREVIEW_ROWS: usize = 5;

/// Scope/table choices shared by `validate` and `watch`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub scope: Option<String>,
    pub table: Option<String>,
    pub all: bool,
}

/// Outcome of one run, as written to JSON reports
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub file: String,
    pub total_errors: usize,
    pub counts: &'a ErrorCounts,
    pub results: &'a [SheetResult],
}

fn load_rules(config: &ValidatorConfig, verbose: bool) -> ValidatorResult<RuleBook> {
    if verbose {
        println!(
            "{}",
            format!("📖 Reading rules: {}", config.validations_path().display()).cyan()
        );
    }
    let rules = load_backend_validations(&config.client_data_path)?;
    if verbose {
        println!(
            "   Found {} rules, {} messages\n",
            rules.rules.len(),
            rules.messages.len()
        );
    }
    Ok(rules)
}

fn selection_for(rules: &RuleBook, config: &ValidatorConfig, options: &RunOptions) -> Selection {
    Selection::resolve(
        rules,
        options.scope.as_deref(),
        options.table.as_deref(),
        options.all,
        &config.default_scope,
        &config.default_table,
    )
}

/// Open the workbook and run the selection, printing progress for plan runs
fn run_once(
    file: &Path,
    rules: &RuleBook,
    selection: &Selection,
    verbose: bool,
) -> ValidatorResult<(ErrorCounts, Vec<SheetResult>)> {
    let mut workbook = Workbook::open(file)?;

    let mut print_progress = |idx: usize, total: usize, sheet: &str, result: &SheetResult| {
        let status = match &result.error {
            Some(e) => format!("❌ {}", e).red().to_string(),
            None if result.counts.is_empty() => "✅ no errors".green().to_string(),
            None => format!("⚠️  {} error cell(s)", result.error_total())
                .yellow()
                .to_string(),
        };
        println!("   [{}/{}] {} {}", idx, total, sheet.bright_blue().bold(), status);
    };
    let progress: Option<&mut ProgressCallback<'_>> = match selection {
        Selection::All => Some(&mut print_progress),
        Selection::Single { .. } => None,
    };

    let (overall, results) = run_selection(&mut workbook, rules, selection, progress)?;

    if verbose {
        for result in &results {
            println!(
                "   {} rows, {} columns validated in {}",
                result.data.row_count(),
                result.data.column_count(),
                result.sheet.cyan()
            );
            print_preview(&result.data.head(PREVIEW_ROWS));
        }
        println!();
    }
    Ok((overall, results))
}

fn print_preview(preview: &SheetData) {
    if preview.columns.is_empty() {
        return;
    }
    println!("      {}", preview.columns.join(" | ").dimmed());
    for row in &preview.rows {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        println!("      {}", cells.join(" | "));
    }
}

fn print_summary(overall: &ErrorCounts, results: &[SheetResult], rules: &RuleBook) {
    println!("{}", "📋 Summary:".bold().cyan());
    for result in results {
        if !result.missing_required.is_empty() {
            println!(
                "   {} {}: {}",
                "Missing columns in".yellow(),
                result.sheet.bright_blue(),
                result.missing_required.join(", ")
            );
        }
    }
    if overall.is_empty() {
        println!("   {}", "✅ No validation errors found!".bold().green());
    } else {
        for line in summary_lines(overall, rules) {
            println!("   - {}", line);
        }
    }
    println!();
}

/// Write the report; the format follows the output extension (.html, .xlsx, .json)
pub fn write_report(
    output: &Path,
    file: &Path,
    overall: &ErrorCounts,
    results: &[SheetResult],
    rules: &RuleBook,
    css: Option<&str>,
) -> ValidatorResult<()> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => {
            let page = render_results_page(REPORT_TITLE, overall, results, rules, css);
            fs::write(output, page)?;
        }
        "xlsx" => AnnotatedExporter::new(results, overall, rules).export(output)?,
        "json" => {
            let report = RunReport {
                file: file.display().to_string(),
                total_errors: overall.values().sum(),
                counts: overall,
                results,
            };
            fs::write(output, serde_json::to_string_pretty(&report)?)?;
        }
        other => {
            return Err(ValidatorError::Config(format!(
                "Unsupported report format '.{}' (use .html, .xlsx or .json)",
                other
            )))
        }
    }
    Ok(())
}

/// Execute the validate command
pub fn validate(
    file: PathBuf,
    config: &ValidatorConfig,
    options: RunOptions,
    output: Option<PathBuf>,
    verbose: bool,
) -> ValidatorResult<()> {
    println!("{}", "🔍 MyCarbon - Validating workbook".bold().green());
    println!("   File: {}", file.display());

    if !file.exists() {
        return Err(ValidatorError::Config(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let rules = load_rules(config, verbose)?;
    let selection = selection_for(&rules, config, &options);
    match &selection {
        Selection::Single { scope, table } => {
            println!("   Scope: {}", scope.bright_yellow().bold());
            if let Some(t) = table {
                println!("   Table: {}", t.bright_yellow());
            }
        }
        Selection::All => println!("   Scope: {}", "all sheets in plan".bright_yellow().bold()),
    }
    println!();

    let (overall, results) = run_once(&file, &rules, &selection, verbose)?;

    if let Selection::Single { .. } = selection {
        if let Some(result) = results.first() {
            println!(
                "{}",
                format!(
                    "✅ Loaded {} rows and {} columns.",
                    result.loaded_rows,
                    result.loaded_columns
                )
                .green()
            );
            println!();
        }
    }

    print_summary(&overall, &results, &rules);

    if let Some(ref output_path) = output {
        let css = config.stylesheet();
        write_report(output_path, &file, &overall, &results, &rules, css.as_deref())?;
        println!(
            "{}",
            format!("📄 Report written to {}", output_path.display()).cyan()
        );
    }

    let total: usize = overall.values().sum();
    if total > 0 {
        return Err(ValidatorError::ValidationFailed(total));
    }
    Ok(())
}

/// Execute the scopes command - list the sheets the rules cover
pub fn scopes(config: &ValidatorConfig) -> ValidatorResult<()> {
    let rules = load_rules(config, false)?;
    let options = scope_options(&rules);

    println!("{}", "📚 Scopes (sheet names):".bold().green());
    if options.is_empty() {
        println!("   (none - rules have no Sheet column; default: {})", config.default_scope);
        return Ok(());
    }

    let default_idx = default_scope_index(&options, &config.default_scope);
    for (idx, scope) in options.iter().enumerate() {
        if idx == default_idx {
            println!("   {} {}", scope.bright_blue().bold(), "(default)".dimmed());
        } else {
            println!("   {}", scope);
        }
    }
    Ok(())
}

/// Execute the watch command - re-validate whenever the workbook is saved
pub fn watch(
    file: PathBuf,
    config: &ValidatorConfig,
    options: RunOptions,
    verbose: bool,
) -> ValidatorResult<()> {
    println!("{}", "👁️  MyCarbon - Watch Mode".bold().green());
    println!("   Watching: {}", file.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(ValidatorError::Config(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let rules = load_rules(config, verbose)?;
    let selection = selection_for(&rules, config, &options);

    let canonical_path = file.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| ValidatorError::Config("Cannot determine parent directory".to_string()))?;

    let (tx, rx) = channel();

    // Debounce so a save that touches the file several times runs once
    let mut debouncer = new_debouncer(Duration::from_millis(300), tx)
        .map_err(|e| ValidatorError::Config(format!("Failed to create file watcher: {}", e)))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| ValidatorError::Config(format!("Failed to watch directory: {}", e)))?;

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(&file, &rules, &selection, verbose);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event.path.file_name() == canonical_path.file_name()
                });
                if relevant {
                    println!("{}", "🔄 Change detected, re-validating...".cyan());
                    run_watch_action(&file, &rules, &selection, verbose);
                }
            }
            Ok(Err(e)) => {
                println!("{}", format!("⚠️  Watch error: {}", e).yellow());
            }
            Err(e) => {
                return Err(ValidatorError::Config(format!("Watch channel closed: {}", e)));
            }
        }
    }
}

fn run_watch_action(file: &Path, rules: &RuleBook, selection: &Selection, verbose: bool) {
    match run_once(file, rules, selection, verbose) {
        Ok((overall, results)) => print_summary(&overall, &results, rules),
        // Excel may still hold the file mid-save; the next event retries
        Err(e) => println!("{}\n", format!("❌ {}", e).red()),
    }
}

/// Execute the serve command - start the upload server
pub fn serve(config: ValidatorConfig) -> ValidatorResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(crate::api::run_api_server(config))
        .map_err(|e| ValidatorError::Server(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_write_report_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report.pdf");
        let result = write_report(
            &out,
            Path::new("in.xlsx"),
            &ErrorCounts::new(),
            &[],
            &RuleBook::default(),
            None,
        );
        assert!(matches!(result, Err(ValidatorError::Config(_))));
    }

    #[test]
    fn test_write_report_json() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report.json");
        let mut counts = ErrorCounts::new();
        counts.insert(ErrorKind::EmptyRequired, 2);
        let results = vec![SheetResult {
            sheet: "TestScope".to_string(),
            counts: counts.clone(),
            data: SheetData::default(),
            ..SheetResult::default()
        }];

        write_report(&out, Path::new("in.xlsx"), &counts, &results, &RuleBook::default(), None)
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["total_errors"], 2);
        assert_eq!(json["counts"]["empty_required"], 2);
        assert_eq!(json["results"][0]["sheet"], "TestScope");
    }

    #[test]
    fn test_write_report_html() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("validation_report.html");
        write_report(
            &out,
            Path::new("in.xlsx"),
            &ErrorCounts::new(),
            &[],
            &RuleBook::default(),
            Some("body { margin: 0 }"),
        )
        .unwrap();
        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains("No validation errors found!"));
        assert!(html.contains("body { margin: 0 }"));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate(
            PathBuf::from("/no/such/upload.xlsx"),
            &ValidatorConfig::default(),
            RunOptions::default(),
            None,
            false,
        );
        assert!(matches!(result, Err(ValidatorError::Config(_))));
    }
}
