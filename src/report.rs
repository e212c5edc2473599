//! HTML rendering of validation results

use crate::types::{ErrorCells, ErrorCounts, ErrorKind, RuleBook, SheetData, SheetResult};
use std::fmt::Write;

pub const REPORT_FILE_NAME: &str = "validation_report.html";

/// Inline style for a failing cell; `None` for kinds not drawn at cell level
pub fn cell_style(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::EmptyRequired => {
            Some("background-color: #ff6b6b; color: white; font-weight: bold")
        }
        ErrorKind::BlankIndicator => {
            Some("background-color: #ff8787; color: white; font-weight: bold")
        }
        k if k.is_type_error() => {
            Some("background-color: #ffa8a8; color: black; font-weight: bold")
        }
        _ => None,
    }
}

/// Minimal HTML escaping for text and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the validated data as an HTML table with failing cells highlighted
pub fn style_errors_as_html(data: &SheetData, cells: &ErrorCells) -> String {
    let mut html = String::new();
    html.push_str("<table class=\"validation-table\">\n");
    let _ = writeln!(
        html,
        "<caption>Validation Results - {} error cells found</caption>",
        cells.len()
    );

    html.push_str("<thead>\n<tr><th class=\"blank\"></th>");
    for column in &data.columns {
        let _ = write!(html, "<th class=\"col_heading\">{}</th>", escape_html(column));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for (row_idx, row) in data.rows.iter().enumerate() {
        let _ = write!(html, "<tr><th class=\"row_heading\">{}</th>", row_idx);
        for (col_idx, column) in data.columns.iter().enumerate() {
            let value = row.get(col_idx).map(|v| v.to_string()).unwrap_or_default();
            match cells.get(row_idx, column).and_then(|kind| cell_style(kind).map(|s| (kind, s))) {
                Some((kind, style)) => {
                    let _ = write!(
                        html,
                        "<td class=\"error {}\" style=\"{}\" title=\"{}\">{}</td>",
                        kind,
                        style,
                        kind.label(),
                        escape_html(&value)
                    );
                }
                None => {
                    let _ = write!(html, "<td>{}</td>", escape_html(&value));
                }
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// One summary line per error kind, using the reference workbook's message when it has one
pub fn summary_lines(counts: &ErrorCounts, rules: &RuleBook) -> Vec<String> {
    counts
        .iter()
        .map(|(kind, count)| match rules.message_for(*kind) {
            Some(message) => format!("{}: {} error(s) found", message, count),
            None => format!("{} {} error(s) found", count, kind.label()),
        })
        .collect()
}

/// Summary block: a list of findings, or a success line when there are none
pub fn build_summary_html(counts: &ErrorCounts, rules: &RuleBook) -> String {
    if counts.is_empty() {
        return "<p>No validation errors found!</p>".to_string();
    }
    let items: String = summary_lines(counts, rules)
        .iter()
        .map(|line| format!("<li>{}</li>", escape_html(line)))
        .collect();
    format!("<ul>{}</ul>", items)
}

/// Standalone report page with the stylesheet inlined when provided
pub fn build_report_page(title: &str, summary_html: &str, body_html: &str, css: Option<&str>) -> String {
    let style = css
        .map(|c| format!("<style>{}</style>\n", c))
        .unwrap_or_default();
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{style}</head>\n<body>\n\
         <h1>{title}</h1>\n<p class=\"generated\">Generated {generated}</p>\n\
         <h2>Summary</h2>\n{summary_html}\n\
         <h2>Validation Results</h2>\n<div class=\"validation-report\">\n{body_html}</div>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// Full report page for a set of sheet results
pub fn render_results_page(
    title: &str,
    overall: &ErrorCounts,
    results: &[SheetResult],
    rules: &RuleBook,
    css: Option<&str>,
) -> String {
    let mut body = String::new();
    for result in results {
        let heading = match &result.table_name {
            Some(table) => format!("{} ({})", result.sheet, table),
            None => result.sheet.clone(),
        };
        let _ = writeln!(body, "<h3>{}</h3>", escape_html(&heading));

        if let Some(error) = &result.error {
            let _ = writeln!(body, "<p class=\"load-error\">{}</p>", escape_html(error));
            continue;
        }
        if !result.missing_required.is_empty() {
            let _ = writeln!(
                body,
                "<p class=\"missing-columns\">Missing columns: {}</p>",
                escape_html(&result.missing_required.join(", "))
            );
        }
        body.push_str(&result.html);
    }

    build_report_page(title, &build_summary_html(overall, rules), &body, css)
}
