//! API request handlers
//!
//! The browser form (`/`, `POST /validate`) and the JSON endpoints.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::server::AppState;
use crate::core::{default_scope_index, run_selection, scope_options, Selection};
use crate::error::{ValidatorError, ValidatorResult};
use crate::excel::{AnnotatedExporter, Workbook};
use crate::report::{escape_html, render_results_page, REPORT_FILE_NAME};
use crate::types::{ErrorCounts, RuleBook, SheetResult};

const APP_TITLE: &str = "The Big Bad MyCarbon Excel Validator";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Status code for a failed run
fn error_status(err: &ValidatorError) -> StatusCode {
    match err {
        ValidatorError::SheetNotFound { .. }
        | ValidatorError::TableNotFound { .. }
        | ValidatorError::Io(_)
        | ValidatorError::Excel(_)
        | ValidatorError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ValidatorError::AccessDenied { .. } => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run a selection on a blocking thread
async fn run_blocking(
    rules: Arc<RuleBook>,
    open: impl FnOnce() -> ValidatorResult<Workbook> + Send + 'static,
    selection: Selection,
) -> ValidatorResult<(ErrorCounts, Vec<SheetResult>)> {
    tokio::task::spawn_blocking(move || {
        let mut workbook = open()?;
        run_selection(&mut workbook, &rules, &selection, None)
    })
    .await
    .map_err(|e| ValidatorError::Server(format!("Validation task failed: {}", e)))?
}

//==============================================================================
// Health / version
//==============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub rules_loaded: usize,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        rules_loaded: state.rules.rules.len(),
    }))
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub default_scope: String,
    pub default_table: String,
}

/// GET /version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        default_scope: state.config.default_scope.clone(),
        default_table: state.config.default_table.clone(),
    }))
}

//==============================================================================
// JSON API
//==============================================================================

#[derive(Serialize)]
pub struct ScopesResponse {
    pub scopes: Vec<String>,
    pub default_scope: String,
    pub default_index: usize,
}

/// GET /api/v1/scopes
pub async fn scopes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scopes = scope_options(&state.rules);
    let default_index = default_scope_index(&scopes, &state.config.default_scope);
    Json(ApiResponse::ok(ScopesResponse {
        scopes,
        default_scope: state.config.default_scope.clone(),
        default_index,
    }))
}

/// Validate request for a workbook already on the server's filesystem
#[derive(Deserialize)]
pub struct ValidateRequest {
    pub file_path: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub file_path: String,
    pub total_errors: usize,
    pub counts: ErrorCounts,
    pub results: Vec<SheetResult>,
}

/// POST /api/v1/validate
pub async fn validate_path(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> Response {
    let selection = Selection::resolve(
        &state.rules,
        req.scope.as_deref(),
        req.table.as_deref(),
        req.all,
        &state.config.default_scope,
        &state.config.default_table,
    );
    let server = state.config.server.clone();
    let requested = req.file_path.clone();
    let open = move || Workbook::open(server.resolve_file(&requested)?);

    match run_blocking(state.rules.clone(), open, selection).await {
        Ok((counts, results)) => {
            let total_errors = counts.values().sum();
            Json(ApiResponse::ok(ValidateResponse {
                valid: total_errors == 0,
                file_path: req.file_path,
                total_errors,
                counts,
                results,
            }))
            .into_response()
        }
        Err(e) => (
            error_status(&e),
            Json(ApiResponse::<ValidateResponse>::err(e.to_string())),
        )
            .into_response(),
    }
}

//==============================================================================
// Browser form
//==============================================================================

/// GET / - upload form
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_upload_form(&state))
}

/// GET /logo.png
pub async fn logo(State(state): State<Arc<AppState>>) -> Response {
    match &state.logo {
        Some(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Deserialize, Default)]
pub struct ReportQuery {
    #[serde(default)]
    pub download: Option<String>,
}

impl ReportQuery {
    /// `?download=1` / `?download=true` asks for an attachment
    pub fn wants_download(&self) -> bool {
        matches!(
            self.download.as_deref().map(str::trim),
            Some("1" | "true" | "yes" | "on")
        )
    }
}

/// Fields posted by the upload form
#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    scope: Option<String>,
    table: Option<String>,
    all: bool,
    format: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, String> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                if !bytes.is_empty() {
                    form.file = Some(bytes.to_vec());
                }
            }
            other => {
                let value = field.text().await.map_err(|e| e.to_string())?;
                let value = value.trim().to_string();
                match other {
                    "scope" if !value.is_empty() => form.scope = Some(value),
                    // an empty table box means "read the whole sheet"
                    "table" => form.table = Some(value),
                    "all" => form.all = matches!(value.as_str(), "on" | "true" | "1"),
                    "format" if !value.is_empty() => form.format = Some(value),
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

/// POST /validate - validate an uploaded workbook and return the report
pub async fn validate_upload(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
    multipart: Multipart,
) -> Response {
    let form = match read_upload(multipart).await {
        Ok(form) => form,
        Err(e) => return error_page(&state, StatusCode::BAD_REQUEST, &format!("Invalid upload: {}", e)),
    };
    let Some(bytes) = form.file else {
        return error_page(
            &state,
            StatusCode::BAD_REQUEST,
            "Upload an Excel file to begin.",
        );
    };

    let selection = Selection::resolve(
        &state.rules,
        form.scope.as_deref(),
        form.table.as_deref(),
        form.all,
        &state.config.default_scope,
        &state.config.default_table,
    );

    let (counts, results) =
        match run_blocking(state.rules.clone(), move || Workbook::from_bytes(bytes), selection).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return error_page(
                    &state,
                    error_status(&e),
                    &format!("Failed to read Excel: {}", e),
                )
            }
        };

    tracing::info!(
        "Validated upload: {} sheet(s), {} error(s)",
        results.len(),
        counts.values().sum::<usize>()
    );

    if form.format.as_deref() == Some("xlsx") {
        return match AnnotatedExporter::new(&results, &counts, &state.rules).to_bytes() {
            Ok(bytes) => (
                [
                    (header::CONTENT_TYPE, XLSX_MIME.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"validation_report.xlsx\"".to_string(),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Err(e) => error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        };
    }

    let page = render_results_page(
        "Validation Report",
        &counts,
        &results,
        &state.rules,
        state.stylesheet.as_deref(),
    );

    if query.wants_download() {
        (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
                ),
            ],
            page,
        )
            .into_response()
    } else {
        Html(page).into_response()
    }
}

fn error_page(state: &AppState, status: StatusCode, message: &str) -> Response {
    let css = state
        .stylesheet
        .as_deref()
        .map(|c| format!("<style>{}</style>", c))
        .unwrap_or_default();
    let body = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title>{css}</head>\n\
         <body>\n<h1>{title}</h1>\n<p class=\"error\">{message}</p>\n<p><a href=\"/\">Back</a></p>\n</body>\n</html>\n",
        title = APP_TITLE,
        message = escape_html(message),
    );
    (status, Html(body)).into_response()
}

/// Upload page: scope picker (or free text when the rules name no sheets) and table name
pub fn render_upload_form(state: &AppState) -> String {
    let options = scope_options(&state.rules);
    let scope_input = if options.is_empty() {
        format!(
            "<input type=\"text\" id=\"scope\" name=\"scope\" value=\"{}\">",
            escape_html(&state.config.default_scope)
        )
    } else {
        let selected = default_scope_index(&options, &state.config.default_scope);
        let items: String = options
            .iter()
            .enumerate()
            .map(|(idx, scope)| {
                let attr = if idx == selected { " selected" } else { "" };
                format!(
                    "<option value=\"{0}\"{1}>{0}</option>",
                    escape_html(scope),
                    attr
                )
            })
            .collect();
        format!("<select id=\"scope\" name=\"scope\">{}</select>", items)
    };

    let logo = if state.logo.is_some() {
        "<img class=\"logo\" src=\"/logo.png\" alt=\"logo\">\n"
    } else {
        ""
    };
    let css = state
        .stylesheet
        .as_deref()
        .map(|c| format!("<style>{}</style>\n", c))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
{css}</head>
<body>
<aside class="sidebar">
{logo}<h2>Options</h2>
</aside>
<main>
<h1>{title}</h1>
<p class="caption">Version {version}</p>
<form action="/validate" method="post" enctype="multipart/form-data">
<fieldset>
<legend>1) Upload Excel file</legend>
<label for="file">Select an Excel file (.xlsx)</label>
<input type="file" id="file" name="file" accept=".xlsx" required>
</fieldset>
<fieldset>
<legend>2) Options</legend>
<label for="scope">Scope (sheet name)</label>
{scope_input}
<label for="table">Excel table name</label>
<input type="text" id="table" name="table" value="{table}">
<label><input type="checkbox" name="all" value="on"> Validate every sheet in the plan</label>
<label for="format">Report</label>
<select id="format" name="format"><option value="html" selected>HTML</option><option value="xlsx">Annotated workbook</option></select>
</fieldset>
<fieldset>
<legend>3) Run Validation</legend>
<button type="submit">Run Validation</button>
</fieldset>
</form>
</main>
</body>
</html>
"#,
        title = APP_TITLE,
        version = escape_html(&state.version),
        table = escape_html(&state.config.default_table),
    )
}
