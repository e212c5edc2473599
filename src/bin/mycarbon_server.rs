//! MyCarbon validator server binary
//!
//! Serves the upload form and the JSON validation API.

use clap::Parser;
use mycarbon_validator::api::run_api_server;
use mycarbon_validator::config::ValidatorConfig;
use mycarbon_validator::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mycarbon-server")]
#[command(version)]
#[command(about = "MyCarbon validator server - upload form and JSON API")]
#[command(long_about = r#"
MyCarbon validator server

Browser form:
  - GET  /                 - Upload form (scope, table, file)
  - POST /validate         - Validate an upload, returns the HTML report
                             (?download=true returns validation_report.html)

JSON API:
  - GET  /api/v1/scopes    - Scopes covered by the rules
  - POST /api/v1/validate  - Validate a workbook below the file root
                             (server.file_root, --file-root)

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info

Example usage:
  mycarbon-server                           # Start on localhost:8080
  mycarbon-server --host 0.0.0.0 --port 3000

  curl -X POST http://localhost:8080/api/v1/validate \
    -H "Content-Type: application/json" \
    -d '{"file_path": "upload.xlsx", "scope": "TestScope"}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, env = "MYCARBON_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MYCARBON_PORT")]
    port: Option<u16>,

    /// YAML config file
    #[arg(short, long, env = "MYCARBON_CONFIG")]
    config: Option<PathBuf>,

    /// Client data folder holding Validations/validations.xlsx
    #[arg(long, env = "MYCARBON_CLIENT_DATA")]
    client_data: Option<PathBuf>,

    /// Directory the JSON API may read workbooks from
    #[arg(long, env = "MYCARBON_FILE_ROOT")]
    file_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("mycarbon_validator=info,tower_http=info");

    let mut config = ValidatorConfig::load(args.config.as_deref())?;
    if let Some(client_data) = args.client_data {
        config.client_data_path = client_data;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(file_root) = args.file_root {
        config.server.file_root = file_root;
    }

    run_api_server(config).await
}
