use clap::{Parser, Subcommand};
use mycarbon_validator::cli::{self, RunOptions};
use mycarbon_validator::config::ValidatorConfig;
use mycarbon_validator::error::ValidatorResult;
use mycarbon_validator::logging::init_tracing;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mycarbon-validate")]
#[command(about = "Validate MyCarbon Excel workbooks against the reference rules workbook")]
#[command(long_about = "MyCarbon Excel Validator

Checks an uploaded .xlsx workbook against the validation rules kept in the
read-only reference workbook <client data>/Validations/validations.xlsx.

COMMANDS:
  validate  - Validate one scope (sheet/table) or every sheet in the plan
  scopes    - List the scopes the rules cover
  watch     - Re-validate whenever the workbook is saved
  serve     - Start the upload web form

EXAMPLES:
  mycarbon-validate validate upload.xlsx
  mycarbon-validate validate upload.xlsx --scope \"Scope 1\" --table Scope1Calcs
  mycarbon-validate validate upload.xlsx --all -o validation_report.html
  mycarbon-validate serve --port 3000")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true, env = "MYCARBON_CONFIG")]
    config: Option<PathBuf>,

    /// Client data folder holding Validations/validations.xlsx
    #[arg(long, global = true, env = "MYCARBON_CLIENT_DATA")]
    client_data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Validate a workbook.

Loads the scope (sheet) from the workbook, narrowed to a named Excel table when
one is given or listed for the scope in the rules, keeps only the columns the
rules name, and checks every cell:

  missing_column   - a rule column is absent
  empty_required   - required cell is blank
  blank_indicator  - placeholder such as N/A, #N/A, NULL (unless broken refs allowed)
  invalid_year     - not a year between 1900 and 2100
  invalid_integer  - not an integer
  invalid_float    - not a number
  invalid_boolean  - not a yes/no/true/false/1/0 value

With --all every (Sheet, TableName) pair in the rules is validated; missing
sheets and tables are reported and the run continues.

REPORTS:
  -o report.html   Styled HTML report (validation_report.html)
  -o report.xlsx   Annotated workbook with failing cells coloured
  -o report.json   Machine-readable findings

Exits non-zero when any error is found.")]
    /// Validate a workbook against the rules
    Validate {
        /// Path to the Excel workbook (.xlsx)
        file: PathBuf,

        /// Scope (sheet name) to validate
        #[arg(short, long)]
        scope: Option<String>,

        /// Excel table name within the scope
        #[arg(short, long)]
        table: Option<String>,

        /// Validate every sheet/table in the rules plan
        #[arg(short, long, conflicts_with_all = ["scope", "table"])]
        all: bool,

        /// Report file (.html, .xlsx or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the scopes (sheet names) covered by the rules
    Scopes,

    #[command(long_about = "Watch a workbook and re-validate on every save.

Press Ctrl+C to stop watching.")]
    /// Re-validate a workbook whenever it changes
    Watch {
        /// Path to the Excel workbook (.xlsx)
        file: PathBuf,

        /// Scope (sheet name) to validate
        #[arg(short, long)]
        scope: Option<String>,

        /// Excel table name within the scope
        #[arg(short, long)]
        table: Option<String>,

        /// Validate every sheet/table in the rules plan
        #[arg(short, long, conflicts_with_all = ["scope", "table"])]
        all: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Start the upload web form and JSON API
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, env = "MYCARBON_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "MYCARBON_PORT")]
        port: Option<u16>,
    },
}

fn main() -> ValidatorResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { .. } => init_tracing("mycarbon_validator=info,tower_http=info"),
        _ => init_tracing("mycarbon_validator=warn"),
    }

    let mut config = ValidatorConfig::load(cli.config.as_deref())?;
    if let Some(client_data) = cli.client_data {
        config.client_data_path = client_data;
    }

    match cli.command {
        Commands::Validate {
            file,
            scope,
            table,
            all,
            output,
            verbose,
        } => cli::validate(file, &config, RunOptions { scope, table, all }, output, verbose),

        Commands::Scopes => cli::scopes(&config),

        Commands::Watch {
            file,
            scope,
            table,
            all,
            verbose,
        } => cli::watch(file, &config, RunOptions { scope, table, all }, verbose),

        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cli::serve(config)
        }
    }
}
