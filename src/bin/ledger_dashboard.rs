//! Ledger sheet → dashboard JSON.
//!
//! ```bash
//! # exported sheet on disk
//! ledger_dashboard --input 2025.csv --page foreign --pretty
//!
//! # published CSV piped in
//! curl -sL "$(ledger_dashboard --year 2025 --raw)" | ledger_dashboard --page domestic
//! ```

use clap::{Parser, ValueEnum};
use ledger_dashboard_lib::{
    build_dashboard, parse_csv_text, read_grid_from_path, sheet_url_now, ExtractionSettings,
    Grid, LedgerError, PageMode,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ledger_dashboard")]
#[command(about = "投資紀錄表 → 儀表板 JSON", long_about = None)]
#[command(version)]
struct Cli {
    /// .csv or .xlsx export; CSV is read from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Dashboard page (domestic: 台股/TWD, foreign: 美股/USD)
    #[arg(short, long, value_enum, default_value_t = PageArg::Domestic)]
    page: PageArg,

    /// JSON settings file; missing fields keep their defaults
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Print the published sheet URL of this year instead of extracting
    #[arg(short, long)]
    year: Option<String>,

    /// With --year, print the bare URL instead of the JSON envelope
    #[arg(long, requires = "year")]
    raw: bool,

    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageArg {
    Domestic,
    Foreign,
}

impl From<PageArg> for PageMode {
    fn from(arg: PageArg) -> Self {
        match arg {
            PageArg::Domestic => PageMode::Domestic,
            PageArg::Foreign => PageMode::Foreign,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    category: String,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum Response {
    #[serde(rename = "success")]
    Success { payload: Value },
    #[serde(rename = "error")]
    Error { error: ErrorBody },
}

impl From<LedgerError> for Response {
    fn from(err: LedgerError) -> Self {
        Response::Error {
            error: ErrorBody {
                category: err.category().to_string(),
                message: err.to_string(),
            },
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<ExtractionSettings, LedgerError> {
    match path {
        Some(path) => ExtractionSettings::from_json_file(path),
        None => Ok(ExtractionSettings::default()),
    }
}

fn read_stdin_grid() -> Result<Grid, LedgerError> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| LedgerError::ReadFailed(format!("讀取 stdin 失敗: {e}")))?;
    if raw.trim().is_empty() {
        return Err(LedgerError::ReadFailed("stdin 沒有資料".to_string()));
    }
    parse_csv_text(&raw)
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, LedgerError> {
    serde_json::to_value(value)
        .map_err(|e| LedgerError::ReadFailed(format!("序列化結果失敗: {e}")))
}

fn dispatch(cli: &Cli, settings: &ExtractionSettings) -> Result<Value, LedgerError> {
    if let Some(year) = cli.year.as_deref() {
        let url = sheet_url_now(settings, year)?;
        return Ok(json!({ "year": year.trim(), "url": url }));
    }

    let rows = match cli.input.as_deref() {
        Some(path) => read_grid_from_path(path)?,
        None => read_stdin_grid()?,
    };
    debug!(rows = rows.len(), "grid loaded");

    let report = build_dashboard(&rows, cli.page.into(), settings)?;
    to_payload(&report)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match load_settings(cli.settings.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            error!(%err, "settings rejected");
            print_response(&Response::from(err), cli.pretty);
            std::process::exit(2);
        }
    };

    if cli.raw {
        match cli.year.as_deref().map(|year| sheet_url_now(&settings, year)) {
            Some(Ok(url)) => {
                println!("{url}");
                return;
            }
            Some(Err(err)) => {
                print_response(&Response::from(err), cli.pretty);
                std::process::exit(1);
            }
            None => {}
        }
    }

    let resp = match dispatch(&cli, &settings) {
        Ok(payload) => Response::Success { payload },
        Err(err) => {
            error!(%err, category = err.category(), "extraction failed");
            Response::from(err)
        }
    };
    let failed = matches!(resp, Response::Error { .. });
    print_response(&resp, cli.pretty);
    if failed {
        std::process::exit(1);
    }
}

fn print_response(resp: &Response, pretty: bool) {
    let out = if pretty {
        serde_json::to_string_pretty(resp)
    } else {
        serde_json::to_string(resp)
    }
    .unwrap_or_else(|e| {
        json!({
            "status": "error",
            "error": {
                "category": "READ_FAILED",
                "message": format!("序列化結果失敗: {e}"),
            }
        })
        .to_string()
    });

    println!("{out}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    fn create_temp_path(prefix: &str, ext: &str) -> PathBuf {
        let unique = format!("{prefix}_{}_{}.{}", std::process::id(), Uuid::new_v4(), ext);
        std::env::temp_dir().join(unique)
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ledger_dashboard").chain(args.iter().copied()))
            .expect("parse cli args")
    }

    #[test]
    fn dispatch_extracts_dashboard_from_csv_file() {
        let path = create_temp_path("ledger_dashboard_cli", "csv");
        fs::write(
            &path,
            ",,,1月,2月\n國泰券商(台股),,總現值,500,\"1,000\"\n美股,,總現值,20,30\n",
        )
        .expect("write temp csv");
        let input = path.to_string_lossy().to_string();
        let settings = ExtractionSettings::default();

        let payload = dispatch(&cli(&["--input", &input]), &settings).expect("domestic payload");
        assert_eq!(payload["reporting_currency"], "TWD");
        assert_eq!(payload["current_market_value"].as_f64(), Some(1_000.0));

        let payload = dispatch(&cli(&["--input", &input, "--page", "foreign"]), &settings)
            .expect("foreign payload");
        assert_eq!(payload["reporting_currency"], "USD");
        assert_eq!(payload["current_market_value"].as_f64(), Some(30.0));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn dispatch_resolves_year_url() {
        let settings = ExtractionSettings::default();
        let payload = dispatch(&cli(&["--year", "2024"]), &settings).expect("year payload");
        assert_eq!(payload["year"], "2024");
        let url = payload["url"].as_str().expect("url string");
        assert!(url.contains("&gid=893886517&t="));

        let err = dispatch(&cli(&["--year", "1999"]), &settings).expect_err("unknown year");
        assert!(matches!(err, LedgerError::UnknownYear(_)));
    }

    #[test]
    fn errors_use_the_status_envelope() {
        let path = create_temp_path("ledger_dashboard_cli_bad", "csv");
        fs::write(&path, "沒有表頭\n").expect("write temp csv");
        let input = path.to_string_lossy().to_string();

        let err = dispatch(&cli(&["--input", &input]), &ExtractionSettings::default())
            .expect_err("unrecognized sheet");
        let value = serde_json::to_value(Response::from(err)).expect("serialize response");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["category"], "UNRECOGNIZED_DATA");

        let _ = fs::remove_file(&path);
    }
}
