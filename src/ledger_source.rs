//! Turning a ledger export into the in-memory grid, and locating the
//! published sheet of a given year.

use calamine::{open_workbook_auto, Reader};
use std::path::Path;
use tracing::info;

use crate::cell_value::trim_cell;
use crate::error::LedgerError;
use crate::settings::ExtractionSettings;

pub type Grid = Vec<Vec<String>>;

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Grid, LedgerError> {
    let mut rows = Vec::new();
    for rec in reader.records() {
        let rec = rec.map_err(|e| LedgerError::ReadFailed(format!("讀取 CSV 行失敗: {e}")))?;
        rows.push(rec.iter().map(trim_cell).collect());
    }
    Ok(rows)
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Parses a full CSV payload, as returned by the published-sheet endpoint.
pub fn parse_csv_text(text: &str) -> Result<Grid, LedgerError> {
    read_csv(csv_builder().from_reader(text.as_bytes()))
}

pub fn read_csv_rows(path: &Path) -> Result<Grid, LedgerError> {
    let reader = csv_builder()
        .from_path(path)
        .map_err(|e| LedgerError::ReadFailed(format!("讀取 CSV 失敗: {e}")))?;
    read_csv(reader)
}

pub fn read_xlsx_rows(path: &Path) -> Result<Grid, LedgerError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| LedgerError::ReadFailed(format!("開啟 xlsx 失敗: {e}")))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first_sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| LedgerError::ReadFailed("xlsx 中找不到工作表".to_string()))?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| LedgerError::ReadFailed(format!("讀取 xlsx 工作表失敗: {e}")))?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| trim_cell(&cell.to_string()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    Ok(rows)
}

pub fn read_grid_from_path(path: &Path) -> Result<Grid, LedgerError> {
    if !path.is_file() {
        return Err(LedgerError::ReadFailed(format!(
            "找不到檔案: {}",
            path.to_string_lossy()
        )));
    }

    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match suffix.as_str() {
        "csv" => read_csv_rows(path),
        "xlsx" => read_xlsx_rows(path),
        _ => Err(LedgerError::UnsupportedFormat(suffix)),
    }
}

/// Published CSV URL of `year`; `cache_buster` defeats intermediate caches.
pub fn sheet_url(
    settings: &ExtractionSettings,
    year: &str,
    cache_buster: i64,
) -> Result<String, LedgerError> {
    let gid = settings.sheet_id(year)?;
    let url = format!("{}&gid={gid}&t={cache_buster}", settings.sheet_base_url);
    info!(year, gid, "sheet url resolved");
    Ok(url)
}

pub fn sheet_url_now(settings: &ExtractionSettings, year: &str) -> Result<String, LedgerError> {
    sheet_url(settings, year, chrono::Utc::now().timestamp_millis())
}
