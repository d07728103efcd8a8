use thiserror::Error;

/// Failures that can cross the extraction boundary.
///
/// `HeaderNotFound` and `NoAssetRows` both mean the sheet does not follow the
/// ledger layout and surface as the "數據無法識別" state; `ReadFailed` is the
/// "讀取失敗" state. Everything else inside the engine degrades to zero.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("數據無法識別：前 {searched} 列找不到「1月」表頭")]
    HeaderNotFound { searched: usize },

    #[error("數據無法識別：找不到「總現值」資料列")]
    NoAssetRows,

    #[error("讀取失敗: {0}")]
    ReadFailed(String),

    #[error("不支援的檔案格式: .{0}（僅支援 .csv/.xlsx）")]
    UnsupportedFormat(String),

    #[error("未設定 {0} 年度的工作表")]
    UnknownYear(String),

    #[error("設定無效: {0}")]
    InvalidSettings(String),
}

impl LedgerError {
    /// True for the layout failures the dashboard shows as unrecognized data.
    pub fn is_unrecognized(&self) -> bool {
        matches!(
            self,
            LedgerError::HeaderNotFound { .. } | LedgerError::NoAssetRows
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            LedgerError::HeaderNotFound { .. } | LedgerError::NoAssetRows => "UNRECOGNIZED_DATA",
            LedgerError::ReadFailed(_) => "READ_FAILED",
            LedgerError::UnsupportedFormat(_)
            | LedgerError::UnknownYear(_)
            | LedgerError::InvalidSettings(_) => "VALIDATION_ERROR",
        }
    }
}
