use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::LedgerError;

pub const DEFAULT_EXCHANGE_RATE: f64 = 32.5;
pub const DEFAULT_SHEET_BASE_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vSL_mRAf-5YAR9vnzSkhOYhhY1eXsq-E-QAoHi1Gapdektd0gdAjJnAoG_6pIa5HA/pub?output=csv";

fn default_sheet_ids() -> BTreeMap<String, String> {
    [
        ("2026", "1909984551"),
        ("2025", "2051125391"),
        ("2024", "893886517"),
    ]
    .into_iter()
    .map(|(year, gid)| (year.to_string(), gid.to_string()))
    .collect()
}

/// Knobs of one extraction run. Missing JSON fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// TWD per USD, applied wherever a foreign amount lands on the domestic page.
    pub exchange_rate: f64,
    pub sheet_base_url: String,
    /// Year to published-sheet gid.
    pub sheet_ids: BTreeMap<String, String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            exchange_rate: DEFAULT_EXCHANGE_RATE,
            sheet_base_url: DEFAULT_SHEET_BASE_URL.to_string(),
            sheet_ids: default_sheet_ids(),
        }
    }
}

impl ExtractionSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, LedgerError> {
        let settings: Self = serde_json::from_str(raw)
            .map_err(|e| LedgerError::InvalidSettings(format!("JSON 解析失敗: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LedgerError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            LedgerError::InvalidSettings(format!("讀取 {} 失敗: {e}", path.to_string_lossy()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if !self.exchange_rate.is_finite() || self.exchange_rate <= 0.0 {
            return Err(LedgerError::InvalidSettings(format!(
                "exchange_rate 必須為正數: {}",
                self.exchange_rate
            )));
        }
        if self.sheet_base_url.trim().is_empty() {
            return Err(LedgerError::InvalidSettings(
                "sheet_base_url 不能為空".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sheet_id(&self, year: &str) -> Result<&str, LedgerError> {
        self.sheet_ids
            .get(year.trim())
            .map(String::as_str)
            .ok_or_else(|| LedgerError::UnknownYear(year.trim().to_string()))
    }

    /// Years with a configured sheet, newest first.
    pub fn years(&self) -> Vec<&str> {
        self.sheet_ids.keys().rev().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings =
            ExtractionSettings::from_json_str(r#"{"exchange_rate": 31.2}"#).expect("parse");
        assert_eq!(settings.exchange_rate, 31.2);
        assert_eq!(settings.sheet_base_url, DEFAULT_SHEET_BASE_URL);
        assert_eq!(settings.sheet_id("2025").expect("2025 gid"), "2051125391");
        assert_eq!(settings.years(), vec!["2026", "2025", "2024"]);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = ExtractionSettings::from_json_str(r#"{"exchange_rate": 0}"#)
            .expect_err("zero rate");
        assert!(matches!(err, LedgerError::InvalidSettings(_)));

        let err = ExtractionSettings::from_json_str("not json").expect_err("bad json");
        assert!(matches!(err, LedgerError::InvalidSettings(_)));

        let err = ExtractionSettings::default()
            .sheet_id("1999")
            .expect_err("unknown year");
        assert!(matches!(err, LedgerError::UnknownYear(ref y) if y == "1999"));
    }
}
