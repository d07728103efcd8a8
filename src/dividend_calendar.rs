//! The dividend sub-table: a bounded run of rows with its own column
//! alignment, read into a per-instrument monthly calendar.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::cell_value::{cell_at, compact_name, row_text, value_at};
use crate::row_rules::{InstrumentMarketRule, PageMode};
use crate::sheet_layout::SheetLayout;

pub const DIVIDEND_TOTAL_LABEL: &str = "股息總計";
pub const DEFAULT_MONTH_ONE_COLUMN: usize = 3;

const SECTION_MARKERS: [&str; 2] = ["股息", "通知書"];
const FALLBACK_SECTION_MARKER: &str = "現金股利";
const FALLBACK_BROKER_MARKERS: &[&str] = &["元大", "國泰"];

const NAME_COLUMNS: [usize; 3] = [4, 2, 1];
const SECTION_LABELS: &[&str] = &["股息", "現金股利", "股票股利"];
const PLACEHOLDER_NAMES: &[&str] = &[
    "(依通知書填入)",
    "標的備註",
    "(寫個大概就好)",
    "報酬金額",
    "報酬率",
    "標的",
];

fn starts_section(text: &str) -> bool {
    if SECTION_MARKERS.iter().all(|m| text.contains(m)) {
        return true;
    }
    text.contains(FALLBACK_SECTION_MARKER)
        && FALLBACK_BROKER_MARKERS.iter().any(|m| text.contains(m))
}

/// First non-empty positive cell to the right of the total label.
fn month_one_after_total_label(row: &[String]) -> Option<usize> {
    let label_idx = row
        .iter()
        .position(|cell| cell.contains(DIVIDEND_TOTAL_LABEL))?;
    (label_idx + 1..row.len()).find(|idx| !cell_at(row, *idx).is_empty() && value_at(row, *idx) > 0.0)
}

/// Rows buffered between a section start and its total row.
#[derive(Debug)]
pub struct DividendSection<'a> {
    pub rows: Vec<&'a Vec<String>>,
    pub detected_month_one: Option<usize>,
}

impl DividendSection<'_> {
    pub fn month_one_column(&self, layout: &SheetLayout) -> usize {
        self.detected_month_one
            .or_else(|| layout.months.first_column())
            .unwrap_or(DEFAULT_MONTH_ONE_COLUMN)
    }
}

pub fn scan_section(rows: &[Vec<String>]) -> DividendSection<'_> {
    let mut in_section = false;
    let mut buffered = Vec::new();
    let mut detected_month_one = None;

    for row in rows {
        let text = row_text(row);
        if !in_section && starts_section(&text) {
            in_section = true;
        }
        if !in_section {
            continue;
        }

        buffered.push(row);
        if text.contains(DIVIDEND_TOTAL_LABEL) {
            in_section = false;
            if let Some(col) = month_one_after_total_label(row) {
                detected_month_one = Some(col);
            }
        }
    }

    debug!(
        buffered = buffered.len(),
        ?detected_month_one,
        "dividend section scanned"
    );
    DividendSection {
        rows: buffered,
        detected_month_one,
    }
}

fn instrument_name(row: &[String]) -> Option<String> {
    let raw = NAME_COLUMNS
        .iter()
        .map(|idx| cell_at(row, *idx))
        .find(|cell| !cell.is_empty())?;
    let name = compact_name(raw);
    if name.is_empty()
        || SECTION_LABELS.contains(&name.as_str())
        || PLACEHOLDER_NAMES.iter().any(|p| name.contains(p))
    {
        return None;
    }
    Some(name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendSeries {
    pub name: String,
    pub monthly: [f64; 12],
}

impl DividendSeries {
    pub fn total(&self) -> f64 {
        self.monthly.iter().sum()
    }
}

/// Instrument name to twelve monthly amounts, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DividendMatrix {
    entries: Vec<DividendSeries>,
}

impl DividendMatrix {
    pub fn entries(&self) -> &[DividendSeries] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&[f64; 12]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.monthly)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all instruments per month.
    pub fn monthly_totals(&self) -> [f64; 12] {
        let mut totals = [0.0; 12];
        for entry in &self.entries {
            for (total, v) in totals.iter_mut().zip(entry.monthly.iter()) {
                *total += v;
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendCalendar {
    pub month_one_column: usize,
    pub matrix: DividendMatrix,
}

pub fn build_dividend_calendar(
    rows: &[Vec<String>],
    layout: &SheetLayout,
    page: PageMode,
    rule: &InstrumentMarketRule,
    exchange_rate: f64,
) -> DividendCalendar {
    let section = scan_section(rows);
    let month_one_column = section.month_one_column(layout);

    let mut entries: Vec<DividendSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in section.rows.iter().copied() {
        if row_text(row).contains(DIVIDEND_TOTAL_LABEL) {
            continue;
        }
        let Some(name) = instrument_name(row) else {
            continue;
        };
        let market = rule.infer(&name, row);
        if !page.includes(market) {
            continue;
        }

        let slot = *index.entry(name.clone()).or_insert_with(|| {
            entries.push(DividendSeries {
                name,
                monthly: [0.0; 12],
            });
            entries.len() - 1
        });
        for (month, amount) in entries[slot].monthly.iter_mut().enumerate() {
            let value = value_at(row, month_one_column + month);
            if value > 0.0 {
                *amount += page.to_reporting(value, market, exchange_rate);
            }
        }
    }

    entries.retain(|e| e.monthly.iter().any(|v| *v > 0.0));
    DividendCalendar {
        month_one_column,
        matrix: DividendMatrix { entries },
    }
}
