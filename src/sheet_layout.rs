use serde::Serialize;
use tracing::{debug, warn};

use crate::cell_value::cell_at;
use crate::error::LedgerError;

pub const HEADER_SEARCH_ROWS: usize = 20;
pub const ANNUAL_TOTAL_LABEL: &str = "年度總計";
pub const DEFAULT_ANNUAL_TOTAL_COLUMN: usize = 14;
const ANNUAL_TOTAL_SEARCH_ROWS: usize = 5;

pub const MONTH_LABELS: [&str; 12] = [
    "1月", "2月", "3月", "4月", "5月", "6月", "7月", "8月", "9月", "10月", "11月", "12月",
];

pub fn month_label(month: u32) -> String {
    format!("{month}月")
}

/// Month number to column position, in month order.
///
/// Months whose label is missing from the header are simply absent; there
/// are no placeholder slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthColumns {
    entries: Vec<(u32, usize)>,
}

impl MonthColumns {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Column of the slot at `slot` (slot order, not month number).
    pub fn column(&self, slot: usize) -> Option<usize> {
        self.entries.get(slot).map(|(_, col)| *col)
    }

    pub fn month(&self, slot: usize) -> Option<u32> {
        self.entries.get(slot).map(|(month, _)| *month)
    }

    pub fn columns(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.entries.iter().map(|(_, col)| *col)
    }

    pub fn first_column(&self) -> Option<usize> {
        self.column(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetLayout {
    pub header_row: usize,
    pub months: MonthColumns,
    pub annual_total_column: usize,
}

impl SheetLayout {
    pub fn locate(rows: &[Vec<String>]) -> Result<Self, LedgerError> {
        let header_row = locate_header(rows).ok_or_else(|| {
            warn!("header row with 1月 not found in first {HEADER_SEARCH_ROWS} rows");
            LedgerError::HeaderNotFound {
                searched: HEADER_SEARCH_ROWS.min(rows.len()),
            }
        })?;
        let months = locate_month_columns(&rows[header_row]);
        let annual_total_column = locate_annual_total_column(rows, header_row);
        debug!(
            header_row,
            month_count = months.len(),
            annual_total_column,
            "sheet layout located"
        );
        Ok(Self {
            header_row,
            months,
            annual_total_column,
        })
    }
}

pub fn locate_header(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .take(HEADER_SEARCH_ROWS)
        .position(|row| row.iter().any(|cell| cell.trim() == MONTH_LABELS[0]))
}

pub fn locate_month_columns(header_row: &[String]) -> MonthColumns {
    let entries = MONTH_LABELS
        .iter()
        .zip(1_u32..)
        .filter_map(|(label, month)| {
            header_row
                .iter()
                .position(|cell| cell.trim() == *label)
                .map(|col| (month, col))
        })
        .collect();
    MonthColumns { entries }
}

pub fn locate_annual_total_column(rows: &[Vec<String>], header_row: usize) -> usize {
    let find_in = |row: &[String]| {
        (0..row.len()).find(|idx| cell_at(row, *idx) == ANNUAL_TOTAL_LABEL)
    };

    if let Some(idx) = rows.get(header_row).and_then(|row| find_in(row.as_slice())) {
        return idx;
    }
    rows.iter()
        .take(ANNUAL_TOTAL_SEARCH_ROWS)
        .find_map(|row| find_in(row.as_slice()))
        .unwrap_or(DEFAULT_ANNUAL_TOTAL_COLUMN)
}
