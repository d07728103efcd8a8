use serde::Serialize;

use crate::asset_aggregation::first_positive_in_fallback_span;
use crate::cell_value::{cell_at, value_at};
use crate::row_rules::{InstrumentMarketRule, Market, PageMode};
use crate::sheet_layout::SheetLayout;

const TYPE_COLUMN: usize = 4;
const STOCK_TYPE: &str = "股票";
const TYPED_NAME_COLUMN: usize = 3;
const NAME_COLUMN: usize = 2;
const IDENTIFIER_COLUMN: usize = 1;

/// Summary labels that share the name column with instruments.
const EXCLUDED_NAME_KEYWORDS: &[&str] = &[
    "總現值",
    "總付出成本",
    "損益試算",
    "獲利率%",
    "標的備註",
    "總賣出金額",
    "總買進金額",
    "已實現損益",
    "未實現損益",
    "股息總計",
    "交易成本總計",
    "由高而低",
    "占比",
    "持股庫存",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub name: String,
    pub value: f64,
    pub market: Market,
}

impl Holding {
    /// Splits `"2330-台積電"` into `("2330", "台積電")`; names without a dash
    /// have an empty second part.
    pub fn display_parts(&self) -> (&str, &str) {
        let mut parts = self.name.split('-');
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();
        (first, second)
    }
}

fn holding_name(row: &[String]) -> Option<&str> {
    let typed_name = cell_at(row, TYPED_NAME_COLUMN);
    if cell_at(row, TYPE_COLUMN) == STOCK_TYPE && !typed_name.is_empty() {
        return Some(typed_name);
    }

    let name = cell_at(row, NAME_COLUMN);
    if cell_at(row, IDENTIFIER_COLUMN).is_empty()
        && name.chars().count() > 1
        && !EXCLUDED_NAME_KEYWORDS.iter().any(|k| name.contains(k))
    {
        return Some(name);
    }
    None
}

/// Latest positive month value, else the first positive cell of the
/// fallback span.
fn current_value(row: &[String], layout: &SheetLayout) -> f64 {
    layout
        .months
        .columns()
        .rev()
        .map(|col| value_at(row, col))
        .find(|v| *v > 0.0)
        .or_else(|| first_positive_in_fallback_span(row))
        .unwrap_or(0.0)
}

/// Instrument rows below the header of the page's market, largest first.
/// Equal values keep their sheet order.
pub fn rank_holdings(
    rows: &[Vec<String>],
    layout: &SheetLayout,
    page: PageMode,
    rule: &InstrumentMarketRule,
) -> Vec<Holding> {
    let mut holdings = rows
        .iter()
        .skip(layout.header_row + 1)
        .filter_map(|row| {
            let name = holding_name(row)?;
            let market = rule.infer(name, row);
            if !page.includes(market) {
                return None;
            }
            let value = current_value(row, layout);
            (value > 0.0).then(|| Holding {
                name: name.to_string(),
                value,
                market,
            })
        })
        .collect::<Vec<_>>();

    holdings.sort_by(|a, b| b.value.total_cmp(&a.value));
    holdings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_rules::LEDGER_INSTRUMENT_RULE;
    use crate::sheet_layout::MONTH_LABELS;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    /// Months at columns 5..=16; type in 4, typed name in 3.
    fn header() -> Vec<String> {
        let mut cells = row(&["", "", "", "", ""]);
        cells.extend(MONTH_LABELS.iter().map(|s| s.to_string()));
        cells
    }

    fn month_row(prefix: &[&str], last_month: usize, value: &str) -> Vec<String> {
        let mut cells = row(prefix);
        cells.resize(5 + 12, String::new());
        cells[5 + last_month] = value.to_string();
        cells
    }

    fn holdings_grid() -> Vec<Vec<String>> {
        vec![
            row(&["", "", "股票", "", "股票"]),
            header(),
            month_row(&["", "", "", "2330-台積電", "股票"], 11, "500,000"),
            month_row(&["", "", "", "0050-元大台灣50", "股票"], 6, "120,000"),
            month_row(&["", "", "總現值"], 11, "900,000"),
            month_row(&["", "", "0056元大高股息"], 11, "80,000"),
            month_row(&["", "X", "有代號的列"], 11, "70,000"),
            month_row(&["", "", "VOO"], 11, "12,000"),
            month_row(&["", "", "2881-富邦金", "", "股票"], 11, "0"),
            month_row(&["", "", "2412-中華電", "", ""], 3, "120,000"),
        ]
    }

    #[test]
    fn domestic_holdings_are_sorted_descending() {
        let rows = holdings_grid();
        let layout = SheetLayout::locate(&rows).expect("layout");
        let holdings = rank_holdings(&rows, &layout, PageMode::Domestic, &LEDGER_INSTRUMENT_RULE);

        let names = holdings.iter().map(|h| h.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["2330-台積電", "0050-元大台灣50", "2412-中華電", "0056元大高股息"]
        );
        assert_eq!(holdings[0].value, 500_000.0);
        assert_eq!(holdings[0].market, Market::Domestic);
        assert_eq!(holdings[0].display_parts(), ("2330", "台積電"));
    }

    #[test]
    fn foreign_holdings_only_keep_foreign_instruments() {
        let rows = holdings_grid();
        let layout = SheetLayout::locate(&rows).expect("layout");
        let holdings = rank_holdings(&rows, &layout, PageMode::Foreign, &LEDGER_INSTRUMENT_RULE);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].name, "VOO");
        assert_eq!(holdings[0].market, Market::Foreign);
        assert_eq!(holdings[0].display_parts(), ("VOO", ""));
    }

    #[test]
    fn value_falls_back_past_month_columns() {
        let rows = vec![header(), {
            let mut cells = row(&["", "", "零股帳戶"]);
            cells.resize(19, String::new());
            cells[18] = "3,000".to_string();
            cells
        }];
        let layout = SheetLayout::locate(&rows).expect("layout");
        let holdings = rank_holdings(&rows, &layout, PageMode::Domestic, &LEDGER_INSTRUMENT_RULE);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].value, 3_000.0);
    }
}
