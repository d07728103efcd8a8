//! Declarative keyword rules for summary rows and instrument rows.
//!
//! Every sweep over the grid (asset totals, cost rows, metric rows, dividend
//! lines, holdings) asks the same classifier instead of carrying its own
//! keyword scan.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::cell_value::{cell_at, row_text};

/// Summary labels are only looked for in the leading cells of a row.
pub const LABEL_SCAN_CELLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Domestic,
    Foreign,
}

/// Which market a dashboard page reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    Domestic,
    Foreign,
}

impl PageMode {
    pub fn market(self) -> Market {
        match self {
            PageMode::Domestic => Market::Domestic,
            PageMode::Foreign => Market::Foreign,
        }
    }

    pub fn includes(self, market: Market) -> bool {
        self.market() == market
    }

    pub fn reporting_currency(self) -> &'static str {
        match self {
            PageMode::Domestic => "TWD",
            PageMode::Foreign => "USD",
        }
    }

    /// Expresses an amount read from a `market` row in this page's currency.
    pub fn to_reporting(self, amount: f64, market: Market, exchange_rate: f64) -> f64 {
        match (self, market) {
            (PageMode::Domestic, Market::Foreign) => amount * exchange_rate,
            _ => amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCategory {
    AssetTotal,
    CostTotal,
    UnrealizedTotal,
    RealizedTotal,
    DividendTotal,
    FeeTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Exact,
    Contains,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: RowCategory,
    pub label: &'static str,
    pub matching: LabelMatch,
}

impl CategoryRule {
    fn matches_cell(&self, cell: &str) -> bool {
        match self.matching {
            LabelMatch::Exact => cell == self.label,
            LabelMatch::Contains => cell.contains(self.label),
        }
    }

    pub fn matches_row(&self, row: &[String]) -> bool {
        (0..LABEL_SCAN_CELLS).any(|idx| {
            let cell = cell_at(row, idx);
            !cell.is_empty() && self.matches_cell(cell)
        })
    }
}

pub const LEDGER_CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: RowCategory::AssetTotal,
        label: "總現值",
        matching: LabelMatch::Exact,
    },
    CategoryRule {
        category: RowCategory::CostTotal,
        label: "總付出成本",
        matching: LabelMatch::Contains,
    },
    CategoryRule {
        category: RowCategory::UnrealizedTotal,
        label: "未實現損益總計",
        matching: LabelMatch::Contains,
    },
    CategoryRule {
        category: RowCategory::RealizedTotal,
        label: "已實現損益總計",
        matching: LabelMatch::Contains,
    },
    CategoryRule {
        category: RowCategory::DividendTotal,
        label: "股息總計",
        matching: LabelMatch::Contains,
    },
    CategoryRule {
        category: RowCategory::FeeTotal,
        label: "交易成本總計",
        matching: LabelMatch::Contains,
    },
];

/// Market tagging of a whole summary row by keywords in its joined text.
#[derive(Debug, Clone, Copy)]
pub struct MarketRule {
    pub domestic_keywords: &'static [&'static str],
    pub foreign_keywords: &'static [&'static str],
    pub fallback: Market,
}

impl MarketRule {
    pub fn infer(&self, text: &str) -> Market {
        let domestic = self.domestic_keywords.iter().any(|k| text.contains(k));
        let foreign = self.foreign_keywords.iter().any(|k| text.contains(k));
        match (domestic, foreign) {
            (true, false) => Market::Domestic,
            (false, true) => Market::Foreign,
            _ => self.fallback,
        }
    }
}

pub const LEDGER_MARKET_RULE: MarketRule = MarketRule {
    domestic_keywords: &["台股"],
    foreign_keywords: &["美股"],
    fallback: Market::Domestic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowClass {
    pub category: Option<RowCategory>,
    pub market: Market,
}

#[derive(Debug, Clone, Copy)]
pub struct RowClassifier {
    pub categories: &'static [CategoryRule],
    pub market: MarketRule,
}

impl Default for RowClassifier {
    fn default() -> Self {
        Self {
            categories: LEDGER_CATEGORY_RULES,
            market: LEDGER_MARKET_RULE,
        }
    }
}

impl RowClassifier {
    /// First category (in rule order) whose label appears in the row.
    pub fn classify(&self, row: &[String]) -> RowClass {
        let category = self
            .categories
            .iter()
            .find(|rule| rule.matches_row(row))
            .map(|rule| rule.category);
        RowClass {
            category,
            market: self.market_of(row),
        }
    }

    /// A row may carry more than one label; this asks about one category
    /// without the first-match precedence of [`classify`](Self::classify).
    pub fn matches(&self, row: &[String], category: RowCategory) -> bool {
        self.categories
            .iter()
            .filter(|rule| rule.category == category)
            .any(|rule| rule.matches_row(row))
    }

    pub fn market_of(&self, row: &[String]) -> Market {
        self.market.infer(&row_text(row))
    }

    pub fn rows_in_category<'a>(
        &'a self,
        rows: &'a [Vec<String>],
        category: RowCategory,
    ) -> impl Iterator<Item = &'a Vec<String>> + 'a {
        rows.iter().filter(move |row| self.matches(row, category))
    }
}

/// Market inference for a single instrument (dividend line or holding).
#[derive(Debug, Clone, Copy)]
pub struct InstrumentMarketRule {
    pub foreign_keywords: &'static [&'static str],
    /// Treat names made only of upper-case Latin letters as foreign tickers.
    pub bare_ticker: bool,
    pub foreign_row_keyword: &'static str,
}

pub const FOREIGN_INSTRUMENT_KEYWORDS: &[&str] = &[
    "波克夏", "BRK", "VTI", "QQQ", "SPY", "VOO", "NVDA", "TSLA", "AAPL", "MSFT", "GOOG", "AMZN",
    "META", "AMD", "NFLX", "美股",
];

pub const LEDGER_INSTRUMENT_RULE: InstrumentMarketRule = InstrumentMarketRule {
    foreign_keywords: FOREIGN_INSTRUMENT_KEYWORDS,
    bare_ticker: true,
    foreign_row_keyword: "美股",
};

impl Default for InstrumentMarketRule {
    fn default() -> Self {
        LEDGER_INSTRUMENT_RULE
    }
}

fn bare_ticker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]+$").expect("ticker regex"))
}

/// `00` marks domestic fund codes that would otherwise pass the ticker test.
pub fn looks_like_bare_ticker(name: &str) -> bool {
    bare_ticker_re().is_match(name) && !name.contains("00")
}

impl InstrumentMarketRule {
    pub fn infer(&self, name: &str, row: &[String]) -> Market {
        let upper = name.to_uppercase();
        if self.foreign_keywords.iter().any(|k| upper.contains(k)) {
            return Market::Foreign;
        }
        if self.bare_ticker && looks_like_bare_ticker(name) {
            return Market::Foreign;
        }
        if !self.foreign_row_keyword.is_empty() && row_text(row).contains(self.foreign_row_keyword)
        {
            return Market::Foreign;
        }
        Market::Domestic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classify_reads_label_from_leading_cells_only() {
        let classifier = RowClassifier::default();

        let asset = row(&["", "國泰券商(台股)", "總現值", "", "", "100"]);
        let class = classifier.classify(&asset);
        assert_eq!(class.category, Some(RowCategory::AssetTotal));
        assert_eq!(class.market, Market::Domestic);

        let late_label = row(&["", "", "", "", "", "總現值"]);
        assert_eq!(classifier.classify(&late_label).category, None);

        // asset total is an exact label, not a substring
        let asset_like = row(&["總現值占比"]);
        assert!(!classifier.matches(&asset_like, RowCategory::AssetTotal));

        let cost = row(&["", "國泰美股券商(美股)", "總付出成本(含息)"]);
        let class = classifier.classify(&cost);
        assert_eq!(class.category, Some(RowCategory::CostTotal));
        assert_eq!(class.market, Market::Foreign);
    }

    #[test]
    fn market_defaults_to_domestic_when_ambiguous() {
        let rule = LEDGER_MARKET_RULE;
        assert_eq!(rule.infer("總現值"), Market::Domestic);
        assert_eq!(rule.infer("台股總現值"), Market::Domestic);
        assert_eq!(rule.infer("美股總現值"), Market::Foreign);
        assert_eq!(rule.infer("台股+美股總現值"), Market::Domestic);
    }

    #[test]
    fn instrument_rule_detects_foreign_names() {
        let rule = InstrumentMarketRule::default();
        let empty = row(&[]);
        assert_eq!(rule.infer("VT", &empty), Market::Foreign);
        assert_eq!(rule.infer("brk.b", &empty), Market::Foreign);
        assert_eq!(rule.infer("波克夏", &empty), Market::Foreign);
        assert_eq!(rule.infer("2330-台積電", &empty), Market::Domestic);
        assert_eq!(rule.infer("0056", &empty), Market::Domestic);
        assert_eq!(rule.infer("ABC00", &empty), Market::Domestic);
        assert_eq!(
            rule.infer("元大高股息", &row(&["美股", "元大高股息"])),
            Market::Foreign
        );
    }

    #[test]
    fn page_mode_converts_only_foreign_amounts_for_domestic_page() {
        assert_eq!(PageMode::Domestic.to_reporting(10.0, Market::Foreign, 32.5), 325.0);
        assert_eq!(PageMode::Domestic.to_reporting(10.0, Market::Domestic, 32.5), 10.0);
        assert_eq!(PageMode::Foreign.to_reporting(10.0, Market::Foreign, 32.5), 10.0);
        assert!(PageMode::Foreign.includes(Market::Foreign));
        assert!(!PageMode::Foreign.includes(Market::Domestic));
    }
}
