use serde::Serialize;
use tracing::{debug, warn};

use crate::cell_value::{cell_at, value_at};
use crate::row_rules::{Market, PageMode, RowCategory, RowClassifier};
use crate::sheet_layout::{month_label, SheetLayout};

/// Columns probed when a row has nothing under the month headers.
pub const FALLBACK_SCAN_START: usize = 4;
pub const FALLBACK_SCAN_END: usize = 20;

pub(crate) fn first_positive_in_fallback_span(row: &[String]) -> Option<f64> {
    let end = row.len().min(FALLBACK_SCAN_END + 1);
    (FALLBACK_SCAN_START..end)
        .map(|idx| value_at(row, idx))
        .find(|v| *v > 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPoint {
    pub month: u32,
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Gain,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub percent: f64,
    pub direction: TrendDirection,
}

/// Monthly asset totals of one page, one slot per located month column.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSeries {
    slots: Vec<(u32, f64)>,
}

impl AssetSeries {
    pub fn slot_values(&self) -> Vec<f64> {
        self.slots.iter().map(|(_, v)| *v).collect()
    }

    pub fn points(&self) -> Vec<AssetPoint> {
        self.slots
            .iter()
            .filter(|(_, v)| *v > 0.0)
            .map(|(month, value)| AssetPoint {
                month: *month,
                label: month_label(*month),
                value: *value,
            })
            .collect()
    }

    pub fn has_data(&self) -> bool {
        self.slots.iter().any(|(_, v)| *v > 0.0)
    }

    pub fn last_active_slot(&self) -> Option<usize> {
        self.slots.iter().rposition(|(_, v)| *v > 0.0)
    }

    /// Last non-zero monthly total, the page's current market value.
    pub fn current_value(&self) -> f64 {
        self.last_active_slot()
            .map(|slot| self.slots[slot].1)
            .unwrap_or(0.0)
    }

    pub fn trend(&self) -> Option<Trend> {
        let mut active = self.slots.iter().map(|(_, v)| *v).filter(|v| *v > 0.0).rev();
        let current = active.next()?;
        let previous = active.next()?;
        let percent = (current - previous) / previous * 100.0;
        let direction = if percent >= 0.0 {
            TrendDirection::Gain
        } else {
            TrendDirection::Loss
        };
        Some(Trend { percent, direction })
    }
}

pub fn aggregate_assets(
    rows: &[Vec<String>],
    layout: &SheetLayout,
    page: PageMode,
    classifier: &RowClassifier,
) -> AssetSeries {
    let mut slots: Vec<(u32, f64)> = (0..layout.months.len())
        .filter_map(|slot| layout.months.month(slot).map(|m| (m, 0.0)))
        .collect();

    for row in classifier.rows_in_category(rows, RowCategory::AssetTotal) {
        let market = classifier.market_of(row);
        if !page.includes(market) {
            continue;
        }

        let mut row_has_month_data = false;
        for (slot, col) in layout.months.columns().enumerate() {
            let value = value_at(row, col);
            if value > 0.0 {
                slots[slot].1 += value;
                row_has_month_data = true;
            }
        }

        // Year-end-only rows land on the last month slot.
        if !row_has_month_data {
            if let (Some(value), Some(last)) =
                (first_positive_in_fallback_span(row), slots.last_mut())
            {
                last.1 += value;
            }
        }
    }

    AssetSeries { slots }
}

/// Where a metric amount came from, currency-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "market", rename_all = "snake_case")]
pub enum CurrencyTag {
    /// Read as-is from a row kept in that market's currency.
    Native(Market),
    /// Derived or converted into the page's reporting currency.
    Reporting,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricTotal {
    pub amount: f64,
    pub currency: CurrencyTag,
}

impl MetricTotal {
    pub fn reporting(amount: f64) -> Self {
        Self {
            amount,
            currency: CurrencyTag::Reporting,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub unrealized: MetricTotal,
    pub realized: MetricTotal,
    pub dividends: MetricTotal,
    pub fees: MetricTotal,
    pub total_profit: MetricTotal,
    pub total_cost: MetricTotal,
    pub net_profit: MetricTotal,
}

pub fn net_profit(current_market_value: f64, dividends: f64, total_cost: f64, fees: f64) -> f64 {
    current_market_value + dividends - total_cost - fees
}

/// Everything a metric lookup needs from the current extraction pass.
pub struct MetricScope<'a> {
    pub rows: &'a [Vec<String>],
    pub layout: &'a SheetLayout,
    pub series: &'a AssetSeries,
    pub page: PageMode,
    pub classifier: &'a RowClassifier,
}

impl<'a> MetricScope<'a> {
    /// Annual-total column, then the latest month with page assets, then the
    /// first positive cell of the fallback span.
    pub fn row_value(&self, row: &[String]) -> f64 {
        let annual = value_at(row, self.layout.annual_total_column);
        if annual > 0.0 {
            return annual;
        }

        let latest = self
            .series
            .last_active_slot()
            .and_then(|slot| self.layout.months.column(slot))
            .map(|col| value_at(row, col))
            .unwrap_or(0.0);
        if latest > 0.0 {
            return latest;
        }

        first_positive_in_fallback_span(row).unwrap_or(0.0)
    }

    /// Foreign pages need an explicitly foreign-tagged row; domestic pages
    /// take the first labelled row whatever its market.
    pub fn metric(&self, category: RowCategory) -> MetricTotal {
        let candidates = self
            .classifier
            .rows_in_category(self.rows, category)
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            warn!(?category, "metric row not found");
        } else {
            let preview = candidates
                .iter()
                .map(|row| (0..3).map(|i| cell_at(row, i)).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            debug!(?category, ?preview, "metric candidates");
        }

        let selected = match self.page {
            PageMode::Foreign => candidates
                .into_iter()
                .find(|row| self.classifier.market_of(row) == Market::Foreign),
            PageMode::Domestic => candidates.into_iter().next(),
        };

        match selected {
            Some(row) => MetricTotal {
                amount: self.row_value(row),
                currency: CurrencyTag::Native(self.classifier.market_of(row)),
            },
            None => MetricTotal::reporting(0.0),
        }
    }

    /// Sum of every cost row of the page's market, in reporting currency.
    pub fn total_cost(&self, exchange_rate: f64) -> MetricTotal {
        let total = self
            .classifier
            .rows_in_category(self.rows, RowCategory::CostTotal)
            .filter_map(|row| {
                let market = self.classifier.market_of(row);
                if !self.page.includes(market) {
                    return None;
                }
                Some(
                    self.page
                        .to_reporting(self.row_value(row), market, exchange_rate),
                )
            })
            .sum::<f64>();
        MetricTotal::reporting(total)
    }

    pub fn summarize(&self, exchange_rate: f64) -> SummaryMetrics {
        let unrealized = self.metric(RowCategory::UnrealizedTotal);
        let realized = self.metric(RowCategory::RealizedTotal);
        let dividends = self.metric(RowCategory::DividendTotal);
        let fees = self.metric(RowCategory::FeeTotal);
        let total_cost = self.total_cost(exchange_rate);

        let total_profit = MetricTotal::reporting(realized.amount + dividends.amount);
        let net_profit = MetricTotal::reporting(net_profit(
            self.series.current_value(),
            dividends.amount,
            total_cost.amount,
            fees.amount,
        ));

        SummaryMetrics {
            unrealized,
            realized,
            dividends,
            fees,
            total_profit,
            total_cost,
            net_profit,
        }
    }
}
