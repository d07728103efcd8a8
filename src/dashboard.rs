use serde::Serialize;
use tracing::debug;

use crate::asset_aggregation::{aggregate_assets, AssetPoint, MetricScope, SummaryMetrics, Trend};
use crate::dividend_calendar::{build_dividend_calendar, DividendMatrix};
use crate::error::LedgerError;
use crate::holdings_ranking::{rank_holdings, Holding};
use crate::row_rules::{InstrumentMarketRule, PageMode, RowCategory, RowClassifier};
use crate::settings::ExtractionSettings;
use crate::sheet_layout::SheetLayout;

/// Everything one dashboard page shows, derived from a single sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub page: PageMode,
    pub reporting_currency: &'static str,
    pub asset_points: Vec<AssetPoint>,
    pub current_market_value: f64,
    pub trend: Option<Trend>,
    pub metrics: SummaryMetrics,
    pub dividend_month_one_column: usize,
    pub dividends: DividendMatrix,
    pub holdings: Vec<Holding>,
}

/// Runs every pass over `rows` for one page.
///
/// Only layout failures (no `1月` header, no `總現值` row) are errors; any
/// other missing piece reads as zero.
pub fn build_dashboard(
    rows: &[Vec<String>],
    page: PageMode,
    settings: &ExtractionSettings,
) -> Result<DashboardReport, LedgerError> {
    let layout = SheetLayout::locate(rows)?;
    let classifier = RowClassifier::default();
    let instrument_rule = InstrumentMarketRule::default();

    if classifier
        .rows_in_category(rows, RowCategory::AssetTotal)
        .next()
        .is_none()
    {
        return Err(LedgerError::NoAssetRows);
    }

    let series = aggregate_assets(rows, &layout, page, &classifier);
    let scope = MetricScope {
        rows,
        layout: &layout,
        series: &series,
        page,
        classifier: &classifier,
    };
    let metrics = scope.summarize(settings.exchange_rate);
    let calendar = build_dividend_calendar(
        rows,
        &layout,
        page,
        &instrument_rule,
        settings.exchange_rate,
    );
    let holdings = rank_holdings(rows, &layout, page, &instrument_rule);

    debug!(
        ?page,
        points = series.points().len(),
        dividend_entries = calendar.matrix.len(),
        holdings = holdings.len(),
        "dashboard built"
    );

    Ok(DashboardReport {
        page,
        reporting_currency: page.reporting_currency(),
        asset_points: series.points(),
        current_market_value: series.current_value(),
        trend: series.trend(),
        metrics,
        dividend_month_one_column: calendar.month_one_column,
        dividends: calendar.matrix,
        holdings,
    })
}
