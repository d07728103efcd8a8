pub mod asset_aggregation;
pub mod cell_value;
pub mod dashboard;
pub mod dividend_calendar;
pub mod error;
pub mod holdings_ranking;
pub mod ledger_source;
pub mod refresh_session;
pub mod row_rules;
pub mod settings;
pub mod sheet_layout;

pub use dashboard::{build_dashboard, DashboardReport};
pub use error::LedgerError;
pub use ledger_source::{parse_csv_text, read_grid_from_path, sheet_url, sheet_url_now, Grid};
pub use refresh_session::{DashboardState, RefreshSession, RequestToken};
pub use row_rules::{Market, PageMode};
pub use settings::ExtractionSettings;
