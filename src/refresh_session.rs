//! Last-request-wins bookkeeping for dashboard refreshes.
//!
//! Refreshes (year switch, manual refresh, periodic reload) may overlap; each
//! one is tagged with a token and only the newest token may replace the
//! displayed state.

use serde::Serialize;
use tracing::info;

use crate::dashboard::{build_dashboard, DashboardReport};
use crate::error::LedgerError;
use crate::ledger_source::Grid;
use crate::row_rules::PageMode;
use crate::settings::ExtractionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardState {
    Idle,
    Loading { token: RequestToken },
    Ready { report: Box<DashboardReport> },
    /// "數據無法識別"
    Unrecognized { message: String },
    /// "讀取失敗"
    ReadFailed { message: String },
}

#[derive(Debug)]
pub struct RefreshSession {
    page: PageMode,
    settings: ExtractionSettings,
    latest: u64,
    state: DashboardState,
}

impl RefreshSession {
    pub fn new(page: PageMode, settings: ExtractionSettings) -> Self {
        Self {
            page,
            settings,
            latest: 0,
            state: DashboardState::Idle,
        }
    }

    pub fn page(&self) -> PageMode {
        self.page
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Starts a refresh; any earlier token becomes stale.
    pub fn begin(&mut self) -> RequestToken {
        self.latest += 1;
        let token = RequestToken(self.latest);
        self.state = DashboardState::Loading { token };
        token
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.latest
    }

    /// Applies the outcome of the fetch issued under `token`.
    ///
    /// Returns `false` (and leaves the state untouched) when a newer refresh
    /// has been started since.
    pub fn complete(&mut self, token: RequestToken, fetched: Result<Grid, LedgerError>) -> bool {
        if !self.is_current(token) {
            info!(
                token = token.0,
                latest = self.latest,
                "discarding stale refresh result"
            );
            return false;
        }

        let outcome =
            fetched.and_then(|rows| build_dashboard(&rows, self.page, &self.settings));
        self.state = match outcome {
            Ok(report) => DashboardState::Ready {
                report: Box::new(report),
            },
            Err(err) if err.is_unrecognized() => DashboardState::Unrecognized {
                message: err.to_string(),
            },
            Err(err) => DashboardState::ReadFailed {
                message: err.to_string(),
            },
        };
        info!(token = token.0, "refresh applied");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger_source::parse_csv_text;

    fn minimal_grid(value: &str) -> Grid {
        parse_csv_text(&format!(",,1月,2月\n,,總現值,{value}\n")).expect("parse grid")
    }

    fn ready_value(state: &DashboardState) -> f64 {
        match state {
            DashboardState::Ready { report } => report.current_market_value,
            other => panic!("expected ready state, got {other:?}"),
        }
    }

    #[test]
    fn stale_results_do_not_replace_newer_state() {
        let mut session = RefreshSession::new(PageMode::Domestic, ExtractionSettings::default());
        assert_eq!(session.state(), &DashboardState::Idle);

        let first = session.begin();
        let second = session.begin();
        assert!(first < second);
        assert!(!session.is_current(first));

        assert!(!session.complete(first, Ok(minimal_grid("100"))));
        assert_eq!(session.state(), &DashboardState::Loading { token: second });

        assert!(session.complete(second, Ok(minimal_grid("200"))));
        assert_eq!(ready_value(session.state()), 200.0);

        // a late answer to the first request still loses
        assert!(!session.complete(first, Ok(minimal_grid("100"))));
        assert_eq!(ready_value(session.state()), 200.0);
    }

    #[test]
    fn failures_map_to_distinct_states() {
        let mut session = RefreshSession::new(PageMode::Domestic, ExtractionSettings::default());

        let token = session.begin();
        let unrecognized = parse_csv_text("沒有表頭\n").expect("parse");
        assert!(session.complete(token, Ok(unrecognized)));
        assert!(matches!(session.state(), DashboardState::Unrecognized { .. }));

        let token = session.begin();
        assert!(session.complete(
            token,
            Err(LedgerError::ReadFailed("timeout".to_string()))
        ));
        match session.state() {
            DashboardState::ReadFailed { message } => assert!(message.contains("timeout")),
            other => panic!("expected read failure, got {other:?}"),
        }
    }
}
