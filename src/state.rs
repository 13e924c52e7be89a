use crate::config::{Config, TrendModelKind};
use crate::db::DbPool;
use crate::services::cash_flow::{HistoricalTrends, PlaceholderTrends, TrendModel};
use chrono::{Local, NaiveDate};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub trend_model: Arc<dyn TrendModel>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let trend_model: Arc<dyn TrendModel> = match config.trend_model {
            TrendModelKind::Placeholder => Arc::new(PlaceholderTrends),
            TrendModelKind::Historical => Arc::new(HistoricalTrends),
        };
        tracing::info!(model = trend_model.name(), "Using cash flow trend model");

        Self {
            db,
            config: Arc::new(config),
            trend_model,
        }
    }

    /// The reference day for reports and projections.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
