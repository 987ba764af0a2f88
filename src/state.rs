use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::services::query::TelemetryQueries;

/// Source of the evaluation instant. Read once per request.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<TelemetryQueries>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(queries: TelemetryQueries) -> Self {
        Self {
            queries: Arc::new(queries),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
