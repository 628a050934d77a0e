use std::sync::Arc;

use crate::application::analytics::{AnalyticsLimits, AnalyticsService};

#[derive(Clone)]
pub struct HttpState {
    pub analytics: Arc<AnalyticsService>,
}

impl HttpState {
    pub fn new(limits: AnalyticsLimits) -> Self {
        Self {
            analytics: Arc::new(AnalyticsService::new(limits)),
        }
    }
}
