//! Shared state of the HTTP service.

use std::sync::Arc;

use climate_common::ClimateResult;

use crate::config::ViewerConfig;
use crate::session::ViewerSession;

pub struct AppState {
    pub session: Arc<ViewerSession>,
    pub config: ViewerConfig,
}

impl AppState {
    pub async fn new(config: ViewerConfig, query: Option<&str>) -> ClimateResult<Self> {
        let session = ViewerSession::start(&config, query).await?;
        Ok(Self { session, config })
    }

    pub fn from_session(session: Arc<ViewerSession>, config: ViewerConfig) -> Self {
        Self { session, config }
    }
}
