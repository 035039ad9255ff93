use std::sync::Arc;

use crate::services::match_flow::MatchService;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    match_service: Arc<MatchService>,
}

impl AppState {
    pub fn new(match_service: Arc<MatchService>) -> Self {
        Self { match_service }
    }

    pub fn match_service(&self) -> Arc<MatchService> {
        self.match_service.clone()
    }
}
