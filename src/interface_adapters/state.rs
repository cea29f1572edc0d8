use crate::use_cases::SessionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Owns every running session actor.
    pub session_registry: Arc<SessionRegistry>,
}
