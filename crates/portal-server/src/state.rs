use portal::facade::ChatFacade;
use portal::tools::ToolRegistry;
use std::sync::Arc;

/// Shared application state, read-only once the server starts
#[derive(Clone)]
pub struct AppState {
    pub facade: ChatFacade,
    /// Tools offered on `/chat-with-tools`
    pub tools: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(facade: ChatFacade, tools: Arc<ToolRegistry>) -> Self {
        Self { facade, tools }
    }
}
