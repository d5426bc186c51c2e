// Export route modules
pub mod chat;
pub mod completion;
pub mod content;
pub mod protocol;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(completion::routes(state))
        .merge(content::routes())
}
