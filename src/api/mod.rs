mod error;
mod users;

use axum::Router;

use crate::auth::HasSessionBackend;
use crate::db::Database;
use crate::session::SessionService;

/// Shared state for the session endpoints.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService<Database>,
    pub secure_cookies: bool,
}

impl HasSessionBackend for AppState {
    type Store = Database;

    fn sessions(&self) -> &SessionService<Database> {
        &self.sessions
    }
}

/// Create the API router.
pub fn create_api_router(state: AppState) -> Router {
    Router::new().nest("/users", users::router(state))
}
