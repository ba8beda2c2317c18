pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod jwt;
pub mod password;
pub mod session;
pub mod store;

use api::{AppState, create_api_router};
use axum::Router;
use db::Database;
use jwt::{TokenConfig, TokenService};
use session::SessionService;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token secrets and lifetimes
    pub tokens: TokenConfig,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let sessions = SessionService::new(TokenService::new(&config.tokens), config.db.clone());

    let state = AppState {
        sessions,
        secure_cookies: config.secure_cookies,
    };

    Router::new().nest("/api/v1", create_api_router(state))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
