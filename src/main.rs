use clap::Parser;
use sessiongate::cli::{
    Args, build_config, handle_create_user, init_logging, load_secrets, new_user_request,
    open_database, validate_ttls,
};
use sessiongate::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(secrets) = load_secrets(&args) else {
        std::process::exit(1);
    };

    let Some(ttls) = validate_ttls(args.access_ttl, args.refresh_ttl) else {
        std::process::exit(1);
    };

    let new_user = new_user_request(&args);

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(user) = &new_user {
        handle_create_user(&db, user).await;
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let config = build_config(db, secrets, ttls, args.secure_cookies);
    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
