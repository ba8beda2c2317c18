//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{
    DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS, MAX_TTL_SECS, TokenConfig,
};
use clap::Parser;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;
const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
const NEW_USER_PASSWORD_ENV: &str = "NEW_USER_PASSWORD";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessiongate",
    about = "Session authentication with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE_PATH", default_value = "sessiongate.db")]
    pub database: String,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_ACCESS_TTL_SECS)]
    pub access_ttl: u64,

    /// Refresh token lifetime in seconds, must exceed the access token lifetime
    #[arg(long, default_value_t = DEFAULT_REFRESH_TTL_SECS)]
    pub refresh_ttl: u64,

    /// Path to file containing the access token secret. Prefer ACCESS_TOKEN_SECRET instead
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer REFRESH_TOKEN_SECRET instead
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Set the Secure flag on token cookies (use behind HTTPS)
    #[arg(long)]
    pub secure_cookies: bool,

    /// Create a user with this username on startup. The password is read from NEW_USER_PASSWORD
    #[arg(long, value_name = "USERNAME", requires = "email")]
    pub create_user: Option<String>,

    /// Email for the user created with --create-user
    #[arg(long, requires = "create_user")]
    pub email: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read a variable and remove it from the environment.
fn take_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: only called from `main` before the database pool and the server
    // start. The runtime's worker threads exist but run no tasks yet, and
    // nothing else in the process reads or writes the environment.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Load a signing secret from an environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    let secret = if let Some(secret) = take_env(env_var) {
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            variable = %env_var,
            "Token secret is required. Set the environment variable (recommended) or pass a secret file"
        );
        return None;
    };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            variable = %env_var,
            "Token secret is shorter than {} characters. Use a longer secret", MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Load both token secrets. They must differ so one class can never pass as the other.
pub fn load_secrets(args: &Args) -> Option<(Vec<u8>, Vec<u8>)> {
    let access = load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref())?;
    let refresh = load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref())?;

    if access == refresh {
        error!("Access and refresh token secrets must be different");
        return None;
    }

    Some((access, refresh))
}

/// Check token lifetimes. Returns None and logs an error if they are unusable.
pub fn validate_ttls(access_ttl: u64, refresh_ttl: u64) -> Option<(u64, u64)> {
    if access_ttl == 0 {
        error!("Access token lifetime must be positive");
        return None;
    }

    if access_ttl > MAX_TTL_SECS || refresh_ttl > MAX_TTL_SECS {
        error!(
            access_ttl,
            refresh_ttl, "Token lifetimes must not exceed {} seconds", MAX_TTL_SECS
        );
        return None;
    }

    if refresh_ttl <= access_ttl {
        error!(
            access_ttl,
            refresh_ttl, "Refresh token lifetime must exceed access token lifetime"
        );
        return None;
    }

    Some((access_ttl, refresh_ttl))
}

/// Account requested with --create-user.
pub struct NewUser {
    pub username: String,
    pub email: String,
    password: String,
}

/// Collect the --create-user request. The password is taken from the
/// environment here, before the database opens.
pub fn new_user_request(args: &Args) -> Option<NewUser> {
    let (Some(username), Some(email)) = (&args.create_user, &args.email) else {
        return None;
    };

    let Some(password) = take_env(NEW_USER_PASSWORD_ENV) else {
        error!("Set NEW_USER_PASSWORD to create a user");
        std::process::exit(1);
    };

    Some(NewUser {
        username: username.clone(),
        email: email.clone(),
        password,
    })
}

/// Handle the --create-user flag: create the account unless the name or email is taken.
pub async fn handle_create_user(db: &Database, user: &NewUser) {
    let (username, email) = (user.username.as_str(), user.email.as_str());

    match db.users().is_taken(username, email).await {
        Ok(true) => {
            info!(username = %username, "User already exists, skipping creation");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }

    match db.create_user(username, email, &user.password).await {
        Ok(uuid) => info!(username = %username, user = %uuid, "User created"),
        Err(e) => {
            error!(error = %e, "Failed to create user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    (access_secret, refresh_secret): (Vec<u8>, Vec<u8>),
    (access_ttl, refresh_ttl): (u64, u64),
    secure_cookies: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        tokens: TokenConfig {
            access_secret,
            refresh_secret,
            access_ttl,
            refresh_ttl,
        },
        secure_cookies,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sessiongate"]).unwrap();
        assert_eq!(args.access_ttl, 300);
        assert_eq!(args.refresh_ttl, 1_209_600);
        assert!(!args.secure_cookies);
        assert!(args.create_user.is_none());
    }

    #[test]
    fn test_create_user_requires_email() {
        assert!(Args::try_parse_from(["sessiongate", "--create-user", "alice"]).is_err());

        let args = Args::try_parse_from([
            "sessiongate",
            "--create-user",
            "alice",
            "--email",
            "alice@example.com",
        ])
        .unwrap();
        assert_eq!(args.create_user.as_deref(), Some("alice"));
        assert_eq!(args.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_validate_ttls() {
        assert_eq!(validate_ttls(300, 600), Some((300, 600)));
        assert_eq!(validate_ttls(300, 300), None);
        assert_eq!(validate_ttls(600, 300), None);
        assert_eq!(validate_ttls(0, 300), None);
        assert_eq!(validate_ttls(300, u64::MAX), None);
        assert_eq!(validate_ttls(300, MAX_TTL_SECS), Some((300, MAX_TTL_SECS)));
        assert_eq!(validate_ttls(300, MAX_TTL_SECS + 1), None);
    }

    #[test]
    fn test_load_secret_from_file() {
        let path = std::env::temp_dir().join(format!("sessiongate-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, format!("{}\n", "s".repeat(40))).unwrap();

        let secret = load_secret("SESSIONGATE_TEST_UNSET", path.to_str());
        assert_eq!(secret, Some(vec![b's'; 40]));

        std::fs::write(&path, "too-short").unwrap();
        assert!(load_secret("SESSIONGATE_TEST_UNSET", path.to_str()).is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_secret() {
        assert!(load_secret("SESSIONGATE_TEST_UNSET", None).is_none());
    }

    #[test]
    fn test_no_new_user_without_flag() {
        let args = Args::try_parse_from(["sessiongate"]).unwrap();
        assert!(new_user_request(&args).is_none());
    }
}
