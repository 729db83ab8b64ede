use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub bcrypt_cost: u32,
    pub auto_migrate: bool,
    pub admin: Option<AdminBootstrap>,
}

/// Administrator account created at startup when it does not exist yet.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Car rental booking API")]
pub struct Args {
    /// Host to bind to (overrides CAR_RENTAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CAR_RENTAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CAR_RENTAL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// bcrypt work factor for new password hashes (overrides CAR_RENTAL_BCRYPT_COST)
    #[arg(long)]
    pub bcrypt_cost: Option<u32>,

    /// Apply the schema before serving (overrides CAR_RENTAL_AUTO_MIGRATE)
    #[arg(long)]
    pub auto_migrate: Option<bool>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();

        let env_host = env::var("CAR_RENTAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_env("CAR_RENTAL_PORT", 8000u16)?;
        let env_db = env::var("CAR_RENTAL_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/car_rental.db".into());
        let env_cost = parse_env("CAR_RENTAL_BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        let env_auto_migrate = parse_env("CAR_RENTAL_AUTO_MIGRATE", true)?;

        let admin = match (
            env::var("CAR_RENTAL_ADMIN_EMAIL").ok(),
            env::var("CAR_RENTAL_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password,
                name: env::var("CAR_RENTAL_ADMIN_NAME").unwrap_or_else(|_| "Administrator".into()),
            }),
            _ => None,
        };

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            bcrypt_cost: args.bcrypt_cost.unwrap_or(env_cost),
            auto_migrate: args.auto_migrate.unwrap_or(env_auto_migrate),
            admin,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
