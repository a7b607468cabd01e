#[macro_use]
extern crate rocket;

use mongodb::{Client, Database};
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::error::{BackendError, ConfigurationError};
use crate::middleware::redirect::CanonicalHost;
use crate::route::mount_api;
use crate::security::Security;

pub mod config;
pub mod data;
pub mod error;
pub mod middleware;
pub mod resp;
pub mod role;
pub mod route;
pub mod security;
pub mod session;
pub mod util;

/// Installs the global tracing subscriber and routes `log` records (Rocket's) through it.
pub fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global logger: {}", err);
    }
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("Unable to forward log records: {}", err);
    }
}

pub fn load_config() -> Result<Config, ConfigurationError> {
    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            Ok(c)
        }
        Err(ConfigurationError::NotFound(_)) => {
            let c = Config::default();
            if c.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            Ok(c)
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            Err(other)
        }
    }
}

pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        init_logging(l);
    }

    let c = load_config()?;

    tracing::info!("Initializing security information...");
    let security = Security::load()?;

    tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
    let client = Client::with_uri_str(c.mongodb_uri.as_str()).await?;

    tracing::info!("Using MongoDB database: {}", c.mongodb_db);
    let db = client.database(c.mongodb_db.as_str());

    if let Err(e) = db.list_collection_names(None).await {
        tracing::error!("Unable to connect to MongoDB.");
        return Err(e.into());
    }

    build(c, security, db)
}

/// Assembles the server from already loaded parts.
pub fn build(c: Config, security: Security, db: Database) -> Result<Rocket<Build>, BackendError> {
    tracing::info!("Setting up CORS...");
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::all(),
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::all(),
        expose_headers: [resp::toast::TOAST_HEADER_NAME.to_string()].into(),
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    let canonical_host = c.canonical_host.clone();

    let mut r = rocket::build().manage(c).manage(security).manage(db).attach(cors);

    if let Some(redirect) = canonical_host {
        tracing::info!("Redirecting '{}' to '{}'.", redirect.from, redirect.to);
        r = r.attach(CanonicalHost::new(redirect));
    }

    Ok(mount_api(r))
}
