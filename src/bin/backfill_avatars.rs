//! Sets the default avatar on every user that doesn't have one.

use anyhow::Context;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::Level;

use guitar_portal::config::{DEFAULT_AVATAR, DEFAULT_DATABASE_NAME};
use guitar_portal::data::user::db::UserDbExt;
use guitar_portal::util::database_name;

async fn backfill() -> anyhow::Result<()> {
    let uri = std::env::var("MONGODB_URI").context("MONGODB_URI is not set")?;
    let avatar = std::env::var("DEFAULT_AVATAR").unwrap_or(DEFAULT_AVATAR.to_string());

    let options = ClientOptions::parse(&uri)
        .await
        .context("MONGODB_URI is not a valid connection string")?;
    let db_name = database_name(&options, DEFAULT_DATABASE_NAME);
    let client = Client::with_options(options)?;

    tracing::info!("Backfilling avatars in database '{}'...", db_name);
    let result = client
        .database(&db_name)
        .backfill_default_avatars(&avatar)
        .await
        .context("updating users failed")?;

    tracing::info!(
        "Matched {} users, updated {} to '{}'.",
        result.matched_count,
        result.modified_count,
        avatar
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    guitar_portal::init_logging(Level::INFO);
    if dotenv::dotenv().is_err() {
        tracing::debug!("No .env file.");
    }

    if let Err(e) = backfill().await {
        tracing::error!("Avatar backfill failed: {:#}", e);
        std::process::exit(1);
    }
}
