use anyhow::Context;

use qrmark::config::CONFIG;
use qrmark::{io, users, Error};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let database_url = CONFIG
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    io::prepare_io(&CONFIG.media_root).await?;

    let pg = qrmark::connect(database_url, CONFIG.max_connections).await?;
    qrmark::migrate(&pg).await?;
    log::info!("Database schema is up to date");

    if let Some(seed) = &CONFIG.superuser {
        match users::create_superuser(&pg, &seed.user_id, &seed.password).await {
            Ok(user) => log::info!(
                "Created superuser {}",
                serde_json::to_string(&user).unwrap_or_else(|_| user.to_string())
            ),
            Err(Error::UserAlreadyExists { .. }) => {
                log::info!("Superuser {} already exists, leaving it alone", seed.user_id)
            }
            Err(err) => return Err(err.into()),
        }
    }

    log::info!("Media root is {}", CONFIG.media_root.display());
    Ok(())
}
