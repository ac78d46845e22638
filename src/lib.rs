pub mod attendance;
pub mod codes;
pub mod config;
pub mod courses;
pub mod err;
pub mod io;
pub mod models;
pub mod profiles;
pub mod qrcodes;
pub mod signals;
pub mod users;

pub use err::{Error, Payload};

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub async fn connect(database_url: &str, max_connections: u32) -> Payload<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(pg: &PgPool) -> Payload<()> {
    MIGRATOR.run(pg).await.map_err(|err| Error::InternalError {
        kind: "MigrationError",
        message: err.to_string(),
    })
}
