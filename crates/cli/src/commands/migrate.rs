//! Database migration command.

use tracing::info;

/// Run the engine's embedded migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    info!("Running engine migrations...");
    sqlx::migrate!("../engine/migrations").run(&pool).await?;

    info!("Engine migrations complete!");
    Ok(())
}
