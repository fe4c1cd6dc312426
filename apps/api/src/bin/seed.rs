//! Loads the company, roles and personas into the hosted database.
//!
//! Usage: `seed [dataset.json]`. Without an argument the bundled SmartJoules
//! dataset is used. Only `DATABASE_URL` is required.

use anyhow::{Context, Result};
use tracing::info;

use recruit_api::config::require_env;
use recruit_api::db::create_pool;
use recruit_api::seed::{self, SeedDataset};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    recruit_api::init_tracing(env!("CARGO_CRATE_NAME"), "info");

    let dataset = match std::env::args().nth(1) {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read seed dataset {path}"))?;
            SeedDataset::parse(&raw)?
        }
        None => SeedDataset::bundled()?,
    };
    info!(
        "Loaded dataset: 1 company, {} roles, {} personas",
        dataset.roles.len(),
        dataset.personas.len()
    );

    let pool = create_pool(&require_env("DATABASE_URL")?, 2).await?;
    let report = seed::run(&pool, &dataset).await?;

    info!(
        "Seed complete for company {}: {} roles, {} personas",
        report.company_id, report.roles_linked, report.personas_linked
    );
    Ok(())
}
