use std::sync::Arc;

use env::Env;
use eyre::Context;
use gateway::StripeClient;
use log::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let env = Env::load()?;

    info!("connecting to mongo");
    let storage = storage::Storage::new(env.mongo_url())
        .await
        .context("Failed to create storage")?;
    let gateway = StripeClient::new(&env).context("Failed to create gateway client")?;

    info!("creating ledger");
    let schedule = storage.schedule.clone();
    let ledger = ledger::Ledger::new(storage, Arc::new(gateway), env.gateway_name().to_owned());

    info!("Starting background jobs...");
    let scheduler = bg_process::start(ledger, &env, schedule).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.shutdown().await?;
    Ok(())
}
