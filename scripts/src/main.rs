use std::time::Duration;

use clap::Parser;
use plp_scripts::{cli::Cli, errors::ScriptError, utils::setup_context};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        chain_id,
        priv_key,
        rpc_url,
        config_dir,
        timeout_secs,
        safe_service_url,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let context = setup_context(
        chain_id,
        &priv_key,
        &rpc_url,
        &config_dir,
        Duration::from_secs(timeout_secs),
        safe_service_url.as_deref(),
    )
    .await?;

    command.run(&context).await
}
