use anyhow::{bail, Result};
use log::{error, info};
use shared::PermissionSet;
use std::path::PathBuf;

use voucher_desk::backend::io::memory::StaticPermissions;
use voucher_desk::backend::io::replay::{run_script, ReplayScript};
use voucher_desk::ConfigRepository;

const DEFAULT_CONFIG: &str = "voucher-desk.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(script_path) = args.next().map(PathBuf::from) else {
        bail!("usage: voucher-desk <script.yaml> [config.yaml]");
    };
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let config = ConfigRepository::new(&config_path).load_or_create()?;
    let script = ReplayScript::load(&script_path)?;
    info!(
        "Replaying {} steps of a {} voucher from {:?}",
        script.steps.len(),
        script.voucher,
        script_path
    );

    let api = script.voucher_api();
    let lists = script.list_selector();
    let permissions = StaticPermissions::new(PermissionSet::all());

    let events = match run_script(&script, &config, &api, &lists, &permissions).await {
        Ok(events) => events,
        Err(e) => {
            error!("Replay failed: {}", e);
            return Err(e);
        }
    };

    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
