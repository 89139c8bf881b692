use clap::Parser;
use log::{debug, error, info};
use tokio_util::sync::CancellationToken;
use url::Url;

use ojala::config::locate_file;
use ojala::notify::Notifier;
use ojala::{Args, Config, TARGET_URL, Worker};

#[tokio::main]
async fn main() -> Result<(), ojala::Error> {
    let args = Args::parse();
    let config_file = locate_file(args.config.as_deref());
    let config = Config::load(&args, config_file.as_deref())?;

    env_logger::init_from_env(env_logger::Env::default().default_filter_or(config.log_filter()));
    match &config_file {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }
    debug!("Resolved configuration: {config:?}");

    let url = Url::parse(TARGET_URL)?;
    let notifier = Notifier::from_config(&config, &url)?;
    let worker = Worker::new(url, &config, notifier)?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl+C: {e}");
            return;
        }
        println!("Stopping program...");
        signal_token.cancel();
    });

    println!("Stalking website... Press Ctrl+C to stop it.");
    worker.run(token).await;
    println!("Goodbye!");

    Ok(())
}
