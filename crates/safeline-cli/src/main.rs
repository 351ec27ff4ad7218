//! safeline - realtime session runner.

mod config;
mod error;
mod session;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safeline=info,safeline_realtime=info,safeline_notify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting safeline session");

    let args = Args::parse();
    let config = args.into_config()?;

    tracing::info!(
        resource = %config.resource,
        subscribers = config.subscribers,
        events = config.events,
        settings = %config.notify.settings_path.display(),
        "configuration loaded"
    );

    let report = match session::run(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            return Err(e.into());
        }
    };

    for channel in &report.channels {
        println!(
            "{:<20} {:<8} subscribers={} events={} topic={}",
            channel.resource,
            channel.status,
            channel.subscriber_count,
            channel.events_dispatched,
            channel.topic
        );
    }
    println!("received per subscriber: {:?}", report.received);
    println!(
        "transport: {} opened, {} closed; notifications: {} ({} unread)",
        report.opens, report.closes, report.notifications, report.unread
    );

    Ok(())
}
