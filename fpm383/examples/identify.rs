//! Identify a finger against the whole library
//!
//! FPM383_PORT=/dev/ttyUSB0 cargo run --example identify

use anyhow::Context;
use fpm383::{Driver, IdentifyFlags, StreamEnd};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("FPM383_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let baud: u32 = match std::env::var("FPM383_BAUD") {
        Ok(value) => value.parse().context("FPM383_BAUD is not a number")?,
        Err(_) => 57_600,
    };

    let driver = Driver::serial(&port, baud);
    driver
        .connect()
        .await
        .with_context(|| format!("opening {}", port))?;

    println!("Templates stored: {}", driver.valid_template_count().await?);
    println!("Place a finger on the sensor...");

    let report = driver.auto_identify(3, IdentifyFlags::empty()).await?;

    for event in &report.events {
        println!("  {}", event);
    }

    match (report.end, report.last()) {
        (StreamEnd::Completed, Some(event)) if report.is_success() => {
            println!(
                "Matched template {} (score {})",
                event.matched_id.unwrap_or_default(),
                event.score.unwrap_or_default()
            );
        }
        (StreamEnd::Completed, Some(event)) => println!("No match: {}", event.confirmation),
        (StreamEnd::Idle, _) => println!("No finger presented"),
        (_, _) => {
            if let Some(e) = &report.error {
                println!("Fault: {}", e);
            }
        }
    }

    driver.disconnect().await?;
    Ok(())
}
