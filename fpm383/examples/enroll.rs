//! Enroll a finger with the module's AutoEnroll flow
//!
//! FPM383_PORT=/dev/ttyUSB0 cargo run --example enroll -- 7

use std::time::Duration;

use anyhow::{Context, bail};
use fpm383::{Driver, EnrollFlags, StreamEnd};
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
    let template_id: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("template id must be 0-65535")?,
        None => 1,
    };

    let driver = Driver::serial(&port, baud).with_stage_timeout(Duration::from_secs(15));
    driver
        .connect()
        .await
        .with_context(|| format!("opening {}", port))?;

    let parameters = driver.read_system_parameters().await?;
    println!("Module: {}", parameters);

    let times = u8::try_from(parameters.enroll_times)
        .context("module reports more enroll captures than AutoEnroll accepts")?;
    println!("Place the same finger {} times...", times);

    let mut stream = driver
        .stream_auto_enroll(template_id, times, EnrollFlags::empty())
        .await?;

    while let Some(event) = stream.next_event().await {
        match event {
            Ok(event) => println!("  {}", event),
            Err(e) => println!("  fault: {}", e),
        }
    }

    let report = stream.finish().await;
    driver.disconnect().await?;

    if report.is_success() {
        println!("Done.");
        return Ok(());
    }

    match (report.end, report.last()) {
        (StreamEnd::Idle, _) => bail!("module stopped reporting before the flow finished"),
        (StreamEnd::Completed, Some(last)) => bail!("enrollment failed: {}", last.confirmation),
        _ => bail!("enrollment did not complete"),
    }
}
