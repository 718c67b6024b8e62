//! Track command - follow a flight until Ctrl+C or a deadline.

use std::path::PathBuf;
use std::time::Duration;

use skytrack::health::ProviderHealth;
use skytrack::{SessionHandle, TelemetrySample};
use tokio_util::sync::CancellationToken;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the track command.
pub fn run(
    config_path: Option<PathBuf>,
    flight: &str,
    duration: Option<u64>,
) -> Result<(), CliError> {
    let runner = CliRunner::new(config_path)?;
    runner.log_startup("track");

    let engine = runner.create_engine()?;
    let session_config = runner.config().session_config();

    println!("SkyTrack v{}", env!("CARGO_PKG_VERSION"));
    println!("==============");
    println!();
    println!("Flight:        {}", flight.trim().to_uppercase());
    println!("Config:        {}", runner.config_path().display());
    println!("Poll interval: {}s", session_config.poll_interval.as_secs());
    println!(
        "Providers:     {}",
        runner
            .config()
            .providers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        shutdown_signal.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    runner.runtime().block_on(async {
        let session = engine.track_with(flight, session_config)?;
        follow(&session, shutdown, duration.map(Duration::from_secs)).await;
        session.stop().await;
        Ok::<_, CliError>(())
    })?;

    print_summary(&engine.health());
    engine.log_stats();
    Ok(())
}

/// Prints status transitions and positions until cancelled or the deadline passes.
async fn follow(session: &SessionHandle, shutdown: CancellationToken, limit: Option<Duration>) {
    let mut updates = session.subscribe();
    let mut status = session.watch_status();
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    println!("[status] {}", status.borrow_and_update().display_status());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut deadline => {
                println!();
                println!("Duration elapsed, stopping...");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                let snapshot = session.snapshot();
                match (snapshot.retry_after, snapshot.last_error) {
                    (Some(retry_after), _) => println!(
                        "[status] {} (rate limited, retry in {}s)",
                        current.display_status(),
                        retry_after.as_secs()
                    ),
                    (None, Some(error)) if snapshot.reconnect_attempts > 0 => println!(
                        "[status] {} ({}, attempt {})",
                        current.display_status(),
                        error,
                        snapshot.reconnect_attempts
                    ),
                    _ => println!("[status] {}", current.display_status()),
                }
            }
            update = updates.recv() => match update {
                Some(sample) => print_sample(&sample),
                None => break,
            },
        }
    }

    updates.unsubscribe();
}

fn print_sample(sample: &TelemetrySample) {
    let kind = if sample.is_derived() { "est " } else { "live" };
    println!(
        "[{}] {} {:>9.4} {:>10.4}  {:>6.0} ft  {:>4.0} kt  {:>3.0}°",
        kind,
        sample.captured_at().format("%H:%M:%S%.3f"),
        sample.latitude(),
        sample.longitude(),
        sample.altitude_ft(),
        sample.ground_speed_kt(),
        sample.heading_deg()
    );
}

fn print_summary(health: &[ProviderHealth]) {
    println!();
    println!("Provider Health");
    println!("───────────────");
    println!("  {:<16} {:>8} {:>8} {:>7}", "Provider", "Success", "Failure", "Ratio");
    for entry in health {
        println!(
            "  {:<16} {:>8} {:>8} {:>6.0}%",
            entry.name,
            entry.success_count,
            entry.failure_count,
            entry.success_ratio() * 100.0
        );
    }
}
