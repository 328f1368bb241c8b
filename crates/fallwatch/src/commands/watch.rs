//! `watch`: live monitoring until Ctrl-C, a duration, or a count.

use std::time::Duration;

use tokio::time::Instant;

use fallwatch_core::{DeviceStats, Monitor, Notification, PollPhase};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

fn render_notification(
    n: &Notification,
    timestamp: &str,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(format!(
            "{} {}",
            output::paint_dim(&format!("[{timestamp}]"), color),
            output::paint_alert(&n.to_string(), color)
        )),
        OutputFormat::Plain => Ok(n.to_string()),
        // One document per notification so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json_compact(n),
        OutputFormat::Yaml => Ok(format!("---\n{}", output::render_yaml(n)?.trim_end())),
    }
}

fn render_stats(stats: DeviceStats, timestamp: &str, color: bool) -> String {
    format!(
        "{} devices: {} total, {} active",
        output::paint_dim(&format!("[{timestamp}]"), color),
        stats.total_count,
        stats.active_count
    )
}

pub async fn handle(monitor: &Monitor, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    // Device counts are only interleaved into the human-readable view.
    let show_stats = !args.no_stats && matches!(global.output, OutputFormat::Table);

    let mut notifications = monitor.notification_stream();
    let mut stats_rx = monitor.subscribe_device_stats();
    let mut feed_health = monitor.subscribe_feed_health();
    let mut last_stats: Option<DeviceStats> = None;

    monitor.start().await?;
    if !global.quiet {
        eprintln!("Watching {} (Ctrl-C to stop)", monitor.config().base_url);
    }

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let timer = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timer);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0usize;
    let result: Result<(), CliError> = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            () = &mut timer => break Ok(()),

            batch = notifications.next_batch() => {
                let Some(batch) = batch else { break Ok(()) };
                let remaining = args.count.map_or(usize::MAX, |c| c.saturating_sub(printed));
                let now = monitor.timestamp();
                let lines: Result<Vec<String>, CliError> = batch
                    .iter()
                    .take(remaining)
                    .map(|n| render_notification(n, &now, &global.output, color))
                    .collect();
                match lines {
                    Ok(lines) => {
                        for line in &lines {
                            output::print_output(line, global.quiet);
                        }
                        printed += lines.len();
                    }
                    Err(e) => break Err(e),
                }
                if args.count.is_some_and(|c| printed >= c) {
                    break Ok(());
                }
            }

            changed = stats_rx.changed(), if show_stats => {
                if changed.is_err() {
                    break Ok(());
                }
                let stats = *stats_rx.borrow_and_update();
                if last_stats != Some(stats) {
                    last_stats = Some(stats);
                    let line = render_stats(stats, &monitor.timestamp(), color);
                    output::print_output(&line, global.quiet);
                }
            }

            changed = feed_health.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                // A halted feed loop never recovers; shutdown reports why.
                if feed_health.borrow_and_update().phase == PollPhase::Halted {
                    break Ok(());
                }
            }
        }
    };

    let shutdown = monitor.shutdown().await;
    if !global.quiet {
        eprintln!("{} fall event(s) detected", monitor.fall_count());
    }
    result?;
    shutdown.map_err(CliError::from)
}
