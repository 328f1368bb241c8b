//! `feed`: one-shot dump of the sensor feed.

use serde::Serialize;
use tabled::Tabled;

use fallwatch_core::{Axes, Monitor, SensorRecord, SensorService};

use crate::cli::{FeedArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// A record with its 1-based position in the feed.
#[derive(Serialize)]
struct FeedEntry {
    index: usize,
    #[serde(flatten)]
    record: SensorRecord,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Acc (m/s²)")]
    acc: String,
    #[tabled(rename = "Gyro (rad/s)")]
    gyro: String,
}

fn to_row(e: &FeedEntry) -> RecordRow {
    RecordRow {
        index: e.index,
        device: e.record.device_id.clone(),
        time: e.record.timestamp.clone(),
        acc: fmt_axes(e.record.acc),
        gyro: fmt_axes(e.record.gyro),
    }
}

fn fmt_axes((x, y, z): Axes) -> String {
    format!("{x:.2}, {y:.2}, {z:.2}")
}

pub async fn handle(monitor: &Monitor, args: &FeedArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let records = monitor.service().sensor_snapshot().await?;

    let skip = args.last.map_or(0, |n| records.len().saturating_sub(n));
    let entries: Vec<FeedEntry> = records
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(i, record)| FeedEntry {
            index: i + 1,
            record,
        })
        .collect();

    let out = output::render_list(&global.output, &entries, to_row, |e| {
        format!("{}\t{}", e.record.device_id, e.record.timestamp)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
