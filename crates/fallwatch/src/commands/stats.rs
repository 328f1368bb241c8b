//! `stats`: one-shot device counts.

use fallwatch_core::{DeviceStats, Monitor, SensorService};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(stats: &DeviceStats) -> String {
    format!(
        "Total devices:  {}\nActive devices: {}",
        stats.total_count, stats.active_count
    )
}

pub async fn handle(monitor: &Monitor, global: &GlobalOpts) -> Result<(), CliError> {
    let stats = monitor.service().device_stats().await?;

    let out = output::render_single(&global.output, &stats, detail, |s| {
        format!("{} {}", s.total_count, s.active_count)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
