//! `submit`: send one manual fall report.

use fallwatch_core::Monitor;

use crate::cli::{GlobalOpts, OutputFormat, SubmitArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(monitor: &Monitor, args: SubmitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Start from the canned test reading and apply any overrides.
    let mut record = monitor.default_report();
    if let Some(device) = args.device {
        record.device_id = device;
    }
    if let Some(time) = args.time {
        record.timestamp = time;
    }
    if let Some(acc) = args.acc {
        record.acc = acc;
    }
    if let Some(gyro) = args.gyro {
        record.gyro = gyro;
    }

    let device = record.device_id.clone();
    let body = monitor.submit_report(Some(record)).await?;

    let out = match global.output {
        OutputFormat::Table | OutputFormat::Plain => format!(
            "{device} fall report sent to server:\n{}",
            output::render_json_pretty(&body)?
        ),
        OutputFormat::Json => output::render_json_pretty(&body)?,
        OutputFormat::JsonCompact => output::render_json_compact(&body)?,
        OutputFormat::Yaml => output::render_yaml(&body)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
