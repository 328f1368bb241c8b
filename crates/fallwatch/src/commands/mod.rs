//! Command dispatch.

pub mod config_cmd;
pub mod feed;
pub mod stats;
pub mod submit;
pub mod watch;

use fallwatch_core::Monitor;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a service-bound command to its handler.
pub async fn dispatch(cmd: Command, monitor: &Monitor, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(monitor, &args, global).await,
        Command::Stats => stats::handle(monitor, global).await,
        Command::Feed(args) => feed::handle(monitor, &args, global).await,
        Command::Submit(args) => submit::handle(monitor, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not use the sensor service".into(),
        )),
    }
}
