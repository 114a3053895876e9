// MIT License - Copyright (c) 2026 Peter Wright

//! Alarm policy and external playback invocation.

use std::process::Stdio;

use tracing::{debug, warn};

use crate::error::HubError;
use crate::protocol::StateReport;

/// Alarm predicate: a security-sensor report with any bit set trips the
/// alarm. Every other device type never does, whatever its bitmap.
pub fn triggers(report: &StateReport) -> bool {
    report.device_type.triggers_alarm() && report.bitmap != 0
}

/// Fire-and-forget launcher for the external alarm playback collaborator.
///
/// Playback is advisory, not safety-critical: a failure to launch or a
/// non-zero exit is logged at `warn` and never affects the session.
#[derive(Debug, Clone)]
pub struct AlarmTrigger {
    program: String,
    args: Vec<String>,
}

impl AlarmTrigger {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Launch one playback invocation and return immediately.
    pub fn fire(&self) {
        debug!("Launching alarm playback: {}", self.program);
        let spawned = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                let program = self.program.clone();
                // Reap the child off to the side; the session never waits on it.
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if status.success() => {}
                        Ok(status) => warn!("Alarm playback {program} exited with {status}"),
                        Err(e) => warn!("Alarm playback {program} could not be reaped: {e}"),
                    }
                });
            }
            Err(e) => {
                let err = HubError::Playback(e);
                warn!("{err}");
            }
        }
    }
}
