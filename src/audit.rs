// MIT License - Copyright (c) 2026 Peter Wright

//! Append-only CSV audit trail, one file per session.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::devices::DeviceType;
use crate::error::Result;
use crate::protocol::bitmap_string;

/// Per-session audit sink.
///
/// The file is created fresh when the session is established (header row
/// included) and named from the connection timestamp and peer address, so
/// concurrent sessions never share a file. Rows are flushed one by one: a
/// torn-down session leaves complete rows behind, never a partial one.
pub struct AuditLog {
    writer: csv::Writer<std::fs::File>,
    path: PathBuf,
}

impl AuditLog {
    /// Create the audit file for a session opened at `opened_at` with `peer`.
    pub fn create(dir: &Path, peer: SocketAddr, opened_at: DateTime<Local>) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        // IPv6 addresses contain ':', which is hostile to most tooling.
        let ip = peer.ip().to_string().replace(':', "-");
        let file_name = format!(
            "audit-{}-{}-{}.csv",
            opened_at.format("%Y%m%d-%H%M%S"),
            ip,
            peer.port()
        );
        let path = dir.join(file_name);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["device type", "states", "is_alarm"])?;
        writer.flush()?;

        Ok(Self { writer, path })
    }

    /// Append one audit row and flush it.
    ///
    /// The states column is the 64-bit bitmap rendered as a zero-padded
    /// binary string, most significant bit first; the flag column uses the
    /// deployed `True`/`False` spelling.
    pub fn append(&mut self, device_type: DeviceType, bitmap: u64, is_alarm: bool) -> Result<()> {
        self.writer.write_record([
            device_type.name(),
            bitmap_string(bitmap).as_str(),
            if is_alarm { "True" } else { "False" },
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    /// Path of the audit file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
