// MIT License - Copyright (c) 2026 Peter Wright

use std::net::SocketAddr;

use crate::devices::DeviceType;

/// All errors that can occur in the domo-hub library.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The state stream closed before a full frame was read. This is the
    /// single signal that terminates a session; the protocol has no goodbye
    /// message, so a close at a frame boundary is reported the same way as a
    /// mid-frame crash.
    #[error("Truncated frame: state stream closed mid-message")]
    TruncatedFrame,

    /// The type byte of an inbound frame does not map to a known
    /// [`DeviceType`]. Indicates protocol skew between hub and field
    /// controller.
    #[error("Invalid device type code: {code}")]
    InvalidDeviceType { code: u8 },

    /// The outbound command connection to the field controller could not be
    /// established. The session never becomes active.
    #[error("Peer unreachable on command port {addr}: {source}")]
    PeerUnreachable {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown device: {device_type} slot {slot}")]
    UnknownDevice { device_type: DeviceType, slot: u8 },

    /// More devices of one type were declared than the 64-bit state bitmap
    /// can address.
    #[error("Too many devices of type {device_type} (max {max})")]
    SlotsExhausted { device_type: DeviceType, max: usize },

    #[error("Audit log error: {0}")]
    Audit(#[from] csv::Error),

    /// The alarm playback collaborator could not be started. Advisory only:
    /// logged by the caller, never propagated into session teardown.
    #[error("Alarm playback failed: {0}")]
    Playback(#[source] std::io::Error),

    #[error("Channel closed")]
    ChannelClosed,
}

impl HubError {
    /// Whether this error tears down the session it occurred in.
    ///
    /// Everything except playback failures is session-fatal: there is no
    /// degraded mode, and the accept loop simply waits for the field
    /// controller to dial back in.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, HubError::Playback(_))
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
