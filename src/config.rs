// MIT License - Copyright (c) 2026 Peter Wright

use std::path::PathBuf;

/// Runtime configuration for the hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Address the primary (state) listener binds to
    pub bind_addr: String,
    /// Primary listener port, state frames inbound (default: 10008)
    pub listen_port: u16,
    /// Port the hub dials back on the peer's address for command frames
    /// (default: 10108)
    pub command_port: u16,
    /// Capacity of the state and command queues. Senders block when a queue
    /// is full; this is the backpressure contract, not a drop threshold.
    pub queue_capacity: usize,
    /// Directory for per-session audit files
    pub audit_dir: PathBuf,
    /// External alarm playback program
    pub playback_program: String,
    /// Arguments passed to the playback program
    pub playback_args: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            listen_port: 10008,
            command_port: 10108,
            queue_capacity: 10,
            audit_dir: PathBuf::from("audit"),
            playback_program: "aplay".to_string(),
            playback_args: vec!["-q".to_string(), "alarm.wav".to_string()],
        }
    }
}

impl HubConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> HubConfigBuilder {
        HubConfigBuilder::default()
    }
}

/// Builder for HubConfig.
#[derive(Debug, Clone, Default)]
pub struct HubConfigBuilder {
    config: HubConfig,
}

impl HubConfigBuilder {
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.listen_port = port;
        self
    }

    pub fn command_port(mut self, port: u16) -> Self {
        self.config.command_port = port;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.audit_dir = dir.into();
        self
    }

    pub fn playback_program(mut self, program: impl Into<String>) -> Self {
        self.config.playback_program = program.into();
        self
    }

    pub fn playback_args(mut self, args: Vec<String>) -> Self {
        self.config.playback_args = args;
        self
    }

    pub fn build(self) -> HubConfig {
        self.config
    }
}
