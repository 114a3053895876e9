// MIT License - Copyright (c) 2026 Peter Wright
// Control hub daemon

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::info;

use domo_hub::{ConsoleInterface, DeviceRegistry, DeviceType, Hub, HubConfig};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "domo-hub")]
#[command(about = "Home-automation control hub")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    hub: HubToml,
    #[serde(default)]
    alarm: AlarmToml,
    /// Device catalog, in declaration order. Order assigns the per-type slot
    /// ids, so it is part of the deployed contract with the field controller.
    #[serde(default)]
    devices: Vec<DeviceToml>,
}

#[derive(Debug, Deserialize)]
struct HubToml {
    #[serde(default = "default_bind_addr")]
    bind_addr: String,
    #[serde(default = "default_listen_port")]
    listen_port: u16,
    #[serde(default = "default_command_port")]
    command_port: u16,
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,
    #[serde(default = "default_audit_dir")]
    audit_dir: String,
}

impl Default for HubToml {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            listen_port: default_listen_port(),
            command_port: default_command_port(),
            queue_capacity: default_queue_capacity(),
            audit_dir: default_audit_dir(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}
fn default_listen_port() -> u16 {
    10008
}
fn default_command_port() -> u16 {
    10108
}
fn default_queue_capacity() -> usize {
    10
}
fn default_audit_dir() -> String {
    "audit".to_string()
}

#[derive(Debug, Deserialize)]
struct AlarmToml {
    #[serde(default = "default_playback_program")]
    program: String,
    #[serde(default = "default_playback_args")]
    args: Vec<String>,
}

impl Default for AlarmToml {
    fn default() -> Self {
        Self {
            program: default_playback_program(),
            args: default_playback_args(),
        }
    }
}

fn default_playback_program() -> String {
    "aplay".to_string()
}
fn default_playback_args() -> Vec<String> {
    vec!["-q".to_string(), "alarm.wav".to_string()]
}

#[derive(Debug, Deserialize)]
struct DeviceToml {
    name: String,
    #[serde(rename = "type")]
    device_type: String,
}

fn parse_device_type(s: &str) -> Result<DeviceType> {
    match DeviceType::from_name(s) {
        Some(device_type) => Ok(device_type),
        None => anyhow::bail!("Unknown device type: {s}"),
    }
}

fn build_registry(devices: &[DeviceToml]) -> Result<DeviceRegistry> {
    let declarations: Vec<(String, DeviceType)> = if devices.is_empty() {
        info!("No devices configured; using the built-in catalog");
        domo_hub::devices::default_declarations()
            .into_iter()
            .map(|(name, device_type)| (name.to_string(), device_type))
            .collect()
    } else {
        devices
            .iter()
            .map(|d| Ok((d.name.clone(), parse_device_type(&d.device_type)?)))
            .collect::<Result<_>>()?
    };
    DeviceRegistry::build(declarations).context("Invalid device catalog")
}

fn build_hub_config(config: &Config) -> HubConfig {
    HubConfig::builder()
        .bind_addr(&config.hub.bind_addr)
        .listen_port(config.hub.listen_port)
        .command_port(config.hub.command_port)
        .queue_capacity(config.hub.queue_capacity)
        .audit_dir(&config.hub.audit_dir)
        .playback_program(&config.alarm.program)
        .playback_args(config.alarm.args.clone())
        .build()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=domo_hub=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    let config: Config = if std::path::Path::new(&cli.config).exists() {
        let text =
            std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
        toml::from_str(&text).context("Failed to parse config file")?
    } else {
        info!("No config file at {}; using built-in defaults", cli.config);
        Config::default()
    };

    let registry = build_registry(&config.devices)?;
    info!("Device catalog: {} devices", registry.devices().len());

    let hub = Hub::new(build_hub_config(&config), registry);
    let console_registry = Arc::clone(hub.registry());
    let cancel = CancellationToken::new();

    let mut sigterm = signal(SignalKind::terminate())?;

    info!("Control hub running. SIGINT/SIGTERM to stop.");
    tokio::select! {
        res = hub.serve(
            move || ConsoleInterface::new(Arc::clone(&console_registry)),
            cancel.clone(),
        ) => {
            res.context("Accept loop failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
            cancel.cancel();
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            cancel.cancel();
        }
    }

    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_type() {
        assert_eq!(parse_device_type("Lamp").unwrap(), DeviceType::Lamp);
        assert_eq!(
            parse_device_type("sensorpresence").unwrap(),
            DeviceType::SensorPresence
        );
        assert!(parse_device_type("Dishwasher").is_err());
    }

    #[test]
    fn test_config_defaults_when_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.hub.listen_port, 10008);
        assert_eq!(config.hub.command_port, 10108);
        assert_eq!(config.hub.queue_capacity, 10);
        assert_eq!(config.alarm.program, "aplay");
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_config_parses_device_catalog() {
        let config: Config = toml::from_str(
            r#"
            [hub]
            listen_port = 4008

            [[devices]]
            name = "Front Door"
            type = "SensorOpening"

            [[devices]]
            name = "Hall Lamp"
            type = "Lamp"
            "#,
        )
        .unwrap();

        assert_eq!(config.hub.listen_port, 4008);
        let registry = build_registry(&config.devices).unwrap();
        assert_eq!(registry.devices().len(), 2);
        assert_eq!(
            registry.lookup(DeviceType::Lamp, 0).unwrap().name,
            "Hall Lamp"
        );
    }
}
