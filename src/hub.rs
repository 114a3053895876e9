// MIT License - Copyright (c) 2026 Peter Wright

//! Top-level accept loop.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::HubConfig;
use crate::devices::DeviceRegistry;
use crate::error::Result;
use crate::operator::OperatorInterface;
use crate::session::run_session;

/// The control hub: a shared read-only device registry plus an accept loop
/// that runs one [session](crate::session) per inbound connection.
pub struct Hub {
    config: HubConfig,
    registry: Arc<DeviceRegistry>,
}

impl Hub {
    pub fn new(config: HubConfig, registry: DeviceRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Bind the primary listener and serve sessions until `cancel` fires.
    ///
    /// `make_interface` produces one operator interface per session.
    pub async fn serve<F, I>(&self, make_interface: F, cancel: CancellationToken) -> Result<()>
    where
        F: Fn() -> I,
        I: OperatorInterface,
    {
        let listener =
            TcpListener::bind((self.config.bind_addr.as_str(), self.config.listen_port)).await?;
        self.serve_on(listener, make_interface, cancel).await
    }

    /// Serve sessions on an already-bound listener.
    ///
    /// A failed session is logged and forgotten; the loop keeps accepting.
    /// There is no reconnection to a dropped field controller; it simply
    /// dials back in and gets a fresh session.
    pub async fn serve_on<F, I>(
        &self,
        listener: TcpListener,
        make_interface: F,
        cancel: CancellationToken,
    ) -> Result<()>
    where
        F: Fn() -> I,
        I: OperatorInterface,
    {
        info!(
            "Waiting for field controllers on {}",
            listener.local_addr()?
        );

        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Accept loop stopping");
                    return Ok(());
                }
                accepted = listener.accept() => accepted?,
            };

            info!("Accepted connection from {peer}");
            let config = self.config.clone();
            let registry = Arc::clone(&self.registry);
            let interface = make_interface();
            tokio::spawn(async move {
                match run_session(&config, registry, stream, peer, interface).await {
                    Ok(()) => info!("Session with {peer} ended"),
                    Err(e) => error!("Session with {peer} failed: {e}"),
                }
            });
        }
    }
}
