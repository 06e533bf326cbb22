//! TCP listener and per-connection tasks.
//!
//! The [`Switch`] aggregate owns the registry, the correlation table, and
//! the dispatcher; per-connection reader tasks share them through `Arc`.
//! Each accepted socket is classified once, registered, and read in its
//! own task until EOF or error, at which point its correlation entries
//! are purged.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use npsb_protocol::FrameBuffer;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::SwitchConfig;
use crate::correlation::PendingTable;
use crate::dispatcher::Dispatcher;
use crate::inject::Injector;
use crate::registry::{normalize_host, ConnectionHandle, ConnectionRegistry, Role};
use crate::SwitchResult;

/// The running switch: listener plus shared routing state.
pub struct Switch {
    config: SwitchConfig,
    registry: Arc<ConnectionRegistry>,
    pending: Arc<PendingTable>,
    dispatcher: Arc<Dispatcher>,
}

impl Switch {
    pub fn new(config: SwitchConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let pending = Arc::new(PendingTable::new());
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            pending.clone(),
            config.wire,
        ));
        Self {
            config,
            registry,
            pending,
            dispatcher,
        }
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    pub fn pending(&self) -> Arc<PendingTable> {
        self.pending.clone()
    }

    /// Bind the configured listener and serve until shutdown.
    pub async fn run(&self) -> SwitchResult<()> {
        let listener = TcpListener::bind(self.config.listener.addr()).await?;
        info!(addr = %listener.local_addr()?, "switch listening");
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> SwitchResult<()> {
        self.spawn_sweeper();
        Injector::new(
            self.registry.clone(),
            self.config.injection.clone(),
            self.config.wire,
        )
        .spawn();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept(stream, peer),
                    Err(e) => error!(error = %e, "accept failed"),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        // Stop accepting before tearing down live connections.
        drop(listener);
        self.registry.close_all().await;
        Ok(())
    }

    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "failed to set TCP_NODELAY");
        }

        let host = peer.ip().to_string();
        let role = self.registry.classify(&host, &self.config.routing);
        let id = format!("{}:{}", normalize_host(&host), peer.port());
        info!(connection = %id, role = %role, "peer connected");

        let (read_half, write_half) = stream.into_split();
        let handle = ConnectionHandle::new(id.clone(), write_half);
        self.registry.register(role, handle.clone());

        let registry = self.registry.clone();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            read_loop(read_half, role, &handle, &dispatcher).await;
            registry.deregister(role, &id);
            dispatcher.connection_closed(&id);
            info!(connection = %id, role = %role, "peer disconnected");
        });
    }

    fn spawn_sweeper(&self) {
        let ttl = Duration::from_secs(self.config.correlation.entry_ttl_secs);
        if ttl.is_zero() {
            return;
        }
        let interval = Duration::from_secs(self.config.correlation.sweep_interval_secs.max(1));
        let pending = self.pending.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await;
            loop {
                tick.tick().await;
                let expired = pending.sweep(ttl);
                if expired > 0 {
                    warn!(expired, "expired pending entries without a response");
                }
            }
        });
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    role: Role,
    handle: &ConnectionHandle,
    dispatcher: &Dispatcher,
) {
    let mut frames = FrameBuffer::new();
    let mut chunk = [0u8; 8192];
    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                frames.extend(&chunk[..n]);
                while let Some(frame) = frames.next_frame() {
                    dispatcher.dispatch(role, handle, &frame).await;
                }
            }
            Err(e) => {
                error!(connection = %handle.id(), error = %e, "socket read failed");
                break;
            }
        }
    }
    if frames.pending_bytes() > 0 {
        debug!(
            connection = %handle.id(),
            bytes = frames.pending_bytes(),
            "dropping partial frame on close"
        );
    }
}
