//! Operator injection path.
//!
//! A test affordance: `SIGUSR1`, or the appearance of the configured
//! trigger file, synthesizes one sample `0100` and writes it to the first
//! registered acquirer. Failures are logged and never fatal.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use npsb_protocol::{encode_frame, MessageBuilder, WireConfig};
use tracing::{error, info, warn};

use crate::config::InjectionConfig;
use crate::netmgmt;
use crate::registry::ConnectionRegistry;

/// Synthesizes sample financial requests on operator demand.
pub struct Injector {
    registry: Arc<ConnectionRegistry>,
    config: InjectionConfig,
    wire: WireConfig,
    stan: AtomicU32,
}

impl Injector {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        config: InjectionConfig,
        wire: WireConfig,
    ) -> Self {
        Self {
            registry,
            config,
            wire,
            stan: AtomicU32::new(1),
        }
    }

    /// Spawn the signal listener and the trigger-file poller.
    pub fn spawn(self) {
        let injector = Arc::new(self);

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let injector = injector.clone();
            tokio::spawn(async move {
                let mut usr1 = match signal(SignalKind::user_defined1()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(error = %e, "SIGUSR1 handler unavailable, injection by signal disabled");
                        return;
                    }
                };
                while usr1.recv().await.is_some() {
                    injector.inject().await;
                }
            });
        }

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tick.tick().await;
                let path = injector.config.trigger_path.clone();
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    continue;
                }
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "cannot remove trigger file");
                    continue;
                }
                info!(path = %path.display(), "injection trigger observed");
                injector.inject().await;
            }
        });
    }

    /// Build and send one sample `0100` to the first registered acquirer.
    pub async fn inject(&self) {
        let Some(acquirer) = self.registry.first_acquirer() else {
            warn!("no acquirer connected, skipping injection");
            return;
        };

        let stan = self.stan.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        let sample = &self.config.sample;
        let message = MessageBuilder::new("0100")
            .field(2, sample.pan.clone())
            .field(3, "400000")
            .field(4, sample.amount.clone())
            .field(7, netmgmt::now_mmddhhmmss())
            .field(11, format!("{stan:06}"))
            .field(37, sample.rrn.clone())
            .field(103, sample.account.clone())
            .build();
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "configured sample request is invalid");
                return;
            }
        };

        let frame = message
            .encode(&self.wire)
            .and_then(|bytes| encode_frame(&bytes));
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "sample request encode failed");
                return;
            }
        };

        match acquirer.send_frame(&frame).await {
            Ok(()) => {
                info!(connection = %acquirer.id(), stan = %format!("{stan:06}"), "sample request injected");
            }
            Err(e) => {
                error!(connection = %acquirer.id(), error = %e, "sample request write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConnectionHandle, Role};
    use npsb_protocol::Message;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn injects_one_framed_sample_request() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (client, mut observer) = tokio::io::duplex(4096);
        registry.register(
            Role::Acquirer,
            ConnectionHandle::new("127.0.0.1:41000", client),
        );

        let wire = WireConfig::default();
        let injector = Injector::new(registry, InjectionConfig::default(), wire);
        injector.inject().await;

        let mut len = [0u8; 2];
        observer.read_exact(&mut len).await.unwrap();
        let mut payload = vec![0u8; u16::from_be_bytes(len) as usize];
        observer.read_exact(&mut payload).await.unwrap();

        let message = Message::decode(&payload, &wire).unwrap();
        assert_eq!(message.mti(), "0100");
        assert_eq!(message.field_text(2), Some("0000950000000000"));
        assert_eq!(message.field_text(11), Some("000001"));
        assert_eq!(message.field_text(103), Some("2001070006085"));
    }

    #[tokio::test]
    async fn injection_without_an_acquirer_is_a_noop() {
        let injector = Injector::new(
            Arc::new(ConnectionRegistry::new()),
            InjectionConfig::default(),
            WireConfig::default(),
        );
        injector.inject().await;
    }
}
