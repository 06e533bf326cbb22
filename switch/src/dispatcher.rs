//! Message routing.
//!
//! One dispatch per framed message, by peer role and MTI. Financial
//! requests are forwarded to an issuer as the original frame bytes, not
//! a re-encoded copy; correlated responses come back the same way.
//! Codec failures drop the frame and keep the connection alive.

use std::sync::Arc;

use npsb_protocol::{encode_frame, Message, MessageBuilder, WireConfig};
use tracing::{debug, error, info, warn};

use crate::correlation::PendingTable;
use crate::netmgmt;
use crate::registry::{ConnectionHandle, ConnectionRegistry, Role};

/// Issuer MTIs that complete a pending financial request.
const ISSUER_RESPONSE_MTIS: [&str; 3] = ["0110", "0210", "0410"];

/// Routes parsed messages between the registry, the correlation table,
/// and the network-management responder.
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    pending: Arc<PendingTable>,
    wire: WireConfig,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        pending: Arc<PendingTable>,
        wire: WireConfig,
    ) -> Self {
        Self {
            registry,
            pending,
            wire,
        }
    }

    /// Handle one de-framed message payload from `conn`.
    pub async fn dispatch(&self, role: Role, conn: &ConnectionHandle, payload: &[u8]) {
        let message = match Message::decode(payload, &self.wire) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "dropping unparseable frame");
                return;
            }
        };
        debug!(
            connection = %conn.id(),
            role = %role,
            mti = message.mti(),
            bytes = payload.len(),
            "frame received"
        );

        match role {
            Role::Acquirer => self.dispatch_acquirer(conn, &message, payload).await,
            Role::Issuer => self.dispatch_issuer(conn, &message, payload).await,
            Role::Unknown => {
                warn!(connection = %conn.id(), mti = message.mti(), "dropping frame from unclassified peer");
            }
        }
    }

    /// Purge correlation state owned by a closed connection.
    pub fn connection_closed(&self, connection_id: &str) {
        let purged = self.pending.purge_connection(connection_id);
        if purged > 0 {
            info!(connection = %connection_id, purged, "purged pending entries for closed connection");
        }
    }

    async fn dispatch_acquirer(&self, conn: &ConnectionHandle, message: &Message, payload: &[u8]) {
        let mti = message.mti();
        if netmgmt::is_network_management(mti) {
            self.reply_network_management(conn, message).await;
        } else if mti == "0100" {
            self.forward_request(conn, message, payload).await;
        } else {
            warn!(connection = %conn.id(), mti, "unsupported MTI from acquirer, dropping");
        }
    }

    async fn dispatch_issuer(&self, conn: &ConnectionHandle, message: &Message, payload: &[u8]) {
        let mti = message.mti();
        if netmgmt::is_network_management(mti) {
            self.reply_network_management(conn, message).await;
            return;
        }
        if !ISSUER_RESPONSE_MTIS.contains(&mti) {
            warn!(connection = %conn.id(), mti, "unsupported MTI from issuer, dropping");
            return;
        }

        let Some(stan) = message.field_text(11) else {
            warn!(connection = %conn.id(), mti, "issuer response without STAN, dropping");
            return;
        };
        let Some(entry) = self.pending.claim(stan) else {
            warn!(connection = %conn.id(), stan, "no pending request for issuer response, dropping");
            return;
        };

        let frame = match encode_frame(payload) {
            Ok(frame) => frame,
            Err(e) => {
                error!(stan, error = %e, "response frame too large to relay");
                return;
            }
        };
        match entry.acquirer.send_frame(&frame).await {
            Ok(()) => debug!(
                from = %conn.id(),
                to = %entry.connection_id,
                stan,
                elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
                "response relayed"
            ),
            Err(e) => {
                error!(to = %entry.connection_id, stan, error = %e, "response write failed");
            }
        }
    }

    /// Forward a `0100` to the first available issuer, or answer with a
    /// synthetic `0110` when routing is impossible.
    async fn forward_request(&self, conn: &ConnectionHandle, message: &Message, payload: &[u8]) {
        let Some(stan) = message.field_text(11).map(str::to_string) else {
            warn!(connection = %conn.id(), "financial request without STAN");
            self.reject(conn, None, "96").await;
            return;
        };

        let Some(issuer) = self.registry.first_issuer() else {
            warn!(connection = %conn.id(), stan = %stan, "no issuer available");
            self.reject(conn, Some(&stan), "91").await;
            return;
        };

        self.pending.insert(stan.clone(), conn.clone());

        let frame = match encode_frame(payload) {
            Ok(frame) => frame,
            Err(e) => {
                // Unreachable for payloads that arrived u16-framed, but
                // the entry must not outlive a request that never left.
                self.pending.claim(&stan);
                error!(stan = %stan, error = %e, "request frame too large to forward");
                return;
            }
        };
        // A write failure leaves the entry in place; the acquirer times
        // out on its side.
        match issuer.send_frame(&frame).await {
            Ok(()) => debug!(
                from = %conn.id(),
                to = %issuer.id(),
                stan = %stan,
                bytes = frame.len(),
                "request forwarded"
            ),
            Err(e) => {
                error!(to = %issuer.id(), stan = %stan, error = %e, "forward to issuer failed");
            }
        }
    }

    async fn reply_network_management(&self, conn: &ConnectionHandle, request: &Message) {
        match netmgmt::build_response(request) {
            Ok(response) => self.send_message(conn, &response).await,
            Err(e) => {
                warn!(connection = %conn.id(), mti = request.mti(), error = %e, "cannot answer network-management request");
            }
        }
    }

    /// Synthesize a `0110` rejection on the acquirer socket.
    async fn reject(&self, conn: &ConnectionHandle, stan: Option<&str>, code: &str) {
        let response = MessageBuilder::new("0110")
            .field(7, netmgmt::now_mmddhhmmss())
            .field(11, stan.unwrap_or("000000"))
            .field(39, code)
            .build();
        match response {
            Ok(response) => self.send_message(conn, &response).await,
            Err(e) => error!(error = %e, "failed to build rejection response"),
        }
    }

    async fn send_message(&self, conn: &ConnectionHandle, message: &Message) {
        let bytes = match message.encode(&self.wire) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(mti = message.mti(), error = %e, "response encode failed");
                return;
            }
        };
        let frame = match encode_frame(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                error!(mti = message.mti(), error = %e, "response frame failed");
                return;
            }
        };
        if let Err(e) = conn.send_frame(&frame).await {
            error!(connection = %conn.id(), mti = message.mti(), error = %e, "response write failed");
        } else {
            debug!(connection = %conn.id(), mti = message.mti(), "response sent");
        }
    }
}
