//! Per-connection orchestration: read exactly one framed request, parse it, hand
//! the batch to the dispatcher, write exactly one response, close.

use std::sync::Arc;

use engine::{Dispatcher, MemoryStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::{framing, xml_in, xml_out};

pub async fn handle_connection<C>(mut stream: C, dispatcher: Arc<Dispatcher<MemoryStore>>)
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let payload = match framing::read_request(&mut stream).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "framing error, closing connection");
            let _ = framing::write_response(&mut stream, format!("error: {e}\n").as_bytes()).await;
            return;
        }
    };

    let commands = match xml_in::parse_request(&payload) {
        Ok(commands) => commands,
        Err(message) => {
            warn!(%message, "request rejected at the XML layer");
            let _ = framing::write_response(&mut stream, xml_out::render_rejected(&message).as_bytes()).await;
            return;
        }
    };

    info!(batch_len = commands.len(), "dispatching batch");
    let results = dispatcher.execute_batch(commands).await;
    let response = xml_out::render_results(&results);
    if let Err(e) = framing::write_response(&mut stream, response.as_bytes()).await {
        warn!(error = %e, "failed to write response");
    }
}
