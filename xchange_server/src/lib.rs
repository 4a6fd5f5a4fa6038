pub mod connection;
pub mod error;
pub mod framing;
pub mod xml_in;
pub mod xml_out;

use std::sync::Arc;

use engine::{Dispatcher, Engine, MemoryStore};
use tokio::net::TcpListener;
use tracing::info;

pub fn new_dispatcher() -> Arc<Dispatcher<MemoryStore>> {
    Arc::new(Dispatcher::new(Engine::new(Arc::new(MemoryStore::new()))))
}

/// Runs the accept loop: one `tokio::spawn`ed task per connection, each reading
/// exactly one framed request and writing exactly one response, per §5.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher<MemoryStore>>) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let dispatcher = Arc::clone(&dispatcher);
        info!(%peer, "connection accepted");
        tokio::spawn(async move {
            connection::handle_connection(stream, dispatcher).await;
        });
    }
}
