use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

use crate::resolver::Resolver;

const MAX_CONCURRENT_QUERIES: usize = 512;
const UDP_BUF_SIZE: usize = 4096;

/// Runs the UDP DNS listener until a shutdown signal arrives. Each datagram
/// is handled on its own spawned task, bounded by a semaphore so a burst of
/// queries can't grow the task count without limit.
pub async fn run_udp_server(
    bind_addr: SocketAddr,
    resolver: Arc<Resolver>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
    info!(%bind_addr, "DNS server listening");

    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_QUERIES));
    let mut buf = vec![0u8; UDP_BUF_SIZE];

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("UDP server received shutdown signal");
                break;
            }

            result = socket.recv_from(&mut buf) => {
                let (len, src) = match result {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(error = %e, "failed to read UDP datagram");
                        continue;
                    }
                };

                let permit = match permits.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!(%src, "max concurrent queries reached, dropping query");
                        continue;
                    }
                };

                let query = buf[..len].to_vec();
                let socket = socket.clone();
                let resolver = resolver.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Some(response) = resolver.resolve(&query).await {
                        if let Err(e) = socket.send_to(&response, src).await {
                            error!(%src, error = %e, "failed to send UDP response");
                        }
                    }
                });
            }
        }
    }

    Ok(())
}
