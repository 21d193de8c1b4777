use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::trace;

use dnsprobe_common::record::{Exchange, QueryError};
use dnsprobe_common::scanning::QueryDispatcher;
use dnsprobe_protocols::dns::{self, DNS_PORT, MAX_UDP_PAYLOAD, ResponseError};

/// Sends plain DNS queries over UDP, one socket per exchange.
#[derive(Debug, Clone)]
pub struct UdpDispatcher {
    port: u16,
}

impl Default for UdpDispatcher {
    fn default() -> Self {
        Self { port: DNS_PORT }
    }
}

impl UdpDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets `port` instead of 53.
    pub fn with_port(port: u16) -> Self {
        Self { port }
    }

    async fn round_trip(
        &self,
        target: IpAddr,
        packet: &[u8],
        id: u16,
    ) -> Result<Vec<String>, QueryError> {
        let socket: UdpSocket = UdpSocket::bind(local_bind_addr(&target)).await?;
        socket.connect(SocketAddr::new(target, self.port)).await?;
        socket.send(packet).await?;

        let mut buffer: Vec<u8> = vec![0u8; MAX_UDP_PAYLOAD];
        loop {
            let len: usize = socket.recv(&mut buffer).await?;
            match dns::parse_answers(&buffer[..len], id) {
                Ok(answers) => return Ok(answers),
                Err(e @ ResponseError::IdMismatch { .. }) => {
                    trace!("Ignoring stray reply from {target}: {e}");
                }
                Err(e) => return Err(QueryError::Malformed(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl QueryDispatcher for UdpDispatcher {
    async fn exchange(
        &self,
        target: IpAddr,
        domain: &str,
        wait: Duration,
    ) -> Result<Exchange, QueryError> {
        let id: u16 = rand::random();
        let packet: Vec<u8> =
            dns::create_a_packet(domain, id).map_err(|e| QueryError::InvalidQuery(e.to_string()))?;

        match timeout(wait, self.round_trip(target, &packet, id)).await {
            Ok(answers) => Ok(Exchange::new(dns::render_question(domain), answers?)),
            Err(_elapsed) => Err(QueryError::Timeout(wait)),
        }
    }
}

fn local_bind_addr(target: &IpAddr) -> SocketAddr {
    match target {
        IpAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        IpAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
