use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

const LISTEN_BACKLOG: i32 = 1024;

/// Binds the relay's TCP listener.
/// A host of `*` listens on every interface, preferring an IPv6 dual-stack socket.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    if host == "*" {
        return create_wildcard_listener(port);
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Attempting to bind relay to {}...", addr);

    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    Ok((local_addr, listener))
}

fn create_wildcard_listener(port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    let ipv6_addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    tracing::info!(
        "Attempting to bind relay to {}... (IPv6 + IPv4 dual-stack)",
        ipv6_addr
    );

    match bind_socket(Domain::IPV6, ipv6_addr) {
        Ok(listener) => return Ok(listener),
        Err(e) => {
            tracing::warn!("Failed to bind IPv6 listener: {}. Attempting IPv4 only.", e);
        }
    }

    let ipv4_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    tracing::info!("Attempting to bind relay to {}... (IPv4)", ipv4_addr);

    bind_socket(Domain::IPV4, ipv4_addr)
}

fn bind_socket(domain: Domain, addr: SocketAddr) -> std::io::Result<(SocketAddr, TcpListener)> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if domain == Domain::IPV6 {
        // Some systems refuse dual-stack; an IPv6-only socket is still usable.
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!(
                "Failed to set dual-stack mode for IPv6 socket: {}. Continuing anyway.",
                e
            );
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    let listener = TcpListener::from_std(std_listener)?;
    let local_addr = listener.local_addr()?;

    Ok((local_addr, listener))
}
