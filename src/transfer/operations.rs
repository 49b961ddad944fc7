//! Transfer operations
//!
//! Handles data channel setup for the PASV and PORT commands.

use log::info;
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use tokio::net::TcpListener;

use crate::error::TransferError;
use crate::transfer::DataMode;

/// Replaces the session's data mode with a fresh ephemeral listener on `local_ip`.
///
/// Any previous passive listener is closed before the new one is bound.
pub async fn setup_passive_mode(
    mode: &mut DataMode,
    local_ip: IpAddr,
) -> Result<SocketAddrV4, TransferError> {
    if mode.is_passive() {
        info!("Closing previous passive listener ({})", mode.describe());
    }
    mode.reset();

    let local_v4 = match local_ip {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(ip) => {
            return Err(TransferError::PassiveUnavailable(format!(
                "control connection is IPv6 ({})",
                ip
            )));
        }
    };

    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(local_v4), 0)).await?;
    let port = listener.local_addr()?.port();
    *mode = DataMode::Passive(listener);

    Ok(SocketAddrV4::new(local_v4, port))
}

/// Text of the 227 reply: `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
pub fn passive_reply_text(addr: SocketAddrV4) -> String {
    let [h1, h2, h3, h4] = addr.ip().octets();
    let port = addr.port();
    format!(
        "Entering Passive Mode ({},{},{},{},{},{})",
        h1,
        h2,
        h3,
        h4,
        port >> 8,
        port & 0xff
    )
}

/// Reads the data port from a PORT argument.
///
/// Only the last two comma-separated tokens are used; the host part is
/// ignored in favour of the control connection's peer address.
pub fn parse_port_argument(arg: &str) -> Result<u16, TransferError> {
    let invalid = || TransferError::InvalidPortArgument(arg.to_string());

    let mut tokens = arg.rsplit(',');
    let low = tokens.next().ok_or_else(invalid)?;
    let high = tokens.next().ok_or_else(invalid)?;

    let high: u8 = high.trim().parse().map_err(|_| invalid())?;
    let low: u8 = low.trim().parse().map_err(|_| invalid())?;

    Ok((u16::from(high) << 8) | u16::from(low))
}

/// Switches the session to active mode towards `peer_ip` on the port named by `arg`.
pub fn setup_active_mode(
    mode: &mut DataMode,
    peer_ip: IpAddr,
    arg: &str,
) -> Result<SocketAddr, TransferError> {
    let port = parse_port_argument(arg)?;
    let target = SocketAddr::new(peer_ip, port);
    *mode = DataMode::Active(target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn port_argument_uses_last_two_tokens() {
        assert_eq!(parse_port_argument("127,0,0,1,4,1").unwrap(), 1025);
        assert_eq!(parse_port_argument("10,1,2,3,255,255").unwrap(), 65535);
    }

    #[test]
    fn port_argument_must_be_numeric() {
        assert!(parse_port_argument("127,0,0,1,four,1").is_err());
        assert!(parse_port_argument("1025").is_err());
        assert!(parse_port_argument("127,0,0,1,4,256").is_err());
    }

    #[test]
    fn active_mode_targets_peer_address() {
        let mut mode = DataMode::None;
        let peer = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        let target = setup_active_mode(&mut mode, peer, "10,0,0,1,4,1").unwrap();
        assert_eq!(target, SocketAddr::new(peer, 1025));
        assert!(matches!(mode, DataMode::Active(addr) if addr == target));
    }

    #[test]
    fn passive_reply_splits_port_into_bytes() {
        let addr = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 1025);
        assert_eq!(
            passive_reply_text(addr),
            "Entering Passive Mode (127,0,0,1,4,1)"
        );
    }

    #[tokio::test]
    async fn second_pasv_closes_first_listener() {
        let mut mode = DataMode::None;
        let local = IpAddr::V4(Ipv4Addr::LOCALHOST);

        let first = setup_passive_mode(&mut mode, local).await.unwrap();
        let second = setup_passive_mode(&mut mode, local).await.unwrap();

        assert_ne!(first.port(), second.port());
        assert!(tokio::net::TcpStream::connect(first).await.is_err());
        assert!(mode.is_passive());
    }

    #[tokio::test]
    async fn passive_mode_requires_ipv4() {
        let mut mode = DataMode::None;
        let result = setup_passive_mode(&mut mode, IpAddr::V6(std::net::Ipv6Addr::LOCALHOST)).await;
        assert!(matches!(result, Err(TransferError::PassiveUnavailable(_))));
    }
}
