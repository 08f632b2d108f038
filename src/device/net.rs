//! Local network helpers.

use std::net::{IpAddr, UdpSocket};

/// Address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends no packets; it only makes the OS pick a
/// route, whose local address is returned. `None` without a usable route.
#[must_use]
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
