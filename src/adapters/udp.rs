//! UDP multicast transport for KNX/IP routing.
//!
//! Binds `0.0.0.0:<port>` with `SO_REUSEADDR` (so other KNX/IP software on
//! the same host can share the port), joins the routing group on the
//! default interface and switches the socket to non-blocking mode. Our own
//! multicast sends are not looped back.
//!
//! Works on the host and on ESP-IDF (lwIP sockets via `std`).

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use log::{info, warn};
use socket2::{Domain, Protocol, Socket, Type};

use crate::app::ports::{DatagramTransport, TransportError};
use crate::config::EngineConfig;

pub struct UdpMulticastTransport {
    socket: UdpSocket,
    group: SocketAddrV4,
}

impl UdpMulticastTransport {
    /// Bind and join the group named in `config`.
    pub fn bind(config: &EngineConfig) -> std::io::Result<Self> {
        let [a, b, c, d] = config.multicast_group;
        let group_ip = Ipv4Addr::new(a, b, c, d);
        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.multicast_port);

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&bind_addr.into())?;
        socket.join_multicast_v4(&group_ip, &Ipv4Addr::UNSPECIFIED)?;
        socket.set_multicast_loop_v4(false)?;
        socket.set_nonblocking(true)?;

        info!("UdpMulticastTransport: joined {group_ip}:{}", config.multicast_port);
        Ok(Self {
            socket: socket.into(),
            group: SocketAddrV4::new(group_ip, config.multicast_port),
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|a| a.port())
    }
}

impl DatagramTransport for UdpMulticastTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, TransportError> {
        match self.socket.recv(buf) {
            Ok(len) => Ok(Some(len)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                warn!("UdpMulticastTransport: recv failed: {e}");
                Err(TransportError::IoError)
            }
        }
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        match self.socket.send_to(datagram, self.group) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotConnected || e.kind() == ErrorKind::NetworkUnreachable => {
                Err(TransportError::NotConnected)
            }
            Err(e) => {
                warn!("UdpMulticastTransport: send failed: {e}");
                Err(TransportError::IoError)
            }
        }
    }
}
