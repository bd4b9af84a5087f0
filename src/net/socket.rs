//! UDP transport for one RTP session.
//!
//! Binds the RTP port and the adjacent RTCP port (RTP + 1), joins multicast
//! groups when asked to, and grows the kernel receive buffer as observed
//! frame sizes grow.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use super::net_error::NetError;
use crate::config::PipelineConfig;
use crate::log::LogSink;
use crate::{sink_debug, sink_warn};

/// Socket read timeout of the ingest loop; keeps the loop responsive to
/// shutdown and periodic driving without spinning.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(10);

pub struct VideoSocket {
    rtp: UdpSocket,
    /// Bound but unread; reserves the RTCP half of the port pair.
    _rtcp: UdpSocket,
    rmem_limit: usize,
    rmem_current: usize,
}

impl VideoSocket {
    /// Bind `addr` for RTP and `addr.port() + 1` for RTCP. Multicast
    /// addresses (IPv4 or IPv6) are joined on the default interface.
    pub fn bind(addr: SocketAddr, config: &PipelineConfig) -> Result<Self, NetError> {
        let bind_ip: IpAddr = if addr.ip().is_multicast() {
            match addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            }
        } else {
            addr.ip()
        };

        // With an explicit port the pair is (port, port + 1). With port 0 the
        // kernel picks the RTP port and the RTCP bind may collide, so retry.
        let (rtp, rtcp) = {
            let mut attempt = 0;
            loop {
                let rtp = UdpSocket::bind(SocketAddr::new(bind_ip, addr.port()))?;
                let rtp_port = rtp.local_addr()?.port();
                match UdpSocket::bind(SocketAddr::new(bind_ip, rtp_port.wrapping_add(1))) {
                    Ok(rtcp) => break (rtp, rtcp),
                    Err(source) => {
                        attempt += 1;
                        if addr.port() != 0 || attempt >= 3 {
                            return Err(NetError::PortPair {
                                port: rtp_port,
                                source,
                            });
                        }
                    }
                }
            }
        };

        if addr.ip().is_multicast() {
            match addr.ip() {
                IpAddr::V4(group) => {
                    rtp.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
                }
                IpAddr::V6(group) => {
                    rtp.join_multicast_v6(&group, 0)?;
                }
            }
        }

        rtp.set_read_timeout(Some(RECV_TIMEOUT))?;

        Ok(Self {
            rtp,
            _rtcp: rtcp,
            rmem_limit: config.rmem_target,
            rmem_current: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.rtp.local_addr()
    }

    /// One blocking read bounded by [`RECV_TIMEOUT`]. `Ok(None)` is a tick
    /// with no data.
    pub fn recv_packet(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.rtp.recv_from(buf) {
            Ok((len, from)) => Ok(Some((len, from))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.rtp.send_to(buf, addr)
    }

    /// Grow the kernel receive buffer toward 1.1x the largest observed
    /// frame, capped by the configured target. Failure is logged, not fatal.
    pub fn grow_receive_buffer(&mut self, observed_frame: u64, logger: &Arc<dyn LogSink>) {
        let target = ((observed_frame.saturating_mul(11) / 10) as usize).min(self.rmem_limit);
        if target <= self.rmem_current {
            return;
        }
        match set_recv_buffer(&self.rtp, target) {
            Ok(()) => {
                sink_debug!(logger, "receive buffer grown to {target} bytes");
                self.rmem_current = target;
            }
            Err(e) => {
                sink_warn!(logger, "unable to grow receive buffer to {target} bytes: {e}");
                // don't retry every tick
                self.rmem_current = target;
            }
        }
    }
}

#[cfg(unix)]
fn set_recv_buffer(socket: &UdpSocket, bytes: usize) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let value = bytes as libc::c_int;
    // SAFETY: valid fd for the lifetime of the call, value outlives it.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_RCVBUF,
            std::ptr::from_ref(&value).cast(),
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn set_recv_buffer(_socket: &UdpSocket, _bytes: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "receive buffer sizing not supported on this platform",
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;

    fn localhost() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn binds_port_pair_and_times_out() {
        let cfg = PipelineConfig::default();
        let socket = VideoSocket::bind(localhost(), &cfg).unwrap();
        let mut buf = [0u8; 64];
        assert!(socket.recv_packet(&mut buf).unwrap().is_none());
    }

    #[test]
    fn loopback_roundtrip() {
        let cfg = PipelineConfig::default();
        let receiver = VideoSocket::bind(localhost(), &cfg).unwrap();
        let sender = VideoSocket::bind(localhost(), &cfg).unwrap();
        let addr = receiver.local_addr().unwrap();
        sender.send_to(b"ping", addr).unwrap();
        let mut buf = [0u8; 64];
        let mut got = None;
        for _ in 0..100 {
            if let Some((len, _)) = receiver.recv_packet(&mut buf).unwrap() {
                got = Some(len);
                break;
            }
        }
        assert_eq!(got, Some(4));
    }

    #[test]
    fn buffer_growth_is_capped_and_quiet() {
        let mut cfg = PipelineConfig::default();
        cfg.rmem_target = 256 * 1024;
        let mut socket = VideoSocket::bind(localhost(), &cfg).unwrap();
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        socket.grow_receive_buffer(10 * 1024 * 1024, &logger);
        assert!(socket.rmem_current <= 256 * 1024);
    }
}
