//! Outbound side: fragments coded frames and sends them to every remote
//! participant of the session.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::fragmenter::Fragmenter;
use super::transmit_error::TransmitError;
use crate::config::PipelineConfig;
use crate::log::LogSink;
use crate::video::VideoDesc;
use crate::{sink_debug, sink_error};

const CHANNEL_TIMEOUT: Duration = Duration::from_millis(100);

/// One coded frame queued for transmission.
#[derive(Debug)]
pub struct OutgoingFrame {
    pub desc: VideoDesc,
    /// One coded buffer per substream.
    pub substreams: Vec<Vec<u8>>,
    pub timestamp: u32,
}

/// Fragments frames and fans packets out to the destination list.
pub struct Transmitter {
    socket: UdpSocket,
    destinations: Vec<SocketAddr>,
    fragmenter: Fragmenter,
    ssrc: u32,
    logger: Arc<dyn LogSink>,
}

impl Transmitter {
    pub fn new(
        destinations: Vec<SocketAddr>,
        config: &PipelineConfig,
        logger: Arc<dyn LogSink>,
    ) -> Result<Self, TransmitError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket,
            destinations,
            fragmenter: Fragmenter::new(config),
            ssrc: rand::random::<u32>(),
            logger,
        })
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn add_destination(&mut self, addr: SocketAddr) {
        self.destinations.push(addr);
    }

    /// Fragment and send one frame. Returns the number of packets emitted
    /// per destination.
    pub fn send_frame(&mut self, frame: &OutgoingFrame) -> Result<usize, TransmitError> {
        let packets = self.fragmenter.fragment_frame(
            frame.desc,
            &frame.substreams,
            frame.timestamp,
            self.ssrc,
        )?;
        for destination in &self.destinations {
            for packet in &packets {
                self.socket.send_to(&packet.encode(), destination)?;
            }
        }
        sink_debug!(
            self.logger,
            "sent frame ts={} in {} packets to {} destination(s)",
            frame.timestamp,
            packets.len(),
            self.destinations.len()
        );
        Ok(packets.len())
    }
}

/// Dedicated sender thread consuming frames from a channel, in the same
/// shape as the receive-side workers.
#[allow(clippy::expect_used)]
pub fn spawn_transmit_worker(
    mut transmitter: Transmitter,
    frame_rx: Receiver<OutgoingFrame>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("rtp-transmit".into())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                match frame_rx.recv_timeout(CHANNEL_TIMEOUT) {
                    Ok(frame) => {
                        if let Err(e) = transmitter.send_frame(&frame) {
                            sink_error!(transmitter.logger, "frame transmission failed: {e}");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })
        .expect("spawn rtp-transmit")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::video::{Codec, Fps, Interlacing};

    #[test]
    fn sends_to_every_destination() {
        let logger: Arc<dyn LogSink> = Arc::new(NoopLogSink);
        let sink_a = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sink_b = UdpSocket::bind("127.0.0.1:0").unwrap();
        sink_a
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        sink_b
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();

        let mut tx = Transmitter::new(
            vec![sink_a.local_addr().unwrap(), sink_b.local_addr().unwrap()],
            &PipelineConfig::default(),
            logger,
        )
        .unwrap();

        let frame = OutgoingFrame {
            desc: VideoDesc::new(16, 2, Codec::Uyvy, Interlacing::Progressive, Fps::whole(30)),
            substreams: vec![vec![9u8; 64]],
            timestamp: 1234,
        };
        let count = tx.send_frame(&frame).unwrap();
        assert!(count >= 1);

        let mut buf = [0u8; 2048];
        assert!(sink_a.recv_from(&mut buf).is_ok());
        assert!(sink_b.recv_from(&mut buf).is_ok());
    }
}
