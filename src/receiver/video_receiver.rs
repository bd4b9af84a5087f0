use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::log::LogSink;
use crate::net::VideoSocket;
use crate::participant::ParticipantRegistry;
use crate::rtp::RtpPacket;
use crate::{sink_debug, sink_info, sink_warn};

/// Owns the ingest thread of one RTP session.
///
/// The thread blocks on the socket with a short timeout, dispatches parsed
/// packets into per-SSRC rings and drives every participant's pipeline once
/// per tick. It never blocks on downstream state.
pub struct VideoReceiver {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    registry: Arc<Mutex<ParticipantRegistry>>,
    logger: Arc<dyn LogSink>,
}

impl VideoReceiver {
    #[allow(clippy::expect_used)]
    pub fn start(
        socket: VideoSocket,
        registry: ParticipantRegistry,
        logger: Arc<dyn LogSink>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let registry = Arc::new(Mutex::new(registry));
        let handle = {
            let running = Arc::clone(&running);
            let registry = Arc::clone(&registry);
            let logger = Arc::clone(&logger);
            thread::Builder::new()
                .name("rtp-ingest".into())
                .spawn(move || ingest_loop(socket, registry, running, logger))
                .expect("spawn rtp-ingest")
        };
        sink_info!(logger, "receiver started");
        Self {
            running,
            handle: Some(handle),
            registry,
            logger,
        }
    }

    pub fn registry(&self) -> Arc<Mutex<ParticipantRegistry>> {
        Arc::clone(&self.registry)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Ok(mut registry) = self.registry.lock() {
            registry.shutdown();
        }
        sink_info!(self.logger, "receiver stopped");
    }
}

impl Drop for VideoReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ingest_loop(
    mut socket: VideoSocket,
    registry: Arc<Mutex<ParticipantRegistry>>,
    running: Arc<AtomicBool>,
    logger: Arc<dyn LogSink>,
) {
    let mut buf = vec![0u8; 65536];
    while running.load(Ordering::Relaxed) {
        match socket.recv_packet(&mut buf) {
            Ok(Some((len, _from))) => match RtpPacket::decode(&buf[..len]) {
                Ok(packet) => {
                    if let Ok(mut registry) = registry.lock() {
                        registry.dispatch(packet, Instant::now());
                    }
                }
                Err(e) => {
                    sink_debug!(logger, "malformed RTP packet dropped: {e}");
                }
            },
            Ok(None) => {} // timeout tick
            Err(e) => {
                sink_warn!(logger, "socket receive error: {e}");
            }
        }

        let now = Instant::now();
        let observed = if let Ok(mut registry) = registry.lock() {
            registry.drive_all(now);
            registry.max_frame_size()
        } else {
            0
        };
        if observed > 0 {
            socket.grow_receive_buffer(observed, &logger);
        }
    }
}
