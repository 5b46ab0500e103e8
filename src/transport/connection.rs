//! # Connection
//!
//! One TCP link to a game or login server.
//!
//! ## Threading
//! `connect` spawns a receive task that owns the read half of the socket. The
//! task reads into a `BytesMut`, runs one extraction pass under the
//! reassembler mutex, and only then issues the next read, so extraction
//! passes never overlap. Completed frames go onto an unbounded MPSC queue.
//!
//! [`Connection::update`] is the single consumer: call it once per tick on
//! the application thread. Inbound filters and handlers run there, never on
//! the receive task. [`FrameInjector`] clones are additional producers for
//! frames synthesized outside the socket.
//!
//! Sends await the socket write on the calling task.
//!
//! ## Teardown
//! Any read/write error, a zero-byte read, or a framing violation tears the
//! link down. Teardown takes the reassembler mutex, so it waits for an
//! in-flight extraction pass, and the disconnect notice is queued behind
//! every frame extracted before it.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ClientConfig, NetworkConfig, TransportConfig};
use crate::core::frame::Frame;
use crate::core::length_table::{FrameLength, LengthTable};
use crate::core::reassembly::FrameReassembler;
use crate::core::writer::FrameWriter;
use crate::error::constants::{ERR_NO_ADDRESS, ERR_REMOTE_CLOSED};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::PacketHandler;
use crate::protocol::filter::FilterChain;
use crate::utils::coalescer::OutboundCoalescer;
use crate::utils::compression::{Decompressor, Huffman, StreamInflater};
use crate::utils::logging::{log_packet, Direction};
use crate::utils::metrics::LinkStatistics;
use crate::utils::segment_pool::SegmentPool;

/// `client_ip` when the local address is unknown or not IPv4 (127.0.0.1).
pub const LOOPBACK_CLIENT_IP: u32 = 0x0100_007F;

/// Why a link went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Local `disconnect()` call.
    Requested,
    /// The server closed the stream (zero-byte read).
    RemoteClosed,
    /// Socket error on receive or send.
    LinkFailure {
        kind: io::ErrorKind,
        code: Option<i32>,
    },
    /// Framing violation or undecodable compressed data.
    Malformed(String),
}

impl DisconnectReason {
    pub fn from_io(error: &io::Error) -> Self {
        DisconnectReason::LinkFailure {
            kind: error.kind(),
            code: error.raw_os_error(),
        }
    }

    /// OS error code of a socket failure.
    pub fn error_code(&self) -> Option<i32> {
        match self {
            DisconnectReason::LinkFailure { code, .. } => *code,
            _ => None,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => f.write_str("disconnect requested"),
            DisconnectReason::RemoteClosed => f.write_str(ERR_REMOTE_CLOSED),
            DisconnectReason::LinkFailure { kind, code: Some(code) } => {
                write!(f, "socket error {code} ({kind})")
            }
            DisconnectReason::LinkFailure { kind, code: None } => write!(f, "socket error ({kind})"),
            DisconnectReason::Malformed(detail) => write!(f, "malformed stream: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Items on the inbound queue.
#[derive(Debug)]
pub(crate) enum Inbound {
    Frame(Frame),
    Disconnected {
        generation: u64,
        reason: DisconnectReason,
    },
}

/// State shared between the connection and its receive task.
struct Link {
    name: String,
    reassembler: Mutex<Option<FrameReassembler>>,
    inbound: mpsc::UnboundedSender<Inbound>,
    stats: Arc<LinkStatistics>,
    state: AtomicU8,
    generation: AtomicU64,
    log_packets: bool,
    redacted: Vec<u8>,
}

impl Link {
    fn reassembler(&self) -> MutexGuard<'_, Option<FrameReassembler>> {
        self.reassembler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run one extraction pass. Returns `false` once the link is down.
    fn ingest(&self, generation: u64, data: &[u8]) -> bool {
        let mut slot = self.reassembler();
        if self.current_generation() != generation {
            return false;
        }
        let Some(reassembler) = slot.as_mut() else {
            return false;
        };

        // frames ahead of a bad header still go out before the notice
        let result = reassembler.feed(data).and_then(|()| loop {
            match reassembler.next_frame() {
                Ok(Some(frame)) => {
                    self.stats.packet_received();
                    if self.log_packets {
                        log_packet(Direction::ServerToClient, frame.as_bytes(), &self.redacted);
                    }
                    let _ = self.inbound.send(Inbound::Frame(frame));
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(connection = %self.name, error = %e, "Dropping link on framing error");
                self.shut(&mut slot, generation, DisconnectReason::Malformed(e.to_string()));
                false
            }
        }
    }

    /// Tear the link down if `generation` is still the live one.
    fn teardown(&self, generation: u64, reason: DisconnectReason) -> bool {
        let mut slot = self.reassembler();
        if self.current_generation() != generation {
            return false;
        }
        self.shut(&mut slot, generation, reason)
    }

    fn shut(
        &self,
        slot: &mut Option<FrameReassembler>,
        generation: u64,
        reason: DisconnectReason,
    ) -> bool {
        if slot.take().is_none() {
            return false;
        }
        self.set_state(ConnectionState::Disconnected);
        let _ = self.inbound.send(Inbound::Disconnected { generation, reason });
        true
    }
}

async fn receive_loop(
    link: Arc<Link>,
    mut reader: OwnedReadHalf,
    cancel: CancellationToken,
    generation: u64,
    buffer_size: usize,
) {
    let mut buffer = BytesMut::with_capacity(buffer_size);

    loop {
        buffer.clear();
        buffer.reserve(buffer_size);

        let read = tokio::select! {
            _ = cancel.cancelled() => return,
            read = reader.read_buf(&mut buffer) => read,
        };

        match read {
            Ok(0) => {
                debug!(connection = %link.name, "{}", ERR_REMOTE_CLOSED);
                link.teardown(generation, DisconnectReason::RemoteClosed);
                return;
            }
            Ok(n) => {
                link.stats.bytes_received(n);
                if !link.ingest(generation, &buffer[..n]) {
                    return;
                }
            }
            Err(e) => {
                if cancel.is_cancelled() {
                    return;
                }
                warn!(connection = %link.name, error = %e, "Receive failed");
                link.teardown(generation, DisconnectReason::from_io(&e));
                return;
            }
        }
    }
}

/// Resolve `host` to one socket address.
///
/// IP literals are used as-is. Names go through the system resolver and the
/// last address returned wins.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| ProtocolError::Resolve(format!("{host}: {e}")))?;

    addrs
        .last()
        .ok_or_else(|| ProtocolError::Resolve(format!("{host}: {ERR_NO_ADDRESS}")))
}

/// Producer handle that queues frames as if they had been received.
///
/// Injected frames skip the inbound filters and the ring buffer.
#[derive(Clone)]
pub struct FrameInjector {
    inbound: mpsc::UnboundedSender<Inbound>,
    lengths: Arc<dyn LengthTable>,
    stats: Arc<LinkStatistics>,
}

impl FrameInjector {
    pub fn inject(&self, data: Vec<u8>) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let frame = Frame::injected(data, &*self.lengths);
        self.inbound
            .send(Inbound::Frame(frame))
            .map_err(|_| ProtocolError::NotConnected)?;
        self.stats.packet_received();
        Ok(())
    }
}

impl fmt::Debug for FrameInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameInjector").finish_non_exhaustive()
    }
}

pub struct Connection {
    link: Arc<Link>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    outbound: Mutex<Option<OutboundCoalescer>>,
    lengths: Arc<dyn LengthTable>,
    filters: Arc<FilterChain>,
    decompressor: Arc<dyn Decompressor>,
    client: ClientConfig,
    transport: TransportConfig,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
}

impl Connection {
    pub fn new(
        name: impl Into<String>,
        config: &NetworkConfig,
        lengths: Arc<dyn LengthTable>,
        filters: Arc<FilterChain>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Link {
            name: name.into(),
            reassembler: Mutex::new(None),
            inbound: tx,
            stats: Arc::new(LinkStatistics::new()),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            generation: AtomicU64::new(0),
            log_packets: config.transport.log_packets,
            redacted: config.transport.redacted_opcodes.clone(),
        };

        Self {
            link: Arc::new(link),
            inbound: rx,
            writer: tokio::sync::Mutex::new(None),
            outbound: Mutex::new(None),
            lengths,
            filters,
            decompressor: Arc::new(Huffman),
            client: config.client.clone(),
            transport: config.transport.clone(),
            cancel: None,
            task: None,
            local_addr: None,
            peer_addr: None,
        }
    }

    /// Replace the codec used once compression is enabled.
    pub fn set_decompressor(&mut self, decompressor: Arc<dyn Decompressor>) {
        self.decompressor = decompressor;
    }

    pub fn name(&self) -> &str {
        &self.link.name
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.link.state() == ConnectionState::Connected
    }

    pub fn statistics(&self) -> Arc<LinkStatistics> {
        Arc::clone(&self.link.stats)
    }

    pub fn filters(&self) -> &Arc<FilterChain> {
        &self.filters
    }

    pub fn lengths(&self) -> &Arc<dyn LengthTable> {
        &self.lengths
    }

    pub fn injector(&self) -> FrameInjector {
        FrameInjector {
            inbound: self.link.inbound.clone(),
            lengths: Arc::clone(&self.lengths),
            stats: Arc::clone(&self.link.stats),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Local IPv4 address packed the way login frames carry it.
    pub fn client_ip(&self) -> u32 {
        match self.local_addr {
            Some(SocketAddr::V4(addr)) => u32::from_le_bytes(addr.ip().octets()),
            _ => LOOPBACK_CLIENT_IP,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.link
            .reassembler()
            .as_ref()
            .is_some_and(FrameReassembler::is_compressed)
    }

    fn inflater(&self) -> StreamInflater {
        StreamInflater::with_limit(Arc::clone(&self.decompressor), self.transport.max_carry_over)
    }

    /// Decompress every byte received from now on.
    ///
    /// Bytes already read are not revisited; to decompress a stream from its
    /// first byte use [`Connection::connect_with`].
    pub fn enable_compression(&self) -> Result<()> {
        let mut slot = self.link.reassembler();
        let reassembler = slot.as_mut().ok_or(ProtocolError::NotConnected)?;
        reassembler.enable_compression(self.inflater());
        info!(connection = %self.link.name, "Compression enabled");
        Ok(())
    }

    /// Open the socket and start receiving. An open link is closed first.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        self.connect_with(host, port, false).await
    }

    /// Like [`Connection::connect`], with `compressed` deciding whether the
    /// stream is decompressed from its first byte.
    #[instrument(skip(self), fields(connection = %self.link.name))]
    pub async fn connect_with(&mut self, host: &str, port: u16, compressed: bool) -> Result<()> {
        if self.state() != ConnectionState::Disconnected {
            self.disconnect().await;
        }

        self.link.set_state(ConnectionState::Connecting);
        let result = self.open(host, port, compressed).await;
        if result.is_err() {
            self.link.set_state(ConnectionState::Disconnected);
        }
        result
    }

    async fn open(&mut self, host: &str, port: u16, compressed: bool) -> Result<()> {
        let addr = resolve(host, port).await?;

        let stream = match timeout(self.client.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(peer = %addr, error = %e, "Connect failed");
                return Err(ProtocolError::ConnectFailure {
                    addr: addr.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                warn!(peer = %addr, timeout_ms = self.client.connect_timeout.as_millis() as u64, "Connect timed out");
                return Err(ProtocolError::ConnectionTimeout);
            }
        };

        stream.set_nodelay(self.client.nodelay)?;
        self.local_addr = stream.local_addr().ok();
        self.peer_addr = Some(addr);
        let (reader, writer) = stream.into_split();

        let generation = self.link.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut reassembler = FrameReassembler::with_limits(
            Arc::clone(&self.lengths),
            self.transport.max_frame_size,
            self.transport.recv_buffer_size,
        );
        if compressed {
            reassembler.enable_compression(self.inflater());
        }
        // installed before the receive task exists, so no byte bypasses it
        *self.link.reassembler() = Some(reassembler);
        *self.outbound_slot() = Some(OutboundCoalescer::new(
            SegmentPool::new(self.transport.segment_size, self.transport.initial_segments),
            self.transport.outbound_capacity,
        ));
        *self.writer.get_mut() = Some(writer);
        self.link.stats.reset();
        self.link.set_state(ConnectionState::Connected);

        let cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(receive_loop(
            Arc::clone(&self.link),
            reader,
            cancel.clone(),
            generation,
            self.transport.recv_buffer_size,
        )));
        self.cancel = Some(cancel);

        info!(peer = %addr, compressed, "Connected");
        Ok(())
    }

    /// Close the link and release its buffers. Queues a
    /// [`DisconnectReason::Requested`] notice if the link was open.
    #[instrument(skip(self), fields(connection = %self.link.name))]
    pub async fn disconnect(&mut self) {
        let generation = self.link.current_generation();
        let was_open = self.link.teardown(generation, DisconnectReason::Requested);

        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        if let Some(mut writer) = self.writer.get_mut().take() {
            let _ = writer.shutdown().await;
        }
        self.outbound_slot().take();
        self.link.set_state(ConnectionState::Disconnected);

        if was_open {
            self.link.stats.log_statistics(&self.link.name);
            info!("Disconnected");
        }
    }

    fn outbound_slot(&self) -> MutexGuard<'_, Option<OutboundCoalescer>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop socket-side resources after the receive task tore the link down.
    fn release(&mut self) {
        self.writer.get_mut().take();
        self.outbound_slot().take();
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.task.take();
    }

    /// Run the outbound filters. `None` means a filter vetoed the frame.
    fn filter_outbound(&self, mut data: Vec<u8>) -> Option<Vec<u8>> {
        if self.filters.is_empty() {
            return Some(data);
        }
        let opcode = data.first().copied().unwrap_or(0);
        let verdict = self.filters.filter_outbound(&mut data);
        if !verdict.allow {
            debug!(connection = %self.link.name, opcode, "Outbound frame vetoed by filter");
            return None;
        }
        Some(data)
    }

    /// Finish `writer` and send it through the outbound filters.
    pub async fn send(&self, writer: FrameWriter) -> Result<()> {
        self.send_bytes(writer.finish(), true).await
    }

    /// Send already framed bytes through the outbound filters.
    pub async fn send_raw(&self, data: &[u8]) -> Result<()> {
        self.send_bytes(data.to_vec(), true).await
    }

    /// Send already framed bytes without consulting the filters.
    pub async fn send_unfiltered(&self, data: Vec<u8>) -> Result<()> {
        self.send_bytes(data, false).await
    }

    async fn send_bytes(&self, data: Vec<u8>, filter: bool) -> Result<()> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }

        let data = if filter {
            match self.filter_outbound(data) {
                Some(data) => data,
                None => return Ok(()),
            }
        } else {
            data
        };
        if data.is_empty() {
            return Ok(());
        }

        if self.link.log_packets {
            log_packet(Direction::ClientToServer, &data, &self.link.redacted);
        }
        self.write(&data).await?;
        self.link.stats.packet_sent(data.len());
        Ok(())
    }

    async fn write(&self, data: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(ProtocolError::NotConnected)?;

        if let Err(e) = stream.write_all(data).await {
            error!(connection = %self.link.name, error = %e, "Send failed");
            writer.take();
            self.link
                .teardown(self.link.current_generation(), DisconnectReason::from_io(&e));
            return Err(ProtocolError::LinkFailure(e));
        }
        Ok(())
    }

    /// Filter `writer` and buffer it for the next [`Connection::flush`].
    ///
    /// Fails with [`ProtocolError::CapacityExceeded`] without queuing anything
    /// when the outbound cap would be exceeded; the link stays up.
    pub fn queue(&self, writer: FrameWriter) -> Result<()> {
        self.queue_raw(&writer.finish())
    }

    pub fn queue_raw(&self, data: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(ProtocolError::NotConnected);
        }
        let Some(data) = self.filter_outbound(data.to_vec()) else {
            return Ok(());
        };

        {
            let mut slot = self.outbound_slot();
            let coalescer = slot.as_mut().ok_or(ProtocolError::NotConnected)?;
            coalescer.enqueue(&data)?;
        }

        if self.link.log_packets {
            log_packet(Direction::ClientToServer, &data, &self.link.redacted);
        }
        Ok(())
    }

    /// Bytes waiting in the outbound coalescer.
    pub fn pending_outbound(&self) -> usize {
        self.outbound_slot()
            .as_ref()
            .map_or(0, OutboundCoalescer::pending_bytes)
    }

    /// Write every queued byte. Returns the number of bytes written.
    ///
    /// Queued frames count towards the send statistics only once written.
    pub async fn flush(&self) -> Result<usize> {
        let (frames, pending) = {
            let mut slot = self.outbound_slot();
            let coalescer = slot.as_mut().ok_or(ProtocolError::NotConnected)?;
            (coalescer.pending_frames(), coalescer.take_pending())
        };

        if pending.is_empty() {
            return Ok(0);
        }
        self.write(&pending).await?;
        self.link.stats.packets_sent_batch(frames, pending.len());
        Ok(pending.len())
    }

    /// Send a ping carrying the next sequence byte; the reply is matched in
    /// [`Connection::update`].
    pub async fn send_ping(&self) -> Result<()> {
        let opcode = self.transport.ping_opcode;
        let length = self.lengths.frame_length(opcode);
        if matches!(length, FrameLength::Fixed(n) if n < 2) {
            return Err(ProtocolError::ConfigError(format!(
                "Ping opcode 0x{opcode:02X} has no room for a sequence byte"
            )));
        }

        let sequence = self.link.stats.begin_ping();
        let mut writer = FrameWriter::with_length(opcode, length, 4);
        writer.write_u8(sequence);
        self.send_bytes(writer.finish(), false).await
    }

    /// Drain the inbound queue into `handler`. Returns the number of frames
    /// delivered.
    pub fn update<H>(&mut self, handler: &mut H) -> usize
    where
        H: PacketHandler + ?Sized,
    {
        let mut delivered = 0;

        while let Ok(event) = self.inbound.try_recv() {
            match event {
                Inbound::Frame(mut frame) => {
                    if !self.filters.apply_inbound(&mut frame) {
                        debug!(connection = %self.link.name, opcode = frame.opcode(), "Inbound frame vetoed by filter");
                        continue;
                    }

                    if frame.opcode() == self.transport.ping_opcode && !frame.bypass_filter() {
                        if let Some(&sequence) = frame.as_bytes().get(1) {
                            self.link.stats.ping_received(sequence);
                        }
                    }

                    handler.on_frame(&mut frame);
                    delivered += 1;
                }
                Inbound::Disconnected { generation, reason } => {
                    if generation == self.link.current_generation() {
                        self.release();
                    }
                    info!(connection = %self.link.name, %reason, "Link closed");
                    handler.on_disconnected(&reason);
                }
            }
        }

        delivered
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.link.name)
            .field("state", &self.state())
            .field("peer_addr", &self.peer_addr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(opcode: u8) -> i16 {
        if opcode == 0x73 {
            2
        } else {
            -1
        }
    }

    fn connection() -> Connection {
        Connection::new(
            "test",
            &NetworkConfig::default(),
            Arc::new(table),
            Arc::new(FilterChain::new()),
        )
    }

    #[test]
    fn test_client_ip_fallback() {
        assert_eq!(connection().client_ip(), LOOPBACK_CLIENT_IP);
    }

    #[test]
    fn test_client_ip_byte_order() {
        let mut conn = connection();
        conn.local_addr = Some("192.168.1.20:5000".parse().unwrap());
        assert_eq!(conn.client_ip(), 192 | 168 << 8 | 1 << 16 | 20 << 24);
    }

    #[test]
    fn test_injected_frames_drain_in_order() {
        let mut conn = connection();
        let injector = conn.injector();
        injector.inject(vec![0x73, 0x01]).unwrap();
        injector.inject(vec![0xBF, 0x00, 0x04, 0x09]).unwrap();

        let mut seen = Vec::new();
        let delivered = conn.update(&mut |frame: &mut Frame| {
            assert!(frame.bypass_filter());
            seen.push(frame.opcode());
        });
        assert_eq!(delivered, 2);
        assert_eq!(seen, vec![0x73, 0xBF]);
        assert_eq!(conn.statistics().total_packets_received(), 2);
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let conn = connection();
        assert!(matches!(
            conn.send_raw(&[0x73, 0x00]).await,
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(conn.queue_raw(&[0x73, 0x00]), Err(ProtocolError::NotConnected)));
        assert!(conn.enable_compression().is_err());
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let addr = resolve("127.0.0.1", 2593).await.unwrap();
        assert_eq!(addr, "127.0.0.1:2593".parse().unwrap());
    }

    #[test]
    fn test_disconnect_reason_code() {
        let reason = DisconnectReason::from_io(&io::Error::from_raw_os_error(104));
        assert_eq!(reason.error_code(), Some(104));
        assert_eq!(DisconnectReason::RemoteClosed.error_code(), None);
    }
}
