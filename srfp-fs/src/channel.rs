//! Sequenced request/response exchanges over a transport.
//!
//! SRFP allows exactly one request in flight. [`MessageChannel`] stamps each
//! outgoing message with a wrapping 16-bit id, then reads the reply back in
//! two phases (fixed header, then body + CRC), accumulating across short
//! transport reads.
//!
//! Bytes are buffered until a whole frame is in hand, so a receive timeout
//! never leaves the stream mid-frame. A request whose caller timed out is
//! still owed a reply by the device; that late reply is discarded by the
//! next exchange instead of being handed to the wrong caller. A frame whose
//! header or CRC cannot be trusted leaves no way to find the next frame
//! boundary, so the channel closes its transport and fails every later
//! exchange with [`TransportError::Closed`].

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportError};
use srfp_proto::{parse_header, Frame, Message, ProtocolError, HEADER_LEN};
use std::time::Duration;
use tracing::{debug, warn};

const READ_CHUNK: usize = 512;

/// Owns a transport and the outgoing id counter.
pub struct MessageChannel {
    transport: Box<dyn Transport>,
    next_id: u16,
    strict_ids: bool,
    /// Received bytes not yet consumed as a frame.
    rx: Vec<u8>,
    /// Replies still owed for requests whose exchange timed out.
    late: usize,
    closed: bool,
}

impl MessageChannel {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: 0,
            strict_ids: false,
            rx: Vec::new(),
            late: 0,
            closed: false,
        }
    }

    /// Reject replies whose echoed id is not the id just sent.
    pub fn with_strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }

    /// Id the next `send_msg` will use.
    pub fn next_id(&self) -> u16 {
        self.next_id
    }

    /// True once the channel has given up on the stream.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bound each blocking read on the transport.
    pub fn set_recv_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        Ok(self.transport.set_read_timeout(timeout)?)
    }

    /// Encode `message` under the current id and write it out.
    ///
    /// Returns the id used. The counter advances (wrapping at 0xFFFF) even
    /// if the write fails, so an id is never reused for a different request.
    pub fn send_msg(&mut self, message: Message) -> Result<u16> {
        if self.closed {
            return Err(TransportError::Closed.into());
        }
        let id = self.next_id;
        self.next_id = id.wrapping_add(1);

        let kind = message.message_type();
        let bytes = Frame::new(id, message).encode()?;
        debug!(target: "srfp::channel", id, ?kind, len = bytes.len(), "send");
        self.transport.send(&bytes)?;
        Ok(id)
    }

    /// Block until one complete frame has been read and verified.
    ///
    /// On a receive timeout the partial frame stays buffered for the next
    /// call.
    pub fn recv_msg(&mut self) -> Result<Frame> {
        if self.closed {
            return Err(TransportError::Closed.into());
        }

        self.fill(HEADER_LEN)?;
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.rx[..HEADER_LEN]);
        let (pending, remaining) = match parse_header(&header) {
            Ok(parsed) => parsed,
            Err(e) => return Err(self.fail(e)),
        };

        let total = HEADER_LEN + remaining;
        self.fill(total)?;
        let parsed = pending.parse_rest(&self.rx[HEADER_LEN..total]);
        self.rx.drain(..total);

        let frame = match parsed {
            Ok(frame) => frame,
            Err(ProtocolError::CrcMismatch { expected, actual }) => {
                warn!(target: "srfp::channel", expected, actual, "CRC mismatch, dropping frame");
                return Err(self.fail(ProtocolError::CrcMismatch { expected, actual }));
            }
            // Framing and CRC were sound; only this body is bad.
            Err(e) => return Err(e.into()),
        };
        debug!(
            target: "srfp::channel",
            id = frame.id,
            kind = ?frame.message.message_type(),
            len = remaining,
            "recv"
        );
        Ok(frame)
    }

    /// Send one request and read its reply.
    pub fn exchange(&mut self, message: Message) -> Result<Message> {
        let id = self.send_msg(message)?;
        loop {
            let frame = match self.recv_msg() {
                Ok(frame) => frame,
                Err(e) => {
                    if matches!(e, Error::Transport(TransportError::Timeout)) {
                        self.late += 1;
                    }
                    return Err(e);
                }
            };

            if frame.id != id && self.late > 0 {
                self.late -= 1;
                warn!(
                    target: "srfp::channel",
                    id = frame.id,
                    kind = ?frame.message.message_type(),
                    still_owed = self.late,
                    "discarding late reply"
                );
                continue;
            }
            // Anything still owed was never sent by the device.
            self.late = 0;

            if frame.id != id {
                warn!(target: "srfp::channel", expected = id, actual = frame.id, "reply id mismatch");
                if self.strict_ids {
                    return Err(ProtocolError::IdMismatch {
                        expected: id,
                        actual: frame.id,
                    }
                    .into());
                }
            }
            return Ok(frame.message);
        }
    }

    /// Close the underlying transport.
    pub fn close(&mut self) {
        self.closed = true;
        self.rx.clear();
        if let Err(e) = self.transport.close() {
            debug!(target: "srfp::channel", error = %e, "transport close failed");
        }
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    /// Read until at least `want` bytes are buffered.
    fn fill(&mut self, want: usize) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        while self.rx.len() < want {
            let ask = (want - self.rx.len()).min(READ_CHUNK);
            let n = self.transport.recv(&mut chunk[..ask])?;
            if n == 0 {
                return Err(Error::Protocol(ProtocolError::UnexpectedEof {
                    expected: want,
                    received: self.rx.len(),
                }));
            }
            self.rx.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    /// Give up on a stream whose frame boundaries are lost.
    fn fail(&mut self, err: ProtocolError) -> Error {
        warn!(target: "srfp::channel", error = %err, transport = %self.describe(), "stream out of sync, closing channel");
        self.close();
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{NullTransport, TransportError};
    use srfp_proto::{ErrorCode, NodeInfo, Version};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Hands out queued bytes at most `chunk` at a time and records writes.
    struct TrickleTransport {
        inbound: VecDeque<u8>,
        chunk: usize,
        sent: Arc<Mutex<Vec<u8>>>,
    }

    impl TrickleTransport {
        fn new(inbound: Vec<u8>, chunk: usize) -> (Self, Arc<Mutex<Vec<u8>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let transport = Self {
                inbound: inbound.into(),
                chunk,
                sent: Arc::clone(&sent),
            };
            (transport, sent)
        }
    }

    impl Transport for TrickleTransport {
        fn send(&mut self, buf: &[u8]) -> std::result::Result<(), TransportError> {
            self.sent.lock().unwrap().extend_from_slice(buf);
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransportError> {
            let n = buf.len().min(self.chunk).min(self.inbound.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.inbound.pop_front().unwrap();
            }
            Ok(n)
        }

        fn describe(&self) -> String {
            "trickle".to_string()
        }
    }

    fn encoded(id: u16, message: Message) -> Vec<u8> {
        Frame::new(id, message).encode().unwrap()
    }

    #[test]
    fn test_send_assigns_sequential_ids() {
        let (transport, sent) = TrickleTransport::new(Vec::new(), 64);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert_eq!(channel.send_msg(Message::VersionRequest).unwrap(), 0);
        assert_eq!(channel.send_msg(Message::VersionRequest).unwrap(), 1);
        assert_eq!(channel.next_id(), 2);

        let mut expected = encoded(0, Message::VersionRequest);
        expected.extend(encoded(1, Message::VersionRequest));
        assert_eq!(*sent.lock().unwrap(), expected);
    }

    #[test]
    fn test_id_counter_wraps() {
        let mut channel = MessageChannel::new(Box::new(NullTransport::new()));
        for expected in 0..=u16::MAX {
            assert_eq!(channel.send_msg(Message::VersionRequest).unwrap(), expected);
        }
        assert_eq!(channel.next_id(), 0);
        assert_eq!(channel.send_msg(Message::VersionRequest).unwrap(), 0);
    }

    #[test]
    fn test_recv_accumulates_partial_reads() {
        let reply = Message::NodeInfoResponse(NodeInfo {
            is_file: true,
            size: 10,
            created: 1,
            accessed: 2,
            modified: 3,
        });
        let (transport, _) = TrickleTransport::new(encoded(5, reply.clone()), 1);
        let mut channel = MessageChannel::new(Box::new(transport));

        let frame = channel.recv_msg().unwrap();
        assert_eq!(frame.id, 5);
        assert_eq!(frame.message, reply);
    }

    #[test]
    fn test_recv_back_to_back_frames() {
        let mut inbound = encoded(0, Message::FileContentsResponse { data: b"ab".to_vec() });
        inbound.extend(encoded(1, Message::Error { code: ErrorCode::Other }));
        let (transport, _) = TrickleTransport::new(inbound, 3);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert_eq!(
            channel.recv_msg().unwrap().message,
            Message::FileContentsResponse { data: b"ab".to_vec() }
        );
        assert_eq!(
            channel.recv_msg().unwrap().message,
            Message::Error { code: ErrorCode::Other }
        );
    }

    #[test]
    fn test_silent_transport_fails_instead_of_hanging() {
        let mut channel = MessageChannel::new(Box::new(NullTransport::new()));
        match channel.exchange(Message::VersionRequest) {
            Err(Error::Protocol(ProtocolError::UnexpectedEof { expected, received })) => {
                assert_eq!(expected, HEADER_LEN);
                assert_eq!(received, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_short_body_is_end_of_stream() {
        let bytes = encoded(0, Message::VersionResponse(Version::default()));
        let (transport, _) = TrickleTransport::new(bytes[..bytes.len() - 2].to_vec(), 4);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert!(matches!(
            channel.recv_msg(),
            Err(Error::Protocol(ProtocolError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_crc_mismatch_is_rejected() {
        let mut bytes = encoded(0, Message::FileContentsResponse { data: vec![1, 2, 3] });
        bytes[HEADER_LEN] ^= 0x01;
        let (transport, _) = TrickleTransport::new(bytes, 64);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert!(matches!(
            channel.recv_msg(),
            Err(Error::Protocol(ProtocolError::CrcMismatch { .. }))
        ));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let (transport, _) = TrickleTransport::new(vec![0x55, 0, 0, 0, 0, 0, 0, 0, 0], 64);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert!(matches!(
            channel.recv_msg(),
            Err(Error::Protocol(ProtocolError::UnknownMessageType(0x55)))
        ));
    }

    #[test]
    fn test_id_mismatch_is_tolerated_by_default() {
        let reply = Message::VersionResponse(Version {
            major: 1,
            minor: 0,
            bugfix: 0,
        });
        let (transport, _) = TrickleTransport::new(encoded(99, reply.clone()), 64);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert_eq!(channel.exchange(Message::VersionRequest).unwrap(), reply);
    }

    #[test]
    fn test_id_mismatch_with_strict_ids() {
        let reply = Message::VersionResponse(Version::default());
        let (transport, _) = TrickleTransport::new(encoded(99, reply), 64);
        let mut channel = MessageChannel::new(Box::new(transport)).with_strict_ids(true);

        assert!(matches!(
            channel.exchange(Message::VersionRequest),
            Err(Error::Protocol(ProtocolError::IdMismatch {
                expected: 0,
                actual: 99
            }))
        ));
    }

    /// Replays a fixed sequence of reads; `None` is a receive timeout.
    struct ScriptedTransport {
        reads: VecDeque<Option<Vec<u8>>>,
        sends: Arc<Mutex<usize>>,
    }

    impl ScriptedTransport {
        fn new(reads: Vec<Option<Vec<u8>>>) -> (Self, Arc<Mutex<usize>>) {
            let sends = Arc::new(Mutex::new(0));
            let transport = Self {
                reads: reads.into(),
                sends: Arc::clone(&sends),
            };
            (transport, sends)
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, _buf: &[u8]) -> std::result::Result<(), TransportError> {
            *self.sends.lock().unwrap() += 1;
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TransportError> {
            match self.reads.pop_front() {
                Some(Some(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    let rest = data.split_off(n);
                    if !rest.is_empty() {
                        self.reads.push_front(Some(rest));
                    }
                    Ok(n)
                }
                Some(None) => Err(TransportError::Timeout),
                None => Ok(0),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn size_reply(id: u16, size: u32) -> Vec<u8> {
        encoded(
            id,
            Message::NodeInfoResponse(NodeInfo {
                size,
                ..Default::default()
            }),
        )
    }

    fn size_of(message: Message) -> u32 {
        match message {
            Message::NodeInfoResponse(info) => info.size,
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_late_reply_is_not_handed_to_the_next_request() {
        let (transport, _) = ScriptedTransport::new(vec![
            None,
            Some(size_reply(0, 197)),
            Some(size_reply(1, 198)),
        ]);
        let mut channel = MessageChannel::new(Box::new(transport));
        let request = || Message::NodeInfoRequest { path: vec![] };

        assert!(matches!(
            channel.exchange(request()),
            Err(Error::Transport(TransportError::Timeout))
        ));
        assert_eq!(size_of(channel.exchange(request()).unwrap()), 198);
    }

    #[test]
    fn test_timeout_mid_frame_keeps_partial_bytes() {
        let first = size_reply(0, 197);
        let (head, tail) = first.split_at(3);
        let mut rest = tail.to_vec();
        rest.extend(size_reply(1, 198));

        let (transport, _) = ScriptedTransport::new(vec![Some(head.to_vec()), None, Some(rest)]);
        let mut channel = MessageChannel::new(Box::new(transport));
        let request = || Message::NodeInfoRequest { path: vec![] };

        assert!(channel.exchange(request()).is_err());
        assert_eq!(size_of(channel.exchange(request()).unwrap()), 198);
    }

    #[test]
    fn test_late_replies_are_dropped_even_with_vestigial_ids() {
        // Device echoes ids from its own counter; only the count of owed
        // replies tells which frame is stale.
        let (transport, _) = ScriptedTransport::new(vec![
            None,
            None,
            Some(size_reply(40, 1)),
            Some(size_reply(41, 2)),
            Some(size_reply(42, 3)),
        ]);
        let mut channel = MessageChannel::new(Box::new(transport));
        let request = || Message::NodeInfoRequest { path: vec![] };

        assert!(channel.exchange(request()).is_err());
        assert!(channel.exchange(request()).is_err());
        assert_eq!(size_of(channel.exchange(request()).unwrap()), 3);
    }

    #[test]
    fn test_bad_crc_closes_the_channel() {
        let mut bytes = size_reply(0, 197);
        bytes[HEADER_LEN + 2] ^= 0x01;
        let (transport, sends) = ScriptedTransport::new(vec![Some(bytes), Some(size_reply(1, 198))]);
        let mut channel = MessageChannel::new(Box::new(transport));
        let request = || Message::NodeInfoRequest { path: vec![] };

        assert!(matches!(
            channel.exchange(request()),
            Err(Error::Protocol(ProtocolError::CrcMismatch { .. }))
        ));
        assert!(channel.is_closed());
        assert!(matches!(
            channel.exchange(request()),
            Err(Error::Transport(TransportError::Closed))
        ));
        assert_eq!(*sends.lock().unwrap(), 1);
    }

    #[test]
    fn test_malformed_body_keeps_the_channel_open() {
        // Version reply with a 1-byte body: framed and checksummed correctly,
        // so the next frame boundary is still known.
        let mut bad = vec![0xFF, 0x00, 0x00, 0x00, 0x01, 0x07];
        let crc = crc32fast::hash(&bad);
        bad.extend_from_slice(&crc.to_be_bytes());

        let (transport, _) = ScriptedTransport::new(vec![Some(bad), Some(size_reply(1, 5))]);
        let mut channel = MessageChannel::new(Box::new(transport));

        assert!(matches!(
            channel.exchange(Message::VersionRequest),
            Err(Error::Protocol(ProtocolError::MalformedBody { .. }))
        ));
        assert!(!channel.is_closed());
        assert_eq!(size_of(channel.exchange(Message::NodeInfoRequest { path: vec![] }).unwrap()), 5);
    }
}
