//! One direction of a connection, delivered in segments of arbitrary size.

use bytes::BytesMut;
use tokio_util::codec::Decoder as _;
use tracing::{debug, warn};

use crate::{
    constants::{commands::Command, Magic},
    dispatch::{dispatch, DispatchError, MessageBody},
    frame::{FrameError, Framer, RawMessage},
    schema,
    tree::{Annotation, Dissect as _, Severity, Tree, PAYLOAD_OFFSET},
    wire::Header,
};

/// Read-only for the lifetime of a [Conversation].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Wait for messages which span several segments, rather than reporting them as malformed.
    pub desegment: bool,
    /// Reject messages advertising more than this many payload bytes.
    pub max_frame_length: Option<u32>,
    /// Skip building field trees. Bodies are still parsed.
    pub build_tree: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desegment: true,
            max_frame_length: None,
            build_tree: true,
        }
    }
}

/// The network a stream belongs to, if its first bytes are a known magic.
pub fn classify(bytes: &[u8]) -> Option<Magic> {
    let magic = bytes.get(..4)?.try_into().ok().map(u32::from_le_bytes)?;
    Magic::try_from(magic).ok()
}

/// Everything learnt about one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dissection {
    /// Where the message starts, counting from the first byte of the stream.
    pub stream_offset: u64,
    pub header: Header,
    pub network: Option<Magic>,
    pub command: Option<Command>,
    /// [None] if the command is unknown or the payload is malformed.
    pub body: Option<MessageBody>,
    /// Empty if [Config::build_tree] is off.
    pub tree: Tree,
    pub annotations: Vec<Annotation>,
}

impl Dissection {
    /// Short description for an info column.
    pub fn summary(&self) -> &'static str {
        match self.command {
            Some(command) => command.name(),
            None => "[unknown command]",
        }
    }
}

#[derive(Debug)]
pub enum Event {
    Message(Dissection),
    /// Framing failed, so the bytes from `stream_offset` to the end of the segment were dropped.
    Malformed {
        stream_offset: u64,
        dropped: usize,
        error: FrameError,
    },
}

/// Info column for the events of one segment.
pub fn info_column(events: &[Event]) -> String {
    events
        .iter()
        .map(|event| match event {
            Event::Message(dissection) => dissection.summary(),
            Event::Malformed { .. } => "[malformed]",
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
pub enum Feed {
    /// The stream doesn't start with a known magic, nothing was kept.
    Declined,
    Accepted(Vec<Event>),
}

/// Reassembles and dissects one direction of a stream.
///
/// The first segment decides whether the stream is ours.
/// After that every segment goes straight to framing.
#[derive(Debug)]
pub struct Conversation {
    config: Config,
    framer: Framer,
    network: Option<Magic>,
    buffer: BytesMut,
    /// Stream offset of the start of `buffer`.
    stream_offset: u64,
}

impl Conversation {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            framer: Framer {
                desegment: config.desegment,
                max_frame_length: config.max_frame_length,
            },
            network: None,
            buffer: BytesMut::new(),
            stream_offset: 0,
        }
    }

    /// [Some] once the stream has been claimed.
    pub fn network(&self) -> Option<Magic> {
        self.network
    }

    /// Bytes waiting for the rest of their message.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn feed(&mut self, segment: &[u8]) -> Feed {
        if self.network.is_none() {
            match classify(segment) {
                Some(network) => {
                    debug!(%network, "claimed stream");
                    self.network = Some(network);
                }
                None => {
                    debug!(len = segment.len(), "declined stream");
                    return Feed::Declined;
                }
            }
        }
        Feed::Accepted(self.process(segment))
    }

    /// The stream has ended: report a trailing partial message, if any.
    pub fn finish(mut self) -> Option<Event> {
        if self.buffer.is_empty() {
            return None;
        }
        let error = match self.framer.decode_eof(&mut self.buffer) {
            Err(error) => error,
            // the buffer always ends mid-message here, so decoding can't succeed
            Ok(_) => FrameError::SpansSegments {
                required: self.buffer.len() + 1,
                available: self.buffer.len(),
            },
        };
        warn!(%error, buffered = self.buffer.len(), "stream ended mid-message");
        Some(Event::Malformed {
            stream_offset: self.stream_offset,
            dropped: self.buffer.len(),
            error,
        })
    }

    fn process(&mut self, segment: &[u8]) -> Vec<Event> {
        self.buffer.extend_from_slice(segment);
        let mut events = vec![];
        loop {
            match self.framer.decode(&mut self.buffer) {
                Ok(Some(message)) => {
                    let len = message.bytes.len();
                    events.push(Event::Message(self.dissect(message)));
                    self.stream_offset += len as u64;
                }
                Ok(None) => break,
                // The next boundary can't be trusted, so nothing after this point in the buffer can be either
                Err(error) => {
                    let dropped = self.buffer.len();
                    warn!(%error, stream_offset = self.stream_offset, dropped, "framing failed");
                    events.push(Event::Malformed {
                        stream_offset: self.stream_offset,
                        dropped,
                        error,
                    });
                    self.stream_offset += dropped as u64;
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    fn dissect(&self, message: RawMessage) -> Dissection {
        let RawMessage { header, bytes } = message;
        let payload = &bytes[PAYLOAD_OFFSET..];
        let whole = 0..bytes.len();
        let mut annotations = vec![];

        let body = match dispatch(&header.command, payload) {
            Ok(parsed) => {
                debug!(
                    command = %parsed.body.command(),
                    len = bytes.len(),
                    consumed = parsed.consumed,
                    "dissected message"
                );
                let uninterpreted = payload.len() - parsed.consumed;
                if uninterpreted > 0 {
                    annotations.push(Annotation {
                        info: &schema::UNINTERPRETED,
                        severity: Severity::Note,
                        range: PAYLOAD_OFFSET + parsed.consumed..bytes.len(),
                        message: format!("{uninterpreted} payload bytes not interpreted"),
                    });
                }
                Some(parsed.body)
            }
            Err(DispatchError::UnknownCommand(_)) => {
                warn!(command = %header.command_lossy(), "unknown command");
                annotations.push(Annotation {
                    info: &schema::UNKNOWN_COMMAND,
                    severity: Severity::Warning,
                    range: whole.clone(),
                    message: format!("unknown command {:?}", header.command_lossy()),
                });
                None
            }
            Err(DispatchError::Body(error)) => {
                warn!(%error, "malformed message");
                annotations.push(Annotation {
                    info: &schema::MALFORMED,
                    severity: Severity::Error,
                    range: PAYLOAD_OFFSET + error.offset()..bytes.len(),
                    message: error.to_string(),
                });
                None
            }
        };

        let mut tree = Tree::default();
        if self.config.build_tree {
            tree.add_subtree(&schema::PROTOCOL, whole, |tree| {
                header.dissect(0, tree);
                if let Some(body) = &body {
                    body.dissect(PAYLOAD_OFFSET, tree);
                }
            });
        }

        Dissection {
            stream_offset: self.stream_offset,
            header,
            network: header.network(),
            command: header.command(),
            body,
            tree,
            annotations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::commands::fields,
        message::tests::{sample_block, sample_transaction},
        wire::{Frame, HEADER_LENGTH},
    };

    use pretty_assertions::assert_eq;

    fn messages(events: &[Event]) -> Vec<&Dissection> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Message(dissection) => Some(dissection),
                Event::Malformed { .. } => None,
            })
            .collect()
    }

    fn accepted(feed: Feed) -> Vec<Event> {
        match feed {
            Feed::Accepted(events) => events,
            Feed::Declined => panic!("stream was declined"),
        }
    }

    fn stream() -> Vec<u8> {
        [
            Frame::new(Magic::Testnet, fields::VERACK, ()).deparse_valid_to_vec(),
            Frame::new(Magic::Testnet, fields::TX, sample_transaction(1, 2)).deparse_valid_to_vec(),
            Frame::new(Magic::Testnet, fields::BLOCK, sample_block(3)).deparse_valid_to_vec(),
        ]
        .concat()
    }

    #[test]
    fn magic_mismatch_is_declined_without_side_effects() {
        let mut conversation = Conversation::new(Config::default());
        assert!(matches!(
            conversation.feed(&[0x0B, 0x11, 0x09, 0x07, 0, 0, 0, 0]),
            Feed::Declined
        ));
        assert!(matches!(conversation.feed(&[0xF9, 0xBE]), Feed::Declined));
        assert_eq!(conversation.network(), None);
        assert_eq!(conversation.buffered(), 0);

        // still able to claim a later stream start
        let events = accepted(conversation.feed(&stream()));
        assert_eq!(conversation.network(), Some(Magic::Testnet));
        assert_eq!(messages(&events).len(), 3);
    }

    #[test]
    fn claimed_streams_skip_classification() {
        let bytes = stream();
        let mut conversation = Conversation::new(Config::default());
        // split inside the first header, so the second segment doesn't start with a magic
        assert!(accepted(conversation.feed(&bytes[..6])).is_empty());
        let events = accepted(conversation.feed(&bytes[6..]));
        assert_eq!(info_column(&events), "verack, tx, block");
    }

    #[test]
    fn reassembly_across_many_segments() {
        let bytes = stream();
        // the first segment carries the magic, the rest arrive in pieces of every size
        let (first, rest) = bytes.split_at(4);
        for chunk_size in 1..=rest.len() {
            let mut conversation = Conversation::new(Config::default());
            let mut commands = vec![];
            let mut offsets = vec![];
            let segments = std::iter::once(first).chain(rest.chunks(chunk_size));
            for segment in segments {
                for dissection in messages(&accepted(conversation.feed(segment))) {
                    commands.push(dissection.summary());
                    offsets.push(dissection.stream_offset);
                }
            }
            assert_eq!(commands, ["verack", "tx", "block"], "chunk size {chunk_size}");
            assert_eq!(offsets[0], 0);
            assert_eq!(offsets[1], HEADER_LENGTH as u64);
            assert!(conversation.finish().is_none());
        }
    }

    #[test]
    fn first_segment_shorter_than_a_magic_is_declined() {
        let bytes = stream();
        let mut conversation = Conversation::new(Config::default());
        assert!(matches!(conversation.feed(&bytes[..3]), Feed::Declined));
        assert_eq!(conversation.network(), None);
        assert_eq!(conversation.buffered(), 0);
    }

    #[test]
    fn huge_declared_length_buffers_only_what_arrived() {
        let mut header = Frame::new(Magic::Main, fields::TX, ()).deparse_valid_to_vec();
        header[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut conversation = Conversation::new(Config::default());
        assert!(accepted(conversation.feed(&header)).is_empty());
        assert_eq!(conversation.buffered(), HEADER_LENGTH);
        assert!(conversation.buffer.capacity() <= HEADER_LENGTH + crate::frame::MAX_RESERVE);
    }

    #[test]
    fn without_desegmenting_a_split_message_is_malformed() {
        let bytes = stream();
        let mut conversation = Conversation::new(Config {
            desegment: false,
            ..Default::default()
        });
        let events = accepted(conversation.feed(&bytes[..HEADER_LENGTH + 10]));
        assert_eq!(info_column(&events), "verack, [malformed]");
        assert!(matches!(
            events[1],
            Event::Malformed {
                error: FrameError::SpansSegments { .. },
                dropped: 10,
                ..
            }
        ));
        assert_eq!(conversation.buffered(), 0);
    }

    #[test]
    fn unknown_command_has_no_body_fields() {
        let mut bytes = Frame::new(Magic::Main, *b"wtfmessage\0\0", ()).deparse_valid_to_vec();
        // a payload, so there would be something to dissect
        bytes[16] = 3;
        bytes.extend([1, 2, 3]);
        let mut conversation = Conversation::new(Config::default());
        let events = accepted(conversation.feed(&bytes));
        let dissections = messages(&events);
        let [dissection] = &dissections[..] else {
            panic!("expected one message")
        };
        assert_eq!(dissection.summary(), "[unknown command]");
        assert_eq!(dissection.body, None);
        assert_eq!(
            dissection
                .annotations
                .iter()
                .map(|it| (it.info, it.severity))
                .collect::<Vec<_>>(),
            [(&schema::UNKNOWN_COMMAND, Severity::Warning)]
        );
        // only the header is described
        let protocol = &dissection.tree.fields()[0];
        assert_eq!(protocol.children.fields().len(), 4);
        assert!(protocol
            .children
            .walk()
            .all(|field| field.range.end <= HEADER_LENGTH));
        assert_eq!(info_column(&events), "[unknown command]");
    }

    #[test]
    fn malformed_body_does_not_disturb_later_messages() {
        let mut tx = Frame::new(Magic::Main, fields::TX, sample_transaction(1, 1)).deparse_valid_to_vec();
        // chop the lock time off, and fix the header up to match
        tx.truncate(tx.len() - 4);
        let payload_length = u32::try_from(tx.len() - HEADER_LENGTH).unwrap();
        tx[16..20].copy_from_slice(&payload_length.to_le_bytes());
        let verack = Frame::new(Magic::Main, fields::VERACK, ()).deparse_valid_to_vec();

        let mut conversation = Conversation::new(Config::default());
        let tx_length = tx.len();
        let events = accepted(conversation.feed(&[tx, verack].concat()));
        let dissections = messages(&events);
        assert_eq!(dissections.len(), 2);
        assert_eq!(dissections[0].body, None);
        assert_eq!(dissections[0].annotations[0].severity, Severity::Error);
        assert_eq!(dissections[0].annotations[0].info, &schema::MALFORMED);
        // the whole payload is at fault
        assert_eq!(dissections[0].annotations[0].range, HEADER_LENGTH..tx_length);
        assert_eq!(
            dissections[1].body,
            Some(MessageBody::Uninterpreted(Command::Verack))
        );
    }

    #[test]
    fn trailing_payload_bytes_are_noted() {
        let mut bytes = Frame::new(Magic::Main, fields::PING, ()).deparse_valid_to_vec();
        bytes[16] = 8;
        bytes.extend([0xAA; 8]);
        let mut conversation = Conversation::new(Config::default());
        let events = accepted(conversation.feed(&bytes));
        let dissections = messages(&events);
        let [dissection] = &dissections[..] else {
            panic!("expected one message")
        };
        assert_eq!(dissection.annotations.len(), 1);
        assert_eq!(dissection.annotations[0].severity, Severity::Note);
        assert_eq!(dissection.annotations[0].range, HEADER_LENGTH..HEADER_LENGTH + 8);
    }

    #[test]
    fn tree_building_can_be_skipped() {
        let mut conversation = Conversation::new(Config {
            build_tree: false,
            ..Default::default()
        });
        let events = accepted(conversation.feed(&stream()));
        let dissections = messages(&events);
        assert_eq!(dissections.len(), 3);
        assert!(dissections.iter().all(|it| it.tree.is_empty()));
        assert!(dissections[2].body.as_ref().unwrap().as_block().is_some());
    }

    #[test]
    fn stream_ending_mid_message() {
        let bytes = stream();
        let mut conversation = Conversation::new(Config::default());
        accepted(conversation.feed(&bytes[..HEADER_LENGTH + 30]));
        assert_eq!(conversation.buffered(), 30);
        assert!(matches!(
            conversation.finish(),
            Some(Event::Malformed { dropped: 30, .. })
        ));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut conversation = Conversation::new(Config {
            max_frame_length: Some(16),
            ..Default::default()
        });
        let events = accepted(conversation.feed(&stream()));
        assert_eq!(info_column(&events), "verack, [malformed]");
        assert_eq!(conversation.buffered(), 0);
    }
}
