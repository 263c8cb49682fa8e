//! Carve a byte stream into whole messages.
//! Only the header is read here, payloads are handed on untouched.

use std::{cmp, io, mem};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::wire::{Header, HEADER_LENGTH};

/// Most we'll reserve ahead of bytes actually arriving.
/// Declared lengths come off the wire, so the buffer grows with the data instead.
pub const MAX_RESERVE: usize = 64 * 1024;

/// One whole message, as it was on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub header: Header,
    /// Header and payload.
    pub bytes: Bytes,
}

impl RawMessage {
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LENGTH..]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame length {advertised} is greater than threshold {threshold}")]
    RejectedFrameLength { advertised: u32, threshold: u32 },
    #[error("payload length {payload_length} can't be addressed on this platform")]
    MalformedLength { payload_length: u32 },
    /// Reassembly is disabled, and the message doesn't fit in what we were given.
    #[error("message needs at least {required} bytes, but only {available} are available")]
    SpansSegments { required: usize, available: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A [tokio_util::codec::Decoder] for messages.
///
/// With `desegment` set, a short buffer is a request for more bytes.
/// Without it, every call must be given whole messages only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framer {
    pub desegment: bool,
    pub max_frame_length: Option<u32>,
}

impl Default for Framer {
    fn default() -> Self {
        Self {
            desegment: true,
            max_frame_length: None,
        }
    }
}

/// Header plus payload, or [None] if that doesn't fit in a [usize].
pub fn frame_length(payload_length: u32) -> Option<usize> {
    static_assertions::const_assert!(mem::size_of::<usize>() >= mem::size_of::<u32>());
    usize::try_from(payload_length)
        .ok()?
        .checked_add(HEADER_LENGTH)
}

impl Framer {
    fn wait_for(&self, src: &mut BytesMut, required: usize) -> Result<Option<RawMessage>, FrameError> {
        let available = src.len();
        match self.desegment {
            true => {
                trace!(available, required, "suspending until more bytes arrive");
                src.reserve((required - available).min(MAX_RESERVE));
                Ok(None)
            }
            false => Err(FrameError::SpansSegments {
                required,
                available,
            }),
        }
    }
}

impl tokio_util::codec::Decoder for Framer {
    type Item = RawMessage;

    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // Read the header, or ask for more bytes
        let Some(header) = Header::peek(src) else {
            return self.wait_for(src, HEADER_LENGTH);
        };

        // Check for malicious header lengths
        let advertised = header.length.get();
        if let Some(threshold) = self.max_frame_length {
            if advertised > threshold {
                return Err(FrameError::RejectedFrameLength {
                    advertised,
                    threshold,
                });
            }
        }

        let len_required = frame_length(advertised).ok_or(FrameError::MalformedLength {
            payload_length: advertised,
        })?;
        let len_collected = src.len();

        let frame = match len_collected.cmp(&len_required) {
            cmp::Ordering::Less => return self.wait_for(src, len_required),
            // we have an entire frame - take it from the buffer
            cmp::Ordering::Equal => src.split(),
            // take just our frame from the buffer
            cmp::Ordering::Greater => src.split_to(len_required),
        };
        trace!(command = %header.command_lossy(), len = len_required, "framed");

        Ok(Some(RawMessage {
            header,
            bytes: frame.freeze(),
        }))
    }
}
