use bitcoin_hashes::sha256d;

use crate::{
    constants::commands::Command,
    message::{Addr, Block, GetBlocks, GetData, GetHeaders, Inv, Transaction, Version},
    wire::{LengthOverflow, Transcode, WireError, WireErrorKind},
};

/// A parsed payload.
#[derive(Debug, Clone, PartialEq, Eq, enum_as_inner::EnumAsInner)]
pub enum MessageBody {
    Version(Version),
    Addr(Addr),
    Inv(Inv),
    GetData(GetData),
    GetBlocks(GetBlocks),
    GetHeaders(GetHeaders),
    Tx(Transaction),
    Block(Block),
    /// Commands without a payload, or whose payload we accept without interpreting.
    Uninterpreted(Command),
}

impl MessageBody {
    pub fn command(&self) -> Command {
        match self {
            MessageBody::Version(_) => Command::Version,
            MessageBody::Addr(_) => Command::Addr,
            MessageBody::Inv(_) => Command::Inv,
            MessageBody::GetData(_) => Command::GetData,
            MessageBody::GetBlocks(_) => Command::GetBlocks,
            MessageBody::GetHeaders(_) => Command::GetHeaders,
            MessageBody::Tx(_) => Command::Tx,
            MessageBody::Block(_) => Command::Block,
            MessageBody::Uninterpreted(command) => *command,
        }
    }

    /// Hashes which identify the objects this message carries, for display.
    pub fn object_ids(&self) -> Vec<sha256d::Hash> {
        match self {
            MessageBody::Tx(tx) => vec![tx.txid()],
            MessageBody::Block(block) => vec![block.header.block_hash()],
            _ => vec![],
        }
    }
}

/// A payload parser's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub body: MessageBody,
    /// Number of payload bytes the parser interpreted.
    /// Anything after this is left alone.
    pub consumed: usize,
}

/// A payload whose length was trusted by framing doesn't hold what its command says it should.
/// Only the message at hand is affected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BodyError {
    #[error("{command} payload of {payload_length} bytes ends before its body does")]
    Truncated {
        command: Command,
        payload_length: usize,
        /// More bytes the parser wanted, when known.
        needed: Option<usize>,
    },
    #[error("{command} payload declares a length of {declared} at offset {offset}, which no payload could hold")]
    MalformedLength {
        command: Command,
        offset: usize,
        declared: u64,
    },
    #[error("couldn't parse {command} payload at offset {offset}: {kind:?}")]
    Invalid {
        command: Command,
        offset: usize,
        kind: nom::error::ErrorKind,
    },
}

impl BodyError {
    /// Offset into the payload of the bytes at fault.
    /// A truncated body is wrong as a whole, so that's the start of the payload.
    pub fn offset(&self) -> usize {
        match self {
            BodyError::Truncated { .. } => 0,
            BodyError::MalformedLength { offset, .. } | BodyError::Invalid { offset, .. } => {
                *offset
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Not fatal: the message boundary is still good, we just don't know what's inside.
    #[error("unrecognised command string {0:?}")]
    UnknownCommand([u8; 12]),
    #[error(transparent)]
    Body(#[from] BodyError),
}

/// Pick the parser for `command_field`, and run it over `payload` (which excludes the header).
pub fn dispatch(command_field: &[u8; 12], payload: &[u8]) -> Result<Parsed, DispatchError> {
    let command = Command::match_field(command_field)
        .ok_or(DispatchError::UnknownCommand(*command_field))?;
    Ok(parse_body(command, payload)?)
}

/// Run the parser for `command` over `payload`.
pub fn parse_body(command: Command, payload: &[u8]) -> Result<Parsed, BodyError> {
    use Command as C;
    match command {
        C::Version => parse_as(command, payload, MessageBody::Version),
        C::Addr => parse_as(command, payload, MessageBody::Addr),
        C::Inv => parse_as(command, payload, MessageBody::Inv),
        C::GetData => parse_as(command, payload, MessageBody::GetData),
        C::GetBlocks => parse_as(command, payload, MessageBody::GetBlocks),
        C::GetHeaders => parse_as(command, payload, MessageBody::GetHeaders),
        C::Tx => parse_as(command, payload, MessageBody::Tx),
        C::Block => parse_as(command, payload, MessageBody::Block),
        C::Verack
        | C::GetAddr
        | C::Ping
        | C::NotFound
        | C::Headers
        | C::Mempool
        | C::CheckOrder
        | C::SubmitOrder
        | C::Reply
        | C::Pong
        | C::FilterLoad
        | C::FilterAdd
        | C::FilterClear
        | C::MerkleBlock
        | C::Reject
        | C::Alert => Ok(Parsed {
            body: MessageBody::Uninterpreted(command),
            consumed: 0,
        }),
    }
}

fn parse_as<'a, T>(
    command: Command,
    payload: &'a [u8],
    wrap: fn(T) -> MessageBody,
) -> Result<Parsed, BodyError>
where
    T: Transcode<'a>,
{
    match T::parse::<WireError>(payload) {
        Ok((rest, body)) => Ok(Parsed {
            body: wrap(body),
            consumed: payload.len() - rest.len(),
        }),
        // The whole payload is here, so running out means the payload is short
        Err(nom::Err::Incomplete(needed)) => Err(BodyError::Truncated {
            command,
            payload_length: payload.len(),
            needed: match needed {
                nom::Needed::Unknown => None,
                nom::Needed::Size(n) => Some(n.get()),
            },
        }),
        Err(nom::Err::Error(error) | nom::Err::Failure(error)) => {
            let offset = error.offset_in(payload);
            Err(match error.kind {
                WireErrorKind::LengthOverflow(LengthOverflow { declared }) => {
                    BodyError::MalformedLength {
                        command,
                        offset,
                        declared,
                    }
                }
                WireErrorKind::Nom(kind) => BodyError::Invalid {
                    command,
                    offset,
                    kind,
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::commands::fields,
        message::tests::{sample_block, sample_transaction},
        wire::{transcoding::hex2bin, TranscodeExt as _, VarInt},
    };

    use pretty_assertions::assert_eq;

    #[test]
    fn dispatches_by_prefix() {
        let tx = sample_transaction(2, 1);
        let payload = tx.deparse_to_vec();
        let parsed = dispatch(b"tx\0\0\0\0\0\0\0\0\0\0", &payload).unwrap();
        assert_eq!(parsed.consumed, payload.len());
        assert_eq!(parsed.body.into_tx().unwrap(), tx);
    }

    #[test]
    fn block_reports_consumed_length() {
        let block = sample_block(3);
        let mut payload = block.deparse_to_vec();
        payload.extend([0; 3]);
        let parsed = dispatch(&fields::BLOCK, &payload).unwrap();
        assert_eq!(parsed.consumed, payload.len() - 3);
        assert_eq!(parsed.body.command(), Command::Block);
        assert_eq!(
            parsed.body.object_ids(),
            vec![block.header.block_hash()]
        );
    }

    #[test]
    fn payload_less_commands_consume_nothing() {
        for field in [fields::VERACK, fields::PING, fields::ALERT] {
            let parsed = dispatch(&field, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
            assert_eq!(parsed.consumed, 0);
            assert!(parsed.body.as_uninterpreted().is_some());
        }
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            dispatch(b"wtfmessage\0\0", &[1, 2, 3]),
            Err(DispatchError::UnknownCommand(*b"wtfmessage\0\0"))
        );
    }

    #[test]
    fn short_payload_is_truncated() {
        let payload = sample_transaction(1, 1).deparse_to_vec();
        let err = dispatch(&fields::TX, &payload[..payload.len() - 2]).unwrap_err();
        assert_eq!(
            err,
            DispatchError::Body(BodyError::Truncated {
                command: Command::Tx,
                payload_length: payload.len() - 2,
                needed: Some(2),
            })
        );
        let DispatchError::Body(body_error) = err else {
            unreachable!()
        };
        assert_eq!(body_error.offset(), 0);
    }

    #[test]
    fn hostile_count_is_truncated() {
        let mut payload = VarInt::from(u64::MAX).deparse_to_vec();
        payload.extend([0; 40]);
        for field in [fields::ADDR, fields::INV, fields::GETDATA] {
            assert!(matches!(
                dispatch(&field, &payload),
                Err(DispatchError::Body(BodyError::Truncated { .. }))
            ));
        }
    }

    #[test]
    fn overflowing_script_length_is_malformed_length() {
        let mut payload = hex2bin(["01 00 00 00", "01"]);
        payload.extend([0x00; 36]);
        let script_length_at = payload.len();
        payload.extend(hex2bin(["FF 00 00 00 00 01 00 00 00"])); // 2^32
        payload.extend([0x00; 16]);
        assert_eq!(
            dispatch(&fields::TX, &payload),
            Err(DispatchError::Body(BodyError::MalformedLength {
                command: Command::Tx,
                offset: script_length_at,
                declared: 1 << 32,
            }))
        );
    }

    #[test]
    fn version_trailing_bytes_are_not_consumed() {
        let mut payload = hex2bin([
            "69 00 00 00",
            "01 00 00 00 00 00 00 00",
            "11 B2 D0 50 00 00 00 00",
            "01 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 FF FF 00 00 00 00 00 00",
        ]);
        let expected = payload.len();
        payload.extend([0xAB; 4]);
        let parsed = dispatch(&fields::VERSION, &payload).unwrap();
        assert_eq!(parsed.consumed, expected);
        assert_eq!(
            parsed.body.as_version().unwrap().fields_mandatory().version.get(),
            105
        );
    }
}
