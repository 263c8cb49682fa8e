//! Wire representations.
//! Endianness conversions are not done while parsing for the most part, we just store that information in the type system.
//!
//! Almost all integers are encoded in little endian. Only IP or port number are encoded big endian. All field sizes are numbers of bytes.
// https://en.bitcoin.it/wiki/Protocol_documentation#Common_structures
//
// Goals for this module are
// - be fairly direct translations of the protocol documentation
// - parse exactly what is on the wire, so that `deparse(parse(x)) == x` even for oddly encoded input
//   (non-minimal var ints in particular)
// - never read past the end of the input, and never loop more times than the input could satisfy

use std::net;

use bitcoin_hashes::{sha256d, Hash as _};
use nom::{error::ErrorKind, Parser as _};
use tap::{Conv as _, Tap as _, TryConv as _};
use zerocopy::{
    byteorder::{
        little_endian::{I64 as I64le, U16 as U16le, U32 as U32le, U64 as U64le},
        network_endian::{U128 as U128netwk, U16 as U16netwk},
    },
    AsBytes as _,
};

/// The payload length field is a `u32`, so no length inside a payload can exceed this.
pub const MAX_PAYLOAD_LENGTH: u64 = u32::MAX as u64;

/// Size of [Header] on the wire.
pub const HEADER_LENGTH: usize = 4 + 12 + 4 + 4;

/// Decode and encode this struct on the wire according to the protocol.
/// This is for bit interpretation and *not* validation, as far as possible.
pub trait Transcode<'a> {
    /// Attempt to deserialize this struct.
    /// Running out of input is reported as [nom::Err::Incomplete].
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT>
    where
        Self: Sized;
    /// The length of this struct when serialized.
    /// For a parsed struct, this is exactly the number of bytes parsing consumed.
    fn deparsed_len(&self) -> usize;
    /// Serialize this struct.
    /// # Panics
    /// Implementations may panic if `output.len() < self.deparsed_len()`
    fn deparse(&self, output: &mut [u8]);
}

// bargain bucket derive macro
macro_rules! transcode_each_field {
    // Capture struct definition
    (
        $(#[$struct_meta:meta])*
        $struct_vis:vis struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field_name:ident: $field_ty:ty,
            )*
        }
    ) => {
        // Passthrough the struct definition
        $(#[$struct_meta])*
        $struct_vis struct $struct_name {
            $(
                $(#[$field_meta])*
                $field_vis $field_name: $field_ty,
            )*
        }

        #[automatically_derived]
        impl<'__input> $crate::wire::Transcode<'__input> for $struct_name {
            fn parse<IResultErrT: $crate::wire::ParseError<'__input>>(
                input: &'__input [u8],
            ) -> nom::IResult<&'__input [u8], $struct_name, IResultErrT> {
                use nom::Parser as _;
                nom::sequence::tuple((
                    // We must refer to $field_ty here to get the macro to repeat as desired
                    $(<$field_ty as $crate::wire::Transcode>::parse::<IResultErrT>,)*
                )).map(
                    |(
                        $($field_name,)*
                    )| $struct_name {
                        $($field_name,)*
                    },
                )
                .parse(input)
            }

            fn deparsed_len(&self) -> usize {
                [
                    $(<$field_ty as $crate::wire::Transcode>::deparsed_len(&self.$field_name),)*
                ].into_iter().sum()
            }

            fn deparse(&self, output: &mut [u8]) {
                $(let output = <$field_ty as $crate::wire::TranscodeExt>::deparse_into_and_advance(
                    &self.$field_name,
                    output
                );)*
                let _ = output;
            }
        }
    };
}
pub(crate) use transcode_each_field;

/////////////////////////////////////////////////////////////////////////
// Structs transcribed from https://en.bitcoin.it/wiki/Protocol_documentation //
/////////////////////////////////////////////////////////////////////////

transcode_each_field! {
/// Message header for all protocol packets
// https://en.bitcoin.it/wiki/Protocol_documentation#Message_structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Magic value indicating message origin network
    pub magic: U32le,
    /// ASCII string identifying the packet content, NULL padded
    pub command: [u8; 12],
    /// Length of payload in number of bytes
    pub length: U32le,
    /// First 4 bytes of sha256(sha256(payload)). Carried, never checked.
    pub checksum: [u8; 4],
}}

impl Header {
    /// Read a header from the front of `bytes`, if there are enough of them.
    pub fn peek(bytes: &[u8]) -> Option<Self> {
        Self::parse::<nom::error::Error<_>>(bytes)
            .ok()
            .map(|(_, header)| header)
    }

    pub fn network(&self) -> Option<crate::constants::Magic> {
        crate::constants::Magic::try_from(self.magic.get()).ok()
    }

    pub fn command(&self) -> Option<crate::constants::commands::Command> {
        crate::constants::commands::Command::match_field(&self.command)
    }

    /// The command field with NUL padding (and anything after it) removed.
    pub fn command_lossy(&self) -> String {
        let end = self
            .command
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.command.len());
        String::from_utf8_lossy(&self.command[..end]).into_owned()
    }
}

transcode_each_field! {
/// When a network address is needed somewhere, this structure is used. Network addresses are not prefixed with a timestamp in the version message.
// https://en.bitcoin.it/wiki/Protocol_documentation#Network_address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkAddress {
    /// same service(s) listed in version.
    pub services: U64le,
    /// IPv6 address. Network byte order. The first Bitcoin client only supported IPv4 and only read the last 4 bytes to get the IPv4 address. However, the IPv4 address is written into the message as a 16 byte IPv4-mapped IPv6 address
    /// (12 bytes 00 00 00 00 00 00 00 00 00 00 FF FF, followed by the 4 bytes of the IPv4 address).
    pub ipv6: U128netwk,
    /// port number, network byte order
    pub port: U16netwk,
}}

impl NetworkAddress {
    pub fn new(services: u64, ip_address: net::IpAddr, port: u16) -> Self {
        Self {
            services: services.into(),
            ipv6: match ip_address {
                net::IpAddr::V4(v4) => v4.to_ipv6_mapped(),
                net::IpAddr::V6(v6) => v6,
            }
            .conv::<u128>()
            .into(),
            port: port.into(),
        }
    }

    pub fn ip_addr(&self) -> net::Ipv6Addr {
        self.ipv6.get().into()
    }

    pub fn services(&self) -> crate::constants::Services {
        crate::constants::Services::from_bits_truncate(self.services.get())
    }
}

transcode_each_field! {
/// Entry of an `addr` message.
// https://en.bitcoin.it/wiki/Protocol_documentation#addr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampedAddress {
    /// Standard UNIX timestamp in seconds.
    pub timestamp: U32le,
    pub address: NetworkAddress,
}}

transcode_each_field! {
/// Inventory vectors are used for notifying other nodes about objects they have or data which is being requested.
// https://en.bitcoin.it/wiki/Protocol_documentation#Inventory_Vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InventoryVector {
    /// See [crate::constants::InvType]. Unknown values are kept as-is.
    pub kind: U32le,
    /// Hash of the object
    pub hash: sha256d::Hash,
}}

impl InventoryVector {
    pub fn kind(&self) -> Option<crate::constants::InvType> {
        crate::constants::InvType::try_from(self.kind.get()).ok()
    }
}

/////////////////////
// Fancier structs //
/////////////////////

/// How many bytes a [VarInt] took on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarIntWidth {
    /// The value is the discriminator byte itself.
    U8,
    /// `0xFD` followed by a `u16`.
    U16,
    /// `0xFE` followed by a `u32`.
    U32,
    /// `0xFF` followed by a `u64`.
    U64,
}

impl VarIntWidth {
    pub const fn encoded_len(self) -> usize {
        match self {
            VarIntWidth::U8 => 1,
            VarIntWidth::U16 => 3,
            VarIntWidth::U32 => 5,
            VarIntWidth::U64 => 9,
        }
    }

    /// The narrowest encoding for `value`.
    pub const fn minimal(value: u64) -> Self {
        // a more direct translation of protocol documentation
        #[allow(clippy::match_overlapping_arm)]
        match value {
            ..=0xFC => VarIntWidth::U8,
            ..=0xFFFF => VarIntWidth::U16,
            ..=0xFFFF_FFFF => VarIntWidth::U32,
            _ => VarIntWidth::U64,
        }
    }
}

/// Integer can be encoded depending on the represented value to save space.
/// Variable length integers always precede an array/vector of a type of data that may vary in length.
/// Longer numbers are encoded in little endian.
///
/// Encodings need not be minimal (`FD 01 00` is a valid encoding of 1), so the width that was actually used is kept.
// https://en.bitcoin.it/wiki/Protocol_documentation#Variable_length_integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display(fmt = "{}", value)]
pub struct VarInt {
    pub value: u64,
    pub width: VarIntWidth,
}

impl VarInt {
    /// # Panics
    /// If `value` doesn't fit in `width`
    pub fn with_width(value: u64, width: VarIntWidth) -> Self {
        let max = match width {
            VarIntWidth::U8 => 0xFC,
            VarIntWidth::U16 => u16::MAX.into(),
            VarIntWidth::U32 => u32::MAX.into(),
            VarIntWidth::U64 => u64::MAX,
        };
        assert!(value <= max, "{value} doesn't fit in a {width:?} var int");
        Self { value, width }
    }

    pub fn encoded_len(&self) -> usize {
        self.width.encoded_len()
    }

    /// The value as a length within a payload, if it could possibly be one.
    pub fn as_payload_len(&self) -> Option<usize> {
        match self.value <= MAX_PAYLOAD_LENGTH {
            true => self.value.try_into().ok(),
            false => None,
        }
    }
}

impl From<u64> for VarInt {
    fn from(value: u64) -> Self {
        Self {
            value,
            width: VarIntWidth::minimal(value),
        }
    }
}

impl<'a> Transcode<'a> for VarInt {
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        use nom::number::streaming::{le_u16, le_u32, le_u64, le_u8};
        let (rest, discriminator) = le_u8::<_, IResultErrT>(input)?;
        let (rest, value, width) = match discriminator {
            0xFD => {
                let (rest, value) = le_u16::<_, IResultErrT>(rest)?;
                (rest, value.into(), VarIntWidth::U16)
            }
            0xFE => {
                let (rest, value) = le_u32::<_, IResultErrT>(rest)?;
                (rest, value.into(), VarIntWidth::U32)
            }
            0xFF => {
                let (rest, value) = le_u64::<_, IResultErrT>(rest)?;
                (rest, value, VarIntWidth::U64)
            }
            small => (rest, small.into(), VarIntWidth::U8),
        };
        Ok((rest, VarInt { value, width }))
    }

    fn deparsed_len(&self) -> usize {
        self.encoded_len()
    }

    fn deparse(&self, output: &mut [u8]) {
        if match self.width {
            VarIntWidth::U8 => {
                output[0] = self.value as u8;
                Some(())
            }
            VarIntWidth::U16 => {
                output[0] = 0xFD;
                U16le::new(self.value as _).write_to_prefix(&mut output[1..])
            }
            VarIntWidth::U32 => {
                output[0] = 0xFE;
                U32le::new(self.value as _).write_to_prefix(&mut output[1..])
            }
            VarIntWidth::U64 => {
                output[0] = 0xFF;
                U64le::new(self.value).write_to_prefix(&mut output[1..])
            }
        }
        .is_none()
        {
            panic!("attempted to deparse into a buffer too small for VarInt")
        }
    }
}

/// Not enough bytes to decode a value, see [varint_at].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("insufficient data")]
pub struct InsufficientData {
    /// How many more bytes are required, when that is known.
    pub needed: Option<usize>,
}

/// Decode the var int starting at `offset` in `buffer`.
/// The encoded length is derived solely from the discriminator byte.
pub fn varint_at(buffer: &[u8], offset: usize) -> Result<VarInt, InsufficientData> {
    let input = buffer.get(offset..).unwrap_or_default();
    match VarInt::parse::<nom::error::Error<_>>(input) {
        Ok((_, varint)) => Ok(varint),
        Err(nom::Err::Incomplete(nom::Needed::Size(n))) => Err(InsufficientData {
            needed: Some(n.get()),
        }),
        // the var int parser has no failure modes besides running out of input
        Err(_) => Err(InsufficientData { needed: None }),
    }
}

/// A var int length followed by that many bytes.
/// Used for scripts, and for variable length strings, which are not required to be text.
// https://en.bitcoin.it/wiki/Protocol_documentation#Variable_length_string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarBytes {
    pub len: VarInt,
    pub bytes: Vec<u8>,
}

impl VarBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            len: bytes.len().try_conv::<u64>().expect("very large string").into(),
            bytes,
        }
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl<'a> Transcode<'a> for VarBytes {
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        let (rest, len) = VarInt::parse::<IResultErrT>(input)?;
        let Some(n) = len.as_payload_len() else {
            return Err(nom::Err::Failure(IResultErrT::from_external_error(
                input,
                ErrorKind::TooLarge,
                LengthOverflow { declared: len.value },
            )));
        };
        nom::bytes::streaming::take::<_, _, IResultErrT>(n)
            .map(|bytes: &[u8]| VarBytes {
                len,
                bytes: bytes.to_vec(),
            })
            .parse(rest)
    }

    fn deparsed_len(&self) -> usize {
        self.len.deparsed_len() + self.bytes.len()
    }

    fn deparse(&self, output: &mut [u8]) {
        let output = self.len.deparse_into_and_advance(output);
        output[..self.bytes.len()].copy_from_slice(&self.bytes)
    }
}

/// A var int count followed by that many items.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarList<T> {
    pub count: VarInt,
    pub items: Vec<T>,
}

impl<T> VarList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len().try_conv::<u64>().expect("very long list").into(),
            items,
        }
    }
}

impl<'a, T> Transcode<'a> for VarList<T>
where
    T: Transcode<'a>,
{
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        let (rest, count) = VarInt::parse::<IResultErrT>(input)?;
        let (rest, items) = counted::<T, IResultErrT>(count.value).parse(rest)?;
        Ok((rest, VarList { count, items }))
    }

    fn deparsed_len(&self) -> usize {
        self.count.deparsed_len()
            + self
                .items
                .iter()
                .map(Transcode::deparsed_len)
                .sum::<usize>()
    }

    fn deparse(&self, output: &mut [u8]) {
        let mut output = self.count.deparse_into_and_advance(output);
        for item in &self.items {
            output = item.deparse_into_and_advance(output);
        }
    }
}

/// Room to set aside for `count` items of `T`, given `input_length` bytes to parse them from.
///
/// Every item takes at least a byte of input, so the reservation never holds more
/// items than there are bytes, and never takes more memory than the input does.
fn preallocation<T>(count: u64, input_length: usize) -> usize {
    let fit = input_length / std::mem::size_of::<T>().max(1);
    count.try_conv::<usize>().unwrap_or(usize::MAX).min(fit).min(input_length)
}

/// Parse `count` items back to back.
///
/// `count` comes off the wire, so it is never trusted for allocation, and the
/// first item that fails to parse ends the loop: a count of `u64::MAX` against
/// a short input fails after one attempt.
pub fn counted<'a, T, IResultErrT>(
    count: u64,
) -> impl FnMut(&'a [u8]) -> nom::IResult<&'a [u8], Vec<T>, IResultErrT>
where
    T: Transcode<'a>,
    IResultErrT: ParseError<'a>,
{
    move |mut input: &'a [u8]| {
        let mut items = Vec::with_capacity(preallocation::<T>(count, input.len()));
        for _ in 0..count {
            let (rest, item) = T::parse::<IResultErrT>(input)?;
            if rest.len() == input.len() {
                // zero sized items would spin until `count` runs out
                return Err(nom::Err::Error(IResultErrT::from_error_kind(
                    input,
                    ErrorKind::Count,
                )));
            }
            items.push(item);
            input = rest;
        }
        Ok((input, items))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame<BodyT> {
    pub header: Header,
    pub body: BodyT,
}

impl<'a, BodyT> Transcode<'a> for Frame<BodyT>
where
    BodyT: Transcode<'a>,
{
    /// Does *not* validate checksum or length - actual frame chunking is not our responsibility
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        let (rest, header) = Header::parse::<IResultErrT>(input)?;
        let (rest, body) = BodyT::parse::<IResultErrT>(rest)?;
        Ok((rest, Frame { header, body }))
    }

    fn deparsed_len(&self) -> usize {
        self.header.deparsed_len() + self.body.deparsed_len()
    }

    /// Does *not* set checksum or length
    /// # Panics
    /// if `output.len() < self.deparsed_len()`
    fn deparse(&self, output: &mut [u8]) {
        let output = self.header.deparse_into_and_advance(output);
        self.body.deparse_into_and_advance(output);
    }
}

impl<'a, BodyT> Frame<BodyT>
where
    BodyT: Transcode<'a>,
{
    /// A frame for `body` with the length and checksum filled in.
    /// # Panics
    /// - if `self.body.deparsed_len() > u32::MAX`
    pub fn new(magic: crate::constants::Magic, command: [u8; 12], body: BodyT) -> Self {
        Self {
            header: Header {
                magic: magic.conv::<u32>().into(),
                command,
                length: 0.into(),
                checksum: [0; 4],
            },
            body,
        }
        .tap_mut(|frame| {
            frame.deparse_valid_to_vec();
        })
    }

    /// Sets checksum and length on self and in the buffer
    /// # Panics
    /// - if `output.len() < self.deparsed_len()`
    /// - if `self.body.deparsed_len() > u32::MAX`
    pub fn deparse_valid(&mut self, output: &mut [u8]) {
        self.deparse(output);
        let checksum = sha256d::Hash::hash(&output[HEADER_LENGTH..self.deparsed_len()]);
        self.header.checksum = [checksum[0], checksum[1], checksum[2], checksum[3]];
        self.header.length = self
            .body
            .deparsed_len()
            .try_conv::<u32>()
            .expect("frame body too large")
            .into();
        self.header.deparse(output);
    }

    /// Sets checksum and length on self and in the buffer
    /// # Panics
    /// - if `self.body.deparsed_len() > u32::MAX`
    pub fn deparse_valid_to_vec(&mut self) -> Vec<u8> {
        let mut output = vec![0; self.deparsed_len()];
        self.deparse_valid(&mut output);
        output
    }
}

///////////////////////////////
// Primitive implementations //
///////////////////////////////

/// Transcode using [zerocopy::FromBytes]/[zerocopy::AsBytes]
macro_rules! transcode_primitive {
    ($($ty:ty $({ $array_len:ident })?),* $(,)?) => {
        $(
            #[automatically_derived]
            impl<'a $(, const $array_len: usize)?> Transcode<'a> for $ty {
                fn parse<IResultErrT: ParseError<'a>>(input: &'a [u8]) -> nom::IResult<&'a[u8], Self, IResultErrT> {
                    match <$ty as zerocopy::FromBytes>::read_from_prefix(input) {
                        Some(t) => Ok((&input[std::mem::size_of::<$ty>()..], t)),
                        None => Err(nom::Err::Incomplete(nom::Needed::new(
                            std::mem::size_of::<$ty>() - input.len(),
                        ))),
                    }
                }

                fn deparsed_len(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }

                fn deparse(&self, buffer: &mut [u8]) {
                    <$ty as zerocopy::AsBytes>::write_to_prefix(self, buffer)
                        .expect(concat!(
                            "attempted to deparse into a buffer too small for ",
                            stringify!($ty)
                        ))
                }
            }
        )*
    };
}

transcode_primitive!(U32le, U64le, I64le, U128netwk, U16netwk, [u8; N] { N });

impl<'a> Transcode<'a> for sha256d::Hash {
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        <[u8; 32]>::parse::<IResultErrT>
            .map(sha256d::Hash::from_inner)
            .parse(input)
    }

    fn deparsed_len(&self) -> usize {
        sha256d::Hash::LEN
    }

    fn deparse(&self, output: &mut [u8]) {
        output[..sha256d::Hash::LEN].copy_from_slice(self.as_inner())
    }
}

/// Payload-less messages
impl<'a> Transcode<'a> for () {
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        Ok((input, ()))
    }

    fn deparsed_len(&self) -> usize {
        0
    }

    fn deparse(&self, _: &mut [u8]) {}
}

////////////
// Errors //
////////////

/// A length field declares more bytes than any payload could hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("declared length {declared} exceeds the maximum payload length")]
pub struct LengthOverflow {
    pub declared: u64,
}

/// Common constraint for [nom::IResult]'s error type.
/// This is a single place to add further errors, and allows us to compose parsing automatically
pub trait ParseError<'a>:
    nom::error::ParseError<&'a [u8]> + nom::error::FromExternalError<&'a [u8], LengthOverflow>
{
}

impl<'a, T> ParseError<'a> for T where
    T: nom::error::ParseError<&'a [u8]> + nom::error::FromExternalError<&'a [u8], LengthOverflow>
{
}

/// Error used when parsing message bodies.
/// Remembers where parsing stopped, so that callers holding the whole input can recover an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireError {
    /// Number of input bytes left when the error occurred.
    pub remaining: usize,
    pub kind: WireErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorKind {
    Nom(ErrorKind),
    LengthOverflow(LengthOverflow),
}

impl WireError {
    /// Offset into `input` where this error occurred.
    pub fn offset_in(&self, input: &[u8]) -> usize {
        input.len().saturating_sub(self.remaining)
    }
}

impl<'a> nom::error::ParseError<&'a [u8]> for WireError {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        Self {
            remaining: input.len(),
            kind: WireErrorKind::Nom(kind),
        }
    }

    // keep the innermost error, which is where the offset is meaningful
    fn append(_: &'a [u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a> nom::error::FromExternalError<&'a [u8], LengthOverflow> for WireError {
    fn from_external_error(input: &'a [u8], _: ErrorKind, e: LengthOverflow) -> Self {
        Self {
            remaining: input.len(),
            kind: WireErrorKind::LengthOverflow(e),
        }
    }
}

///////////
// Utils //
///////////

pub(crate) trait TranscodeExt<'a>: Transcode<'a> {
    fn deparse_into_and_advance<'output>(&self, output: &'output mut [u8]) -> &'output mut [u8] {
        self.deparse(output);
        &mut output[self.deparsed_len()..]
    }
    fn deparse_to_vec(&self) -> Vec<u8> {
        vec![0u8; self.deparsed_len()].tap_mut(|it| self.deparse(it))
    }
}

impl<'a, T> TranscodeExt<'a> for T where T: Transcode<'a> {}
