//! Message payloads.
//! Each payload is parsed from a buffer holding exactly that payload, starting at offset 0.
// https://en.bitcoin.it/wiki/Protocol_documentation#Message_types

use bitcoin_hashes::{sha256d, Hash as _};
use zerocopy::byteorder::little_endian::{I64 as I64le, U32 as U32le, U64 as U64le};

use crate::wire::{
    transcode_each_field, InventoryVector, NetworkAddress, ParseError, TimestampedAddress,
    Transcode, TranscodeExt as _, VarBytes, VarList,
};

/// First protocol version carrying the sender address, nonce and user agent.
pub const VERSION_ADDR_ME: u32 = 106;
/// First protocol version carrying the start height.
pub const VERSION_START_HEIGHT: u32 = 209;

/// Size of [BlockHeader] on the wire.
pub const BLOCK_HEADER_LENGTH: usize = 80;

transcode_each_field! {
/// Fields present in all version packets
// https://en.bitcoin.it/wiki/Protocol_documentation#version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionFieldsMandatory {
    /// Identifies protocol version being used by the node
    pub version: U32le,
    /// Bitfield of features to be enabled for this connection.
    pub services: U64le,
    /// Standard UNIX timestamp in seconds.
    pub timestamp: I64le,
    /// The network address of the node receiving this message.
    pub receiver: NetworkAddress,
}}

transcode_each_field! {
/// Fields present in all version packets at or after version 106
// https://en.bitcoin.it/wiki/Protocol_documentation#version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionFields106 {
    /// The network address of the node emitting this message.
    pub sender: NetworkAddress,
    /// Node random nonce, randomly generated every time a version packet is sent. This nonce is used to detect connections to self.
    pub nonce: U64le,
    /// User Agent (0x00 if string is 0 bytes long)
    pub user_agent: VarBytes,
}}

transcode_each_field! {
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version106 {
    pub fields_mandatory: VersionFieldsMandatory,
    pub fields_106: VersionFields106,
}}

transcode_each_field! {
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version209 {
    pub fields_mandatory: VersionFieldsMandatory,
    pub fields_106: VersionFields106,
    /// The last block received by the emitting node
    pub start_height: U32le,
}}

/// The protocol version decides which trailing fields are present.
/// Anything after the last field the version calls for is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Basic(VersionFieldsMandatory),
    Supports106(Version106),
    Supports209(Version209),
}

impl Version {
    pub fn fields_mandatory(&self) -> &VersionFieldsMandatory {
        match self {
            Version::Basic(v) => v,
            Version::Supports106(v) => &v.fields_mandatory,
            Version::Supports209(v) => &v.fields_mandatory,
        }
    }

    pub fn fields_106(&self) -> Option<&VersionFields106> {
        match self {
            Version::Basic(_) => None,
            Version::Supports106(v) => Some(&v.fields_106),
            Version::Supports209(v) => Some(&v.fields_106),
        }
    }

    pub fn start_height(&self) -> Option<u32> {
        match self {
            Version::Supports209(v) => Some(v.start_height.get()),
            _ => None,
        }
    }
}

impl<'a> Transcode<'a> for Version {
    fn parse<IResultErrT: ParseError<'a>>(
        input: &'a [u8],
    ) -> nom::IResult<&'a [u8], Self, IResultErrT> {
        let (rest, fields_mandatory) = VersionFieldsMandatory::parse::<IResultErrT>(input)?;
        let version = fields_mandatory.version.get();
        if version < VERSION_ADDR_ME {
            return Ok((rest, Version::Basic(fields_mandatory)));
        }
        let (rest, fields_106) = VersionFields106::parse::<IResultErrT>(rest)?;
        if version < VERSION_START_HEIGHT {
            return Ok((
                rest,
                Version::Supports106(Version106 {
                    fields_mandatory,
                    fields_106,
                }),
            ));
        }
        let (rest, start_height) = U32le::parse::<IResultErrT>(rest)?;
        Ok((
            rest,
            Version::Supports209(Version209 {
                fields_mandatory,
                fields_106,
                start_height,
            }),
        ))
    }

    fn deparsed_len(&self) -> usize {
        match self {
            Version::Basic(v) => v.deparsed_len(),
            Version::Supports106(v) => v.deparsed_len(),
            Version::Supports209(v) => v.deparsed_len(),
        }
    }

    fn deparse(&self, output: &mut [u8]) {
        match self {
            Version::Basic(v) => v.deparse(output),
            Version::Supports106(v) => v.deparse(output),
            Version::Supports209(v) => v.deparse(output),
        }
    }
}

transcode_each_field! {
/// Provide information on known nodes of the network.
// https://en.bitcoin.it/wiki/Protocol_documentation#addr
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Addr {
    pub addresses: VarList<TimestampedAddress>,
}}

transcode_each_field! {
/// Allows a node to advertise its knowledge of one or more objects.
// https://en.bitcoin.it/wiki/Protocol_documentation#inv
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Inv {
    pub inventory: VarList<InventoryVector>,
}}

transcode_each_field! {
/// Used in response to inv, to retrieve the content of a specific object.
// https://en.bitcoin.it/wiki/Protocol_documentation#getdata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetData {
    pub inventory: VarList<InventoryVector>,
}}

transcode_each_field! {
/// Return an inv packet containing the list of blocks starting right after the last known hash in the block locator object, up to hash_stop or 500 blocks, whichever comes first.
// https://en.bitcoin.it/wiki/Protocol_documentation#getblocks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetBlocks {
    /// Carries the protocol version. Kept opaque, nothing depends on it.
    pub version: U32le,
    /// Block locator object; newest back to genesis block (dense to start, but then sparse)
    pub locator: VarList<sha256d::Hash>,
    /// Hash of the last desired block; set to zero to get as many blocks as possible (500)
    pub hash_stop: sha256d::Hash,
}}

transcode_each_field! {
/// Return a headers packet containing the headers of blocks starting right after the last known hash in the block locator object, up to hash_stop or 2000 blocks, whichever comes first.
// https://en.bitcoin.it/wiki/Protocol_documentation#getheaders
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GetHeaders {
    pub locator: VarList<sha256d::Hash>,
    pub hash_stop: sha256d::Hash,
}}

transcode_each_field! {
// https://en.bitcoin.it/wiki/Protocol_documentation#tx
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// The hash of the referenced transaction.
    pub hash: sha256d::Hash,
    /// The index of the specific output in the transaction. The first output is 0, etc.
    pub index: U32le,
}}

transcode_each_field! {
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxIn {
    /// The previous output transaction reference
    pub previous_output: OutPoint,
    /// Computational Script for confirming transaction authorization
    pub signature_script: VarBytes,
    /// Transaction version as defined by the sender.
    pub sequence: U32le,
}}

transcode_each_field! {
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxOut {
    /// Transaction Value
    pub value: U64le,
    /// Usually contains the public key as a script setting up conditions to claim this output.
    pub script: VarBytes,
}}

transcode_each_field! {
/// tx describes a transaction.
// https://en.bitcoin.it/wiki/Protocol_documentation#tx
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transaction {
    /// Transaction data format version
    pub version: U32le,
    pub inputs: VarList<TxIn>,
    pub outputs: VarList<TxOut>,
    /// The block number or timestamp at which this transaction is unlocked
    pub lock_time: U32le,
}}

impl Transaction {
    /// Double SHA-256 of the transaction as it appeared on the wire.
    pub fn txid(&self) -> sha256d::Hash {
        sha256d::Hash::hash(&self.deparse_to_vec())
    }
}

transcode_each_field! {
// https://en.bitcoin.it/wiki/Protocol_documentation#block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHeader {
    /// Block version information (note, this is signed)
    pub version: U32le,
    /// The hash value of the previous block this particular block references
    pub prev_block: sha256d::Hash,
    /// The reference to a Merkle tree collection which is a hash of all transactions related to this block
    pub merkle_root: sha256d::Hash,
    /// A timestamp recording when this block was created (Will overflow in 2106)
    pub timestamp: U32le,
    /// The calculated difficulty target being used for this block
    pub bits: U32le,
    /// The nonce used to generate this block
    pub nonce: U32le,
}}

impl BlockHeader {
    pub fn block_hash(&self) -> sha256d::Hash {
        sha256d::Hash::hash(&self.deparse_to_vec())
    }
}

transcode_each_field! {
/// The block message is sent in response to a getdata message which requests transaction information from a block hash.
/// Transactions are parsed back to back with the `tx` parser.
// https://en.bitcoin.it/wiki/Protocol_documentation#block
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: VarList<Transaction>,
}}
