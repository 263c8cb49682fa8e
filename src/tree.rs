//! Field trees for display.
//!
//! Every field is a `(name, value, byte range)` triple, where the range is absolute within the message
//! (the header starts at 0, the payload at [HEADER_LENGTH]).
//! Records are walked after parsing, so walking can't fail: each [Dissect] impl returns the offset just past
//! what it covered, which always agrees with [Transcode::deparsed_len].

use std::{fmt, net::Ipv6Addr, ops::Range};

use bitcoin_hashes::sha256d;
use chrono::TimeZone as _;
use zerocopy::byteorder::little_endian::U64 as U64le;

use crate::{
    constants::Services,
    dispatch::MessageBody,
    message::{
        Addr, Block, GetBlocks, GetData, GetHeaders, Inv, Transaction, TxIn, TxOut, Version,
    },
    schema::{self, Base, FieldInfo},
    wire::{
        Header, InventoryVector, NetworkAddress, Transcode, VarBytes, VarInt, VarIntWidth, VarList,
        HEADER_LENGTH,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Containers carry their data in their children.
    None,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    /// A number which may be a known constant.
    Named {
        value: u32,
        name: Option<&'static str>,
    },
    Bytes(Vec<u8>),
    Text(String),
    Hash(sha256d::Hash),
    Ipv6(Ipv6Addr),
    /// Seconds since the Unix epoch.
    Time(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub info: &'static FieldInfo,
    pub range: Range<usize>,
    pub value: Value,
    /// Shown instead of `info.name`.
    pub label: Option<String>,
    pub children: Tree,
}

impl Field {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.info.name)
    }

    /// Depth first, including `self`.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &Field> + '_> {
        Box::new(std::iter::once(self).chain(self.children.walk()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

/// Something worth flagging about a message as a whole, or a range of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub info: &'static FieldInfo,
    pub severity: Severity,
    pub range: Range<usize>,
    pub message: String,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.info.name, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    fields: Vec<Field>,
}

impl Tree {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every field at every depth.
    pub fn walk(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().flat_map(Field::walk)
    }

    pub fn find(&self, info: &FieldInfo) -> Option<&Field> {
        self.walk().find(|field| field.info == info)
    }

    pub fn add(&mut self, info: &'static FieldInfo, range: Range<usize>, value: Value) -> &mut Field {
        let ix = self.fields.len();
        self.fields.push(Field {
            info,
            range,
            value,
            label: None,
            children: Tree::default(),
        });
        &mut self.fields[ix]
    }

    pub fn add_subtree(
        &mut self,
        info: &'static FieldInfo,
        range: Range<usize>,
        build: impl FnOnce(&mut Tree),
    ) -> &mut Field {
        let field = self.add(info, range, Value::None);
        build(&mut field.children);
        field
    }

    /// Add a fixed width field, returning the offset after it.
    fn fixed(&mut self, info: &'static FieldInfo, offset: usize, len: usize, value: Value) -> usize {
        self.add(info, offset..offset + len, value);
        offset + len
    }

    fn hash(&mut self, info: &'static FieldInfo, offset: usize, hash: &sha256d::Hash) -> usize {
        self.fixed(info, offset, 32, Value::Hash(*hash))
    }

    /// A one byte var int covers its byte.
    /// Wider ones cover only the value after the discriminator.
    fn var_int(&mut self, info: &'static FieldInfo, offset: usize, var_int: &VarInt) -> usize {
        let value = var_int.value;
        let (range, value) = match var_int.width {
            VarIntWidth::U8 => (offset..offset + 1, Value::U8(value as u8)),
            VarIntWidth::U16 => (offset + 1..offset + 3, Value::U16(value as u16)),
            VarIntWidth::U32 => (offset + 1..offset + 5, Value::U32(value as u32)),
            VarIntWidth::U64 => (offset + 1..offset + 9, Value::U64(value)),
        };
        self.add(info, range, value);
        offset + var_int.encoded_len()
    }

    fn services(&mut self, info: &'static FieldInfo, offset: usize, services: U64le) -> usize {
        let flags = Services::from_bits_truncate(services.get());
        self.add(info, offset..offset + 8, Value::U64(services.get()))
            .children
            .add(
                &schema::SERVICES_NETWORK,
                offset..offset + 8,
                Value::Bool(flags.contains(Services::NODE_NETWORK)),
            );
        offset + 8
    }

    fn address(&mut self, info: &'static FieldInfo, offset: usize, address: &NetworkAddress) -> usize {
        let end = offset + address.deparsed_len();
        self.add_subtree(info, offset..end, |tree| {
            let offset = tree.services(&schema::ADDRESS_SERVICES, offset, address.services);
            let offset = tree.fixed(
                &schema::ADDRESS_ADDRESS,
                offset,
                16,
                Value::Ipv6(address.ip_addr()),
            );
            tree.fixed(
                &schema::ADDRESS_PORT,
                offset,
                2,
                Value::U16(address.port.get()),
            );
        });
        end
    }

    /// Length and text of a variable length string.
    fn string(&mut self, info: &'static FieldInfo, offset: usize, string: &VarBytes) -> usize {
        let end = offset + string.deparsed_len();
        self.add_subtree(info, offset..end, |tree| {
            let offset = tree.var_int(&schema::STRING_LENGTH, offset, &string.len);
            tree.add(
                &schema::STRING_VALUE,
                offset..end,
                Value::Text(string.to_string_lossy()),
            );
        });
        end
    }

    /// A script: its length, then its bytes.
    fn script(
        &mut self,
        length_info: &'static FieldInfo,
        info: &'static FieldInfo,
        offset: usize,
        script: &VarBytes,
    ) -> usize {
        let offset = self.var_int(length_info, offset, &script.len);
        self.fixed(
            info,
            offset,
            script.bytes.len(),
            Value::Bytes(script.bytes.clone()),
        )
    }

    fn inventory(
        &mut self,
        [count, vector, kind, hash]: [&'static FieldInfo; 4],
        offset: usize,
        inventory: &VarList<InventoryVector>,
    ) -> usize {
        let mut offset = self.var_int(count, offset, &inventory.count);
        for item in &inventory.items {
            let end = offset + item.deparsed_len();
            self.add_subtree(vector, offset..end, |tree| {
                let offset = tree.fixed(
                    kind,
                    offset,
                    4,
                    Value::Named {
                        value: item.kind.get(),
                        name: item.kind().map(<&'static str>::from),
                    },
                );
                tree.hash(hash, offset, &item.hash);
            });
            offset = end;
        }
        offset
    }

    fn locator(
        &mut self,
        [count, start, stop]: [&'static FieldInfo; 3],
        offset: usize,
        locator: &VarList<sha256d::Hash>,
        hash_stop: &sha256d::Hash,
    ) -> usize {
        let mut offset = self.var_int(count, offset, &locator.count);
        for hash in &locator.items {
            offset = self.hash(start, offset, hash);
        }
        self.hash(stop, offset, hash_stop)
    }
}

/// Describe a parsed record as fields.
pub trait Dissect {
    /// Add fields for `self`, which starts at `offset`.
    /// Returns the offset just past `self`.
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize;
}

impl Dissect for Header {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let offset = tree.fixed(
            &schema::MAGIC,
            offset,
            4,
            Value::Named {
                // shown in the order it appears on the wire
                value: self.magic.get().swap_bytes(),
                name: self.network().map(<&'static str>::from),
            },
        );
        let offset = tree.fixed(
            &schema::COMMAND,
            offset,
            12,
            Value::Text(self.command_lossy()),
        );
        let offset = tree.fixed(&schema::LENGTH, offset, 4, Value::U32(self.length.get()));
        tree.fixed(
            &schema::CHECKSUM,
            offset,
            4,
            Value::U32(u32::from_be_bytes(self.checksum)),
        )
    }
}

impl Dissect for Version {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_VERSION, offset..end, |tree| {
            let mandatory = self.fields_mandatory();
            let offset = tree.fixed(
                &schema::VERSION_VERSION,
                offset,
                4,
                Value::U32(mandatory.version.get()),
            );
            let offset = tree.services(&schema::VERSION_SERVICES, offset, mandatory.services);
            let offset = tree.fixed(
                &schema::VERSION_TIMESTAMP,
                offset,
                8,
                Value::Time(mandatory.timestamp.get()),
            );
            let offset = tree.address(&schema::VERSION_ADDR_YOU, offset, &mandatory.receiver);
            let Some(fields_106) = self.fields_106() else {
                return;
            };
            let offset = tree.address(&schema::VERSION_ADDR_ME, offset, &fields_106.sender);
            let offset = tree.fixed(
                &schema::VERSION_NONCE,
                offset,
                8,
                Value::U64(fields_106.nonce.get()),
            );
            let offset = tree.string(&schema::VERSION_USER_AGENT, offset, &fields_106.user_agent);
            if let Some(start_height) = self.start_height() {
                tree.fixed(
                    &schema::VERSION_START_HEIGHT,
                    offset,
                    4,
                    Value::U32(start_height),
                );
            }
        });
        end
    }
}

impl Dissect for Addr {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_ADDR, offset..end, |tree| {
            let mut offset = tree.var_int(&schema::ADDR_COUNT, offset, &self.addresses.count);
            for entry in &self.addresses.items {
                let address_end = offset + entry.deparsed_len();
                tree.add_subtree(&schema::ADDR_ADDRESS, offset..address_end, |tree| {
                    let offset = tree.fixed(
                        &schema::ADDR_TIMESTAMP,
                        offset,
                        4,
                        Value::Time(entry.timestamp.get().into()),
                    );
                    let offset = tree.services(&schema::ADDRESS_SERVICES, offset, entry.address.services);
                    let offset = tree.fixed(
                        &schema::ADDRESS_ADDRESS,
                        offset,
                        16,
                        Value::Ipv6(entry.address.ip_addr()),
                    );
                    tree.fixed(
                        &schema::ADDRESS_PORT,
                        offset,
                        2,
                        Value::U16(entry.address.port.get()),
                    );
                });
                offset = address_end;
            }
        });
        end
    }
}

impl Dissect for Inv {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_INV, offset..end, |tree| {
            tree.inventory(
                [
                    &schema::INV_COUNT,
                    &schema::INV_VECTOR,
                    &schema::INV_TYPE,
                    &schema::INV_HASH,
                ],
                offset,
                &self.inventory,
            );
        });
        end
    }
}

impl Dissect for GetData {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_GETDATA, offset..end, |tree| {
            tree.inventory(
                [
                    &schema::GETDATA_COUNT,
                    &schema::GETDATA_VECTOR,
                    &schema::GETDATA_TYPE,
                    &schema::GETDATA_HASH,
                ],
                offset,
                &self.inventory,
            );
        });
        end
    }
}

impl Dissect for GetBlocks {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_GETBLOCKS, offset..end, |tree| {
            let offset = tree.fixed(
                &schema::GETBLOCKS_VERSION,
                offset,
                4,
                Value::U32(self.version.get()),
            );
            tree.locator(
                [
                    &schema::GETBLOCKS_COUNT,
                    &schema::GETBLOCKS_START,
                    &schema::GETBLOCKS_STOP,
                ],
                offset,
                &self.locator,
                &self.hash_stop,
            );
        });
        end
    }
}

impl Dissect for GetHeaders {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_GETHEADERS, offset..end, |tree| {
            tree.locator(
                [
                    &schema::GETHEADERS_COUNT,
                    &schema::GETHEADERS_START,
                    &schema::GETHEADERS_STOP,
                ],
                offset,
                &self.locator,
                &self.hash_stop,
            );
        });
        end
    }
}

fn dissect_tx_in(tx_in: &TxIn, offset: usize, tree: &mut Tree) -> usize {
    let end = offset + tx_in.deparsed_len();
    tree.add_subtree(&schema::TX_IN, offset..end, |tree| {
        let outpoint = &tx_in.previous_output;
        let offset = tree
            .add_subtree(&schema::TX_IN_PREV_OUTPUT, offset..offset + 36, |tree| {
                let offset = tree.hash(&schema::TX_IN_PREV_OUTPUT_HASH, offset, &outpoint.hash);
                tree.fixed(
                    &schema::TX_IN_PREV_OUTPUT_INDEX,
                    offset,
                    4,
                    Value::U32(outpoint.index.get()),
                );
            })
            .range
            .end;
        let offset = tree.script(
            &schema::TX_IN_SCRIPT_LENGTH,
            &schema::TX_IN_SIG_SCRIPT,
            offset,
            &tx_in.signature_script,
        );
        tree.fixed(
            &schema::TX_IN_SEQ,
            offset,
            4,
            Value::U32(tx_in.sequence.get()),
        );
    });
    end
}

fn dissect_tx_out(tx_out: &TxOut, offset: usize, tree: &mut Tree) -> usize {
    let end = offset + tx_out.deparsed_len();
    tree.add_subtree(&schema::TX_OUT, offset..end, |tree| {
        let offset = tree.fixed(
            &schema::TX_OUT_VALUE,
            offset,
            8,
            Value::U64(tx_out.value.get()),
        );
        tree.script(
            &schema::TX_OUT_SCRIPT_LENGTH,
            &schema::TX_OUT_SCRIPT,
            offset,
            &tx_out.script,
        );
    });
    end
}

impl Transaction {
    /// As [Dissect::dissect], labelled with its 1-based position when inside a block.
    pub fn dissect_numbered(&self, offset: usize, tree: &mut Tree, number: Option<usize>) -> usize {
        let end = offset + self.deparsed_len();
        let field = tree.add_subtree(&schema::MSG_TX, offset..end, |tree| {
            tree.add(&schema::TX_ID, offset..end, Value::Hash(self.txid()));
            let mut offset = tree.fixed(
                &schema::TX_VERSION,
                offset,
                4,
                Value::U32(self.version.get()),
            );
            offset = tree.var_int(&schema::TX_IN_COUNT, offset, &self.inputs.count);
            for tx_in in &self.inputs.items {
                offset = dissect_tx_in(tx_in, offset, tree);
            }
            offset = tree.var_int(&schema::TX_OUT_COUNT, offset, &self.outputs.count);
            for tx_out in &self.outputs.items {
                offset = dissect_tx_out(tx_out, offset, tree);
            }
            tree.fixed(
                &schema::TX_LOCK_TIME,
                offset,
                4,
                Value::U32(self.lock_time.get()),
            );
        });
        if let Some(number) = number {
            field.label = Some(format!("{} [ {number} ]", schema::MSG_TX.name));
        }
        end
    }
}

impl Dissect for Transaction {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        self.dissect_numbered(offset, tree, None)
    }
}

impl Dissect for Block {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        let end = offset + self.deparsed_len();
        tree.add_subtree(&schema::MSG_BLOCK, offset..end, |tree| {
            let header = &self.header;
            tree.add(
                &schema::BLOCK_HASH,
                offset..offset + header.deparsed_len(),
                Value::Hash(header.block_hash()),
            );
            let offset = tree.fixed(
                &schema::BLOCK_VERSION,
                offset,
                4,
                Value::U32(header.version.get()),
            );
            let offset = tree.hash(&schema::BLOCK_PREV_BLOCK, offset, &header.prev_block);
            let offset = tree.hash(&schema::BLOCK_MERKLE_ROOT, offset, &header.merkle_root);
            let offset = tree.fixed(
                &schema::BLOCK_TIME,
                offset,
                4,
                Value::Time(header.timestamp.get().into()),
            );
            let offset = tree.fixed(&schema::BLOCK_BITS, offset, 4, Value::U32(header.bits.get()));
            let offset = tree.fixed(
                &schema::BLOCK_NONCE,
                offset,
                4,
                Value::U32(header.nonce.get()),
            );
            let mut offset =
                tree.var_int(&schema::BLOCK_TRANSACTIONS, offset, &self.transactions.count);
            for (ix, tx) in self.transactions.items.iter().enumerate() {
                offset = tx.dissect_numbered(offset, tree, Some(ix + 1));
            }
        });
        end
    }
}

impl Dissect for MessageBody {
    fn dissect(&self, offset: usize, tree: &mut Tree) -> usize {
        match self {
            MessageBody::Version(it) => it.dissect(offset, tree),
            MessageBody::Addr(it) => it.dissect(offset, tree),
            MessageBody::Inv(it) => it.dissect(offset, tree),
            MessageBody::GetData(it) => it.dissect(offset, tree),
            MessageBody::GetBlocks(it) => it.dissect(offset, tree),
            MessageBody::GetHeaders(it) => it.dissect(offset, tree),
            MessageBody::Tx(it) => it.dissect(offset, tree),
            MessageBody::Block(it) => it.dissect(offset, tree),
            MessageBody::Uninterpreted(_) => offset,
        }
    }
}

/// Offset of the payload within a message.
pub const PAYLOAD_OFFSET: usize = HEADER_LENGTH;

///////////////
// Rendering //
///////////////

struct DisplayValue<'a>(&'a FieldInfo, &'a Value);

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let DisplayValue(info, value) = *self;
        macro_rules! number {
            ($n:expr, $digits:literal) => {
                match info.base {
                    Base::Hex => write!(f, "0x{:0width$x}", $n, width = $digits),
                    Base::Dec | Base::None => write!(f, "{}", $n),
                }
            };
        }
        match value {
            Value::None => Ok(()),
            Value::Bool(true) => f.write_str("Set"),
            Value::Bool(false) => f.write_str("Not set"),
            Value::U8(n) => number!(n, 2),
            Value::U16(n) => number!(n, 4),
            Value::U32(n) => number!(n, 8),
            Value::U64(n) => number!(n, 16),
            Value::Named { value, name } => {
                match name {
                    Some(name) => write!(f, "{name} (")?,
                    None => write!(f, "Unknown (")?,
                }
                number!(value, 8)?;
                f.write_str(")")
            }
            Value::Bytes(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02x}")),
            Value::Text(text) => f.write_str(text),
            Value::Hash(hash) => write!(f, "{hash}"),
            Value::Ipv6(ip) => write!(f, "{ip}"),
            Value::Time(secs) => match chrono::Utc.timestamp_opt(*secs, 0).single() {
                Some(time) => write!(f, "{}", time.format("%b %e, %Y %H:%M:%S UTC")),
                None => write!(f, "{secs} (out of range)"),
            },
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::None => f.write_str(self.label()),
            _ => write!(f, "{}: {}", self.label(), DisplayValue(self.info, &self.value)),
        }
    }
}

impl fmt::Display for Tree {
    /// One field per line, children indented.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_fields(f: &mut fmt::Formatter<'_>, tree: &Tree, depth: usize) -> fmt::Result {
            for field in &tree.fields {
                writeln!(f, "{:indent$}{field}", "", indent = depth * 4)?;
                write_fields(f, &field.children, depth + 1)?;
            }
            Ok(())
        }
        write_fields(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        message::tests::{sample_block, sample_transaction},
        wire::transcoding::hex2bin,
    };

    use bitcoin_hashes::Hash as _;
    use pretty_assertions::assert_eq;

    fn dissect(record: &impl Dissect, offset: usize) -> (Tree, usize) {
        let mut tree = Tree::default();
        let end = record.dissect(offset, &mut tree);
        (tree, end)
    }

    #[test]
    fn var_int_ranges_follow_the_width() {
        let mut tree = Tree::default();
        assert_eq!(tree.var_int(&schema::INV_COUNT, 10, &VarInt::from(3)), 11);
        assert_eq!(
            tree.var_int(
                &schema::INV_COUNT,
                11,
                &VarInt::with_width(3, VarIntWidth::U16)
            ),
            14
        );
        assert_eq!(
            tree.var_int(&schema::INV_COUNT, 14, &VarInt::from(u64::MAX)),
            23
        );
        let fields = tree.fields();
        assert_eq!((fields[0].range.clone(), &fields[0].value), (10..11, &Value::U8(3)));
        assert_eq!((fields[1].range.clone(), &fields[1].value), (12..14, &Value::U16(3)));
        assert_eq!(
            (fields[2].range.clone(), &fields[2].value),
            (15..23, &Value::U64(u64::MAX))
        );
    }

    #[test]
    fn transaction_fields_cover_the_transaction() {
        let tx = sample_transaction(2, 1);
        let (tree, end) = dissect(&tx, PAYLOAD_OFFSET);
        assert_eq!(end, PAYLOAD_OFFSET + tx.deparsed_len());

        let root = &tree.fields()[0];
        assert_eq!(root.label(), "Tx message");
        assert_eq!(root.range, PAYLOAD_OFFSET..end);
        assert_eq!(
            tree.find(&schema::TX_ID).map(|it| &it.value),
            Some(&Value::Hash(tx.txid()))
        );
        assert_eq!(tree.walk().filter(|it| it.info == &schema::TX_IN).count(), 2);
        assert_eq!(tree.walk().filter(|it| it.info == &schema::TX_OUT).count(), 1);
        let lock_time = tree.find(&schema::TX_LOCK_TIME).unwrap();
        assert_eq!(lock_time.range, end - 4..end);
    }

    #[test]
    fn block_transactions_are_numbered() {
        let block = sample_block(3);
        let (tree, end) = dissect(&block, PAYLOAD_OFFSET);
        assert_eq!(end, PAYLOAD_OFFSET + block.deparsed_len());

        let labels = tree
            .walk()
            .filter(|it| it.info == &schema::MSG_TX)
            .map(|it| it.label().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            ["Tx message [ 1 ]", "Tx message [ 2 ]", "Tx message [ 3 ]"]
        );

        // transactions sit back to back after the header and count
        let ranges = tree
            .walk()
            .filter(|it| it.info == &schema::MSG_TX)
            .map(|it| it.range.clone())
            .collect::<Vec<_>>();
        assert_eq!(ranges[0].start, PAYLOAD_OFFSET + 80 + 1);
        assert_eq!(ranges[0].end, ranges[1].start);
        assert_eq!(ranges[1].end, ranges[2].start);
        assert_eq!(ranges[2].end, end);
    }

    #[test]
    fn services_has_a_network_flag() {
        let mut tree = Tree::default();
        tree.services(&schema::VERSION_SERVICES, 0, 1.into());
        tree.services(&schema::VERSION_SERVICES, 8, 8.into());
        let flags = tree
            .walk()
            .filter(|it| it.info == &schema::SERVICES_NETWORK)
            .map(|it| it.value.clone())
            .collect::<Vec<_>>();
        assert_eq!(flags, [Value::Bool(true), Value::Bool(false)]);
    }

    #[test]
    fn rendering() {
        let header = Header {
            magic: 0xD9B4BEF9.into(),
            command: *b"verack\0\0\0\0\0\0",
            length: 0.into(),
            checksum: hex2bin(["5D F6 E0 E2"]).try_into().unwrap(),
        };
        let (tree, end) = dissect(&header, 0);
        assert_eq!(end, HEADER_LENGTH);
        assert_eq!(
            tree.to_string(),
            "Packet magic: main (0xf9beb4d9)\n\
             Command name: verack\n\
             Payload Length: 0\n\
             Payload checksum: 0x5df6e0e2\n"
        );
    }

    #[test]
    fn rendering_nested() {
        let mut tree = Tree::default();
        tree.string(&schema::VERSION_USER_AGENT, 0, &VarBytes::new(*b"/Satoshi:0.7.2/"));
        tree.add(&schema::VERSION_TIMESTAMP, 16..24, Value::Time(1355854353));
        assert_eq!(
            tree.to_string(),
            "User agent\n    String length: 15\n    String value: /Satoshi:0.7.2/\n\
             Node timestamp: Dec 18, 2012 18:12:33 UTC\n"
        );
    }

    #[test]
    fn unknown_inventory_type_is_shown_numerically() {
        let inv = Inv {
            inventory: VarList::new(vec![InventoryVector {
                kind: 7.into(),
                hash: sha256d::Hash::from_inner([0; 32]),
            }]),
        };
        let (tree, _) = dissect(&inv, PAYLOAD_OFFSET);
        let kind = tree.find(&schema::INV_TYPE).unwrap();
        assert_eq!(kind.to_string(), "Type: Unknown (7)");
    }
}
