//! Every field a dissection tree can contain.
//! Filter names are dotted paths under `namecoin`.

/// How a numeric value is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    /// Not a number, or shown some other way.
    None,
    Dec,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    /// What a reader sees.
    pub name: &'static str,
    /// Stable name for filtering.
    pub abbrev: &'static str,
    pub base: Base,
}

macro_rules! fields {
    ($($ident:ident = $name:literal, $abbrev:literal, $base:ident;)*) => {
        $(
            pub const $ident: FieldInfo = FieldInfo {
                name: $name,
                abbrev: $abbrev,
                base: Base::$base,
            };
        )*
        /// Registration table.
        pub const ALL: &[FieldInfo] = &[$($ident),*];
    };
}

fields! {
    PROTOCOL = "Namecoin protocol", "namecoin", None;

    // header
    MAGIC = "Packet magic", "namecoin.magic", Hex;
    COMMAND = "Command name", "namecoin.command", None;
    LENGTH = "Payload Length", "namecoin.length", Dec;
    CHECKSUM = "Payload checksum", "namecoin.checksum", Hex;

    // shared structures
    SERVICES_NETWORK = "Network node", "namecoin.services.network", None;
    ADDRESS_SERVICES = "Node services", "namecoin.address.services", Hex;
    ADDRESS_ADDRESS = "Node address", "namecoin.address.address", None;
    ADDRESS_PORT = "Node port", "namecoin.address.port", Dec;
    STRING_LENGTH = "String length", "namecoin.string.length", Dec;
    STRING_VALUE = "String value", "namecoin.string.value", None;

    MSG_VERSION = "Version message", "namecoin.version", None;
    VERSION_VERSION = "Protocol version", "namecoin.version.version", Dec;
    VERSION_SERVICES = "Node services", "namecoin.version.services", Hex;
    VERSION_TIMESTAMP = "Node timestamp", "namecoin.version.timestamp", None;
    VERSION_ADDR_YOU = "Address as receiving node", "namecoin.version.addr_you", None;
    VERSION_ADDR_ME = "Address of emitting node", "namecoin.version.addr_me", None;
    VERSION_NONCE = "Random nonce", "namecoin.version.nonce", Hex;
    VERSION_USER_AGENT = "User agent", "namecoin.version.user_agent", None;
    VERSION_START_HEIGHT = "Block start height", "namecoin.version.start_height", Dec;

    MSG_ADDR = "Address message", "namecoin.addr", None;
    ADDR_COUNT = "Count", "namecoin.addr.count", Dec;
    ADDR_ADDRESS = "Address", "namecoin.addr.address", None;
    ADDR_TIMESTAMP = "Address timestamp", "namecoin.addr.timestamp", None;

    MSG_INV = "Inventory message", "namecoin.inv", None;
    INV_COUNT = "Count", "namecoin.inv.count", Dec;
    INV_VECTOR = "Inventory vector", "namecoin.inv.vector", None;
    INV_TYPE = "Type", "namecoin.inv.type", Dec;
    INV_HASH = "Data hash", "namecoin.inv.hash", None;

    MSG_GETDATA = "Getdata message", "namecoin.getdata", None;
    GETDATA_COUNT = "Count", "namecoin.getdata.count", Dec;
    GETDATA_VECTOR = "Inventory vector", "namecoin.getdata.vector", None;
    GETDATA_TYPE = "Type", "namecoin.getdata.type", Dec;
    GETDATA_HASH = "Data hash", "namecoin.getdata.hash", None;

    MSG_GETBLOCKS = "Getblocks message", "namecoin.getblocks", None;
    GETBLOCKS_VERSION = "Protocol version", "namecoin.getblocks.version", Dec;
    GETBLOCKS_COUNT = "Count", "namecoin.getblocks.count", Dec;
    GETBLOCKS_START = "Starting hash", "namecoin.getblocks.hash_start", None;
    GETBLOCKS_STOP = "Stopping hash", "namecoin.getblocks.hash_stop", None;

    MSG_GETHEADERS = "Getheaders message", "namecoin.getheaders", None;
    GETHEADERS_COUNT = "Count", "namecoin.getheaders.count", Dec;
    GETHEADERS_START = "Starting hash", "namecoin.getheaders.hash_start", None;
    GETHEADERS_STOP = "Stopping hash", "namecoin.getheaders.hash_stop", None;

    MSG_TX = "Tx message", "namecoin.tx", None;
    TX_VERSION = "Transaction version", "namecoin.tx.version", Dec;
    TX_ID = "Transaction ID", "namecoin.tx.txid", None;
    TX_IN_COUNT = "Input Count", "namecoin.tx.input_count", Dec;
    TX_IN = "Transaction input", "namecoin.tx.in", None;
    TX_IN_PREV_OUTPUT = "Previous output", "namecoin.tx.in.prev_output", None;
    TX_IN_PREV_OUTPUT_HASH = "Hash", "namecoin.tx.in.prev_output.hash", None;
    TX_IN_PREV_OUTPUT_INDEX = "Index", "namecoin.tx.in.prev_output.index", Dec;
    TX_IN_SCRIPT_LENGTH = "Script Length", "namecoin.tx.in.script_length", Dec;
    TX_IN_SIG_SCRIPT = "Signature script", "namecoin.tx.in.sig_script", None;
    TX_IN_SEQ = "Sequence", "namecoin.tx.in.seq", Dec;
    TX_OUT_COUNT = "Output Count", "namecoin.tx.output_count", Dec;
    TX_OUT = "Transaction output", "namecoin.tx.out", None;
    TX_OUT_VALUE = "Value", "namecoin.tx.out.value", Dec;
    TX_OUT_SCRIPT_LENGTH = "Script Length", "namecoin.tx.out.script_length", Dec;
    TX_OUT_SCRIPT = "Script", "namecoin.tx.out.script", None;
    TX_LOCK_TIME = "Block lock time or block ID", "namecoin.tx.lock_time", Dec;

    MSG_BLOCK = "Block message", "namecoin.block", None;
    BLOCK_VERSION = "Block version", "namecoin.block.version", Dec;
    BLOCK_HASH = "Block hash", "namecoin.block.hash", None;
    BLOCK_PREV_BLOCK = "Previous block", "namecoin.block.prev_block", None;
    BLOCK_MERKLE_ROOT = "Merkle root", "namecoin.block.merkle_root", None;
    BLOCK_TIME = "Block timestamp", "namecoin.block.timestamp", None;
    BLOCK_BITS = "Bits", "namecoin.block.bits", Hex;
    BLOCK_NONCE = "Nonce", "namecoin.block.nonce", Hex;
    BLOCK_TRANSACTIONS = "Number of transactions", "namecoin.block.num_transactions", Dec;

    // annotations
    UNKNOWN_COMMAND = "Unknown command", "namecoin.command.unknown", None;
    MALFORMED = "Malformed message", "namecoin.malformed", None;
    UNINTERPRETED = "Payload not interpreted", "namecoin.payload.uninterpreted", None;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn abbrevs_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for field in ALL {
            assert!(
                field.abbrev == "namecoin" || field.abbrev.starts_with("namecoin."),
                "{}",
                field.abbrev
            );
            assert!(seen.insert(field.abbrev), "duplicate {}", field.abbrev);
        }
    }
}
