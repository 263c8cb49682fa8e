/// Network identifier at the start of every message header.
/// Both networks are parsed identically, they only differ in what they denote.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    num_enum::TryFromPrimitive,
    num_enum::IntoPrimitive,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[repr(u32)]
pub enum Magic {
    #[strum(serialize = "main")]
    Main = 0xD9B4BEF9,
    #[strum(serialize = "testnet")]
    Testnet = 0xDAB5BFFA,
}

bitflags::bitflags! {
    /// Bitfield of features advertised by a node.
    // https://en.bitcoin.it/wiki/Protocol_documentation#version
    pub struct Services: u64 {
        /// This node can be asked for full blocks instead of just headers.
        const NODE_NETWORK = 1;
        /// See BIP 0064.
        const NODE_GETUTXO = 2;
        /// See BIP 0111.
        const NODE_BLOOM = 4;
        /// See BIP 0144.
        const NODE_WITNESS = 8;
        /// Never formally proposed (as a BIP), and discontinued.
        const NODE_XTHIN = 16;
        /// See BIP 0157.
        const NODE_COMPACT_FILTERS = 64;
        /// See BIP 0159.
        const NODE_NETWORK_LIMITED = 1024;
    }
}

/// What an inventory vector refers to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    num_enum::TryFromPrimitive,
    strum::Display,
    strum::IntoStaticStr,
)]
#[repr(u32)]
pub enum InvType {
    /// Any data of this type may be ignored.
    #[strum(serialize = "ERROR")]
    Error = 0,
    #[strum(serialize = "MSG_TX")]
    Tx = 1,
    #[strum(serialize = "MSG_BLOCK")]
    Block = 2,
}

/// Allow [crate::dispatch::dispatch] and tests which build headers to use the same arrays
pub mod commands {
    use std::fmt;

    use strum::IntoEnumIterator as _;

    const fn splat_str_to_array<const N: usize>(s: &str) -> [u8; N] {
        let mut array = [0; N];
        assert!(s.len() <= N, "string is too big to fit into array");
        let mut pos = 0;
        while pos < s.len() {
            array[pos] = s.as_bytes()[pos];
            pos += 1;
        }
        array
    }

    macro_rules! commands {
        ($($name:ident/$variant:ident = $str:expr),* $(,)?) => {
            pub mod names {
                $(pub const $name: &str = $str;)*
            }
            pub mod fields {
                $(pub const $name: [u8; 12] = super::splat_str_to_array($str);)*
            }
            /// Every command this crate knows the name of.
            /// Declaration order is matching priority.
            #[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, strum::EnumIter)]
            pub enum Command {
                $($variant,)*
            }
            impl Command {
                pub const fn name(self) -> &'static str {
                    match self {
                        $(Self::$variant => names::$name,)*
                    }
                }
                /// The NUL padded command field for this command.
                pub const fn field(self) -> [u8; 12] {
                    match self {
                        $(Self::$variant => fields::$name,)*
                    }
                }
            }
            #[automatically_derived]
            impl fmt::Display for Command {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        };
    }

    commands!(
        VERSION / Version = "version",
        ADDR / Addr = "addr",
        INV / Inv = "inv",
        GETDATA / GetData = "getdata",
        GETBLOCKS / GetBlocks = "getblocks",
        GETHEADERS / GetHeaders = "getheaders",
        TX / Tx = "tx",
        BLOCK / Block = "block",
        // no payload
        VERACK / Verack = "verack",
        GETADDR / GetAddr = "getaddr",
        PING / Ping = "ping",
        // payload not interpreted
        NOTFOUND / NotFound = "notfound",
        HEADERS / Headers = "headers",
        MEMPOOL / Mempool = "mempool",
        CHECKORDER / CheckOrder = "checkorder",
        SUBMITORDER / SubmitOrder = "submitorder",
        REPLY / Reply = "reply",
        PONG / Pong = "pong",
        FILTERLOAD / FilterLoad = "filterload",
        FILTERADD / FilterAdd = "filteradd",
        FILTERCLEAR / FilterClear = "filterclear",
        MERKLEBLOCK / MerkleBlock = "merkleblock",
        REJECT / Reject = "reject",
        ALERT / Alert = "alert",
    );

    impl Command {
        /// The first command, in declaration order, whose name is a prefix of `field`.
        /// Whatever follows the name (usually NUL padding) is not inspected.
        pub fn match_field(field: &[u8; 12]) -> Option<Self> {
            Self::iter().find(|command| field.starts_with(command.name().as_bytes()))
        }
    }

    impl TryFrom<[u8; 12]> for Command {
        type Error = [u8; 12];

        fn try_from(candidate: [u8; 12]) -> Result<Self, Self::Error> {
            Self::match_field(&candidate).ok_or(candidate)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn exact_fields_match_their_command() {
            for command in Command::iter() {
                assert_eq!(Command::match_field(&command.field()), Some(command));
            }
        }

        #[test]
        fn no_command_shadows_a_later_one() {
            let all = Command::iter().collect::<Vec<_>>();
            for (ix, earlier) in all.iter().enumerate() {
                for later in &all[ix + 1..] {
                    assert!(
                        !later.name().starts_with(earlier.name()),
                        "{earlier} would always win over {later}"
                    );
                }
            }
        }

        #[test]
        fn trailing_bytes_are_ignored() {
            assert_eq!(
                Command::match_field(b"versionXXXXX"),
                Some(Command::Version)
            );
            assert_eq!(Command::match_field(b"tx\0\0\0\0garbag"), Some(Command::Tx));
        }

        #[test]
        fn unknown_fields() {
            assert_eq!(Command::match_field(b"wtfmessage\0\0"), None);
            assert_eq!(Command::match_field(&[0; 12]), None);
            assert_eq!(Command::try_from(*b"ver\0\0\0\0\0\0\0\0\0"), Err(*b"ver\0\0\0\0\0\0\0\0\0"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_from_wire() {
        assert_eq!(
            Magic::try_from(u32::from_le_bytes([0xF9, 0xBE, 0xB4, 0xD9])).ok(),
            Some(Magic::Main)
        );
        assert_eq!(
            Magic::try_from(u32::from_le_bytes([0xFA, 0xBF, 0xB5, 0xDA])).ok(),
            Some(Magic::Testnet)
        );
        assert!(Magic::try_from(0x0B110907).is_err());
    }

    #[test]
    fn inv_type_names() {
        assert_eq!(InvType::try_from(2).unwrap().to_string(), "MSG_BLOCK");
        assert!(InvType::try_from(3).is_err());
    }
}
