//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Universe:
//  An option space, its wire geometry and the strategy used to decode,
//  encode and store its options.
//

use bytes::Bytes;

use common::encode::*;

use crate::decode;
use crate::encapsulate::{self, EncodeContext};
use crate::registry::Registry;
use crate::store::OptionStore;
use crate::DhcpError;

/// Index of an option space in the registry.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub struct UniverseId(pub usize);

/// The DHCP option space is always registered first.
pub const DHCP_UNIVERSE: UniverseId = UniverseId(0);

/// How options of a space are kept in a store.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Storage {
    /// Keyed by code, iterated in code order.
    Hashed,
    /// Kept in insertion order.
    Linked,
}

/// Codec strategy of an option space.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SpaceKind {
    Hashed,
    Linked,
    /// NetWare/IP: encoding wraps the result with a status sub-option.
    Nwip,
    /// Client FQDN: a packed structure exploded into virtual sub-options.
    Fqdn,
}

impl SpaceKind {
    pub fn codec(self) -> &'static dyn SpaceCodec {
        match self {
            SpaceKind::Hashed => &HashedSpace,
            SpaceKind::Linked => &LinkedSpace,
            SpaceKind::Nwip => &NwipSpace,
            SpaceKind::Fqdn => &FqdnSpace,
        }
    }
}

/// Per-space behavior.
pub trait SpaceCodec: Sync {
    fn storage(&self) -> Storage;

    /// Decode `buf` as a stream of this space's options into `store`.
    /// Nothing is kept in `store` when decoding fails.
    fn decode(&self, registry: &Registry, store: &mut OptionStore,
              buf: &Bytes, universe: &Universe) -> Result<(), DhcpError>;

    /// Encode the configured options of this space.  `None` when there
    /// was nothing to encode.
    fn encapsulate(&self, ctx: &EncodeContext<'_>,
                   universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError>;
}

pub struct HashedSpace;

impl SpaceCodec for HashedSpace {
    fn storage(&self) -> Storage {
        Storage::Hashed
    }

    fn decode(&self, registry: &Registry, store: &mut OptionStore,
              buf: &Bytes, universe: &Universe) -> Result<(), DhcpError> {
        decode::parse_option_buffer(registry, store, buf, universe, decode::EndPolicy::Optional)
    }

    fn encapsulate(&self, ctx: &EncodeContext<'_>,
                   universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
        encapsulate::space_encapsulate(ctx, universe)
    }
}

pub struct LinkedSpace;

impl SpaceCodec for LinkedSpace {
    fn storage(&self) -> Storage {
        Storage::Linked
    }

    fn decode(&self, registry: &Registry, store: &mut OptionStore,
              buf: &Bytes, universe: &Universe) -> Result<(), DhcpError> {
        decode::parse_option_buffer(registry, store, buf, universe, decode::EndPolicy::Optional)
    }

    fn encapsulate(&self, ctx: &EncodeContext<'_>,
                   universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
        encapsulate::space_encapsulate(ctx, universe)
    }
}

pub struct NwipSpace;

impl SpaceCodec for NwipSpace {
    fn storage(&self) -> Storage {
        Storage::Linked
    }

    fn decode(&self, registry: &Registry, store: &mut OptionStore,
              buf: &Bytes, universe: &Universe) -> Result<(), DhcpError> {
        decode::parse_option_buffer(registry, store, buf, universe, decode::EndPolicy::Optional)
    }

    fn encapsulate(&self, ctx: &EncodeContext<'_>,
                   universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
        encapsulate::nwip_encapsulate(ctx, universe)
    }
}

pub struct FqdnSpace;

impl SpaceCodec for FqdnSpace {
    fn storage(&self) -> Storage {
        Storage::Linked
    }

    fn decode(&self, registry: &Registry, store: &mut OptionStore,
              buf: &Bytes, universe: &Universe) -> Result<(), DhcpError> {
        decode::fqdn_universe_decode(registry, store, buf, universe)
    }

    fn encapsulate(&self, ctx: &EncodeContext<'_>,
                   universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
        encapsulate::fqdn_encapsulate(ctx, universe)
    }
}

/// Option space.
#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub id: UniverseId,
    pub name: String,
    /// Width of the code field: 1, 2 or 4.
    pub tag_size: usize,
    /// Width of the length field: 0, 1, 2 or 4.  Zero means the option
    /// runs to the end of the buffer.
    pub length_size: usize,
    /// Single-byte skip code, if the space has one.
    pub pad: Option<u32>,
    pub end: u32,
    /// Repeated codes are concatenated on decode (RFC 3396).
    pub concat_duplicates: bool,
    /// Parent space and the option code that carries this space.
    pub enc_opt: Option<(UniverseId, u32)>,
    pub kind: SpaceKind,
}

impl Universe {
    pub fn codec(&self) -> &'static dyn SpaceCodec {
        self.kind.codec()
    }

    pub fn storage(&self) -> Storage {
        self.codec().storage()
    }

    pub fn get_tag(&self, buf: &[u8]) -> Result<u32, DhcpError> {
        decode_uint(buf, self.tag_size)
    }

    pub fn get_length(&self, buf: &[u8]) -> Result<u32, DhcpError> {
        decode_uint(buf, self.length_size)
    }

    pub fn store_tag(&self, buf: &mut [u8], code: u32) -> Result<usize, DhcpError> {
        encode_uint(buf, self.tag_size, code)
    }

    pub fn store_length(&self, buf: &mut [u8], len: u32) -> Result<usize, DhcpError> {
        encode_uint(buf, self.length_size, len)
    }

    /// Largest value length the length field can express.
    pub fn max_value_length(&self) -> Option<usize> {
        match self.length_size {
            0 => None,
            width => Some(width_max(width) as usize),
        }
    }
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;

    fn isc() -> Universe {
        Universe {
            id: UniverseId(6),
            name: "isc".to_string(),
            tag_size: 2,
            length_size: 2,
            pad: None,
            end: 0,
            concat_duplicates: false,
            enc_opt: None,
            kind: SpaceKind::Linked,
        }
    }

    #[test]
    pub fn test_tag_length() {
        let u = isc();
        let mut buf: [u8; 4] = [0; 4];

        assert_eq!(u.store_tag(&mut buf, 0x0102), Ok(2));
        assert_eq!(u.store_length(&mut buf[2..], 3), Ok(2));
        assert_eq!(buf, [0x01, 0x02, 0x00, 0x03]);
        assert_eq!(u.get_tag(&buf), Ok(0x0102));
        assert_eq!(u.get_length(&buf[2..]), Ok(3));
        assert_eq!(u.max_value_length(), Some(0xFFFF));
    }

    #[test]
    pub fn test_storage() {
        assert_eq!(SpaceKind::Hashed.codec().storage(), Storage::Hashed);
        assert_eq!(SpaceKind::Linked.codec().storage(), Storage::Linked);
        assert_eq!(SpaceKind::Nwip.codec().storage(), Storage::Linked);
        assert_eq!(SpaceKind::Fqdn.codec().storage(), Storage::Linked);
    }
}
