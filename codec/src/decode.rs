//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Decode:
//  Turn received option buffers into store entries, following
//  encapsulated spaces and overloaded file/sname fields.
//

use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};

use crate::format::{EncapsulationMode, MinLength};
use crate::registry::{OptionDef, Registry};
use crate::store::{OptionEntry, OptionSource, OptionStore, OptionValue};
use crate::universe::{Universe, DHCP_UNIVERSE};
use crate::{DhcpError, DhcpMessageType, DhcpOptionCode, FqdnSubOptionCode};

/// DHCP magic cookie.
pub const DHCP_OPTIONS_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Message types accepted even when their options area is malformed.
pub const TOLERATED_MALFORMED_TYPES: [DhcpMessageType; 3] = [
    DhcpMessageType::DHCPOFFER,
    DhcpMessageType::DHCPACK,
    DhcpMessageType::DHCPNAK,
];

/// What to do when a buffer runs out without an END option.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum EndPolicy {
    #[default]
    Optional,
    Required,
}

/// Packet level decode policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsePolicy {
    pub end: EndPolicy,
    pub tolerated_types: Vec<DhcpMessageType>,
}

impl Default for ParsePolicy {
    fn default() -> Self {
        ParsePolicy {
            end: EndPolicy::Optional,
            tolerated_types: TOLERATED_MALFORMED_TYPES.to_vec(),
        }
    }
}

/// Run `f`, restoring `store` when it fails.
fn transaction<F>(store: &mut OptionStore, f: F) -> Result<(), DhcpError>
where
    F: FnOnce(&mut OptionStore) -> Result<(), DhcpError>,
{
    let snapshot = store.clone();
    let res = f(store);
    if res.is_err() {
        *store = snapshot;
    }
    res
}

/// Decode `buf` as a stream of `universe` options.  On failure the store
/// is left as it was.
pub fn parse_option_buffer(registry: &Registry, store: &mut OptionStore, buf: &Bytes,
                           universe: &Universe, end: EndPolicy) -> Result<(), DhcpError> {
    transaction(store, |store| parse_region(registry, store, buf, universe, end))
}

/// Decode without undoing what was stored before an error.
fn parse_region(registry: &Registry, store: &mut OptionStore, buf: &Bytes,
                universe: &Universe, end: EndPolicy) -> Result<(), DhcpError> {
    let length = buf.len();
    let mut offset = 0;

    while offset + universe.tag_size <= length {
        let code = universe.get_tag(&buf[offset..])?;
        offset += universe.tag_size;

        if universe.pad == Some(code) {
            continue;
        }
        if code == universe.end {
            trace!("{}: END at {}", universe.name, offset - universe.tag_size);
            return Ok(());
        }

        if offset + universe.length_size > length {
            return Err(DhcpError::Malformed(format!("{}.{}: no room for length",
                                                    universe.name, code)));
        }
        let len = if universe.length_size == 0 {
            length - offset
        } else {
            universe.get_length(&buf[offset..])? as usize
        };
        offset += universe.length_size;

        if offset + len > length {
            return Err(DhcpError::Malformed(format!("{}.{}: length {} exceeds buffer by {}",
                                                    universe.name, code, len, offset + len - length)));
        }

        let option = registry.option_or_unknown(universe.id, code);
        let value = buf.slice(offset..offset + len);
        offset += len;

        if option.format.encapsulation_mode() == Some(EncapsulationMode::Full) {
            match parse_encapsulated_suboptions(registry, store, &option, &value, None) {
                Ok(()) => continue,
                Err(e) => debug!("{}.{}: keeping raw value, {}", universe.name, option.name, e),
            }
        } else if option.format.encapsulation_mode() == Some(EncapsulationMode::Partial) {
            if let Err(e) = parse_encapsulated_suboptions(registry, store, &option, &value, None) {
                debug!("{}.{}: {}", universe.name, option.name, e);
            }
        }

        save_raw(store, universe, option, value);
    }

    if end == EndPolicy::Required {
        return Err(DhcpError::Malformed(format!("{}: missing END option", universe.name)));
    }
    Ok(())
}

/// Value as stored for a first instance.  Text is kept NUL terminated and
/// without trailing NULs.  Later instances of a chain keep the raw slice.
fn prepare_value(option: &OptionDef, value: &Bytes) -> OptionValue {
    if option.is_text_like() {
        let min = match option.min_length() {
            MinLength::Bounded(min) => min,
            MinLength::Unbounded => value.len(),
        };
        OptionValue::terminated(value).strip_nulls(min)
    } else {
        OptionValue::new(value.clone())
    }
}

fn save_raw(store: &mut OptionStore, universe: &Universe, option: Arc<OptionDef>, value: Bytes) {
    let code = option.code;

    if store.lookup(universe.id, code).is_none() {
        let value = prepare_value(&option, &value);
        store.save(universe, OptionEntry::new(option, OptionSource::Data(value)));
    } else if universe.concat_duplicates {
        if let Some(head) = store.lookup_mut(universe.id, code) {
            let joined = match &head.source {
                OptionSource::Data(old) => old.concat(&value),
                OptionSource::Computed(_) => {
                    warn!("{}.{}: cannot concatenate onto a computed value", universe.name, code);
                    return;
                }
            };
            head.source = OptionSource::Data(joined);
        }
    } else {
        store.append(universe, OptionEntry::new(option, OptionSource::Data(OptionValue::new(value))));
    }
}

/// Decode `value` of `option` as its encapsulated space.  Fails, without
/// storing anything, when the space is unknown or does not decode.
pub fn parse_encapsulated_suboptions(registry: &Registry, store: &mut OptionStore,
                                     option: &OptionDef, value: &Bytes,
                                     vendor_override: Option<&str>) -> Result<(), DhcpError> {
    let universe = registry.find_encapsulation_universe(option, vendor_override)
        .ok_or_else(|| DhcpError::EncapsulationFailure(format!("no option space for {}", option.name)))?;
    let offset = option.encapsulation_offset()
        .ok_or_else(|| DhcpError::EncapsulationFailure(format!("{}: variable fields before {}",
                                                               option.name, universe.name)))?;
    if offset > value.len() {
        return Err(DhcpError::EncapsulationFailure(format!("{}: value shorter than {}",
                                                           option.name, offset)));
    }

    universe.codec().decode(registry, store, &value.slice(offset..), universe)
        .map_err(|e| DhcpError::EncapsulationFailure(format!("{}: {}", universe.name, e)))
}

fn fqdn_save(registry: &Registry, store: &mut OptionStore, universe: &Universe,
             code: FqdnSubOptionCode, value: Bytes) {
    let option = registry.option_or_unknown(universe.id, code.code());
    let value = prepare_value(&option, &value);
    store.save(universe, OptionEntry::new(option, OptionSource::Data(value)));
}

/// Explode a client FQDN option (flags, rcode1, rcode2, name) into the
/// virtual FQDN sub-options.
pub fn fqdn_universe_decode(registry: &Registry, store: &mut OptionStore, buf: &Bytes,
                            universe: &Universe) -> Result<(), DhcpError> {
    if buf.len() < 3 {
        return Err(DhcpError::Malformed(format!("{}: {} bytes, need 3", universe.name, buf.len())));
    }

    let flags = buf[0];
    let encoded = flags & 4 != 0;
    let mut names: Vec<(FqdnSubOptionCode, Bytes)> = Vec::new();

    if encoded {
        let mut labels: Vec<&[u8]> = Vec::new();
        let mut terminated = false;
        let mut pos = 3;

        while pos < buf.len() {
            let len = buf[pos] as usize;
            if len > 63 {
                return Err(DhcpError::Malformed(format!("{}: label of {} bytes", universe.name, len)));
            }
            if len == 0 {
                terminated = true;
                break;
            }
            if pos + 1 + len > buf.len() {
                return Err(DhcpError::Malformed(format!("{}: label overruns option", universe.name)));
            }
            labels.push(&buf[pos + 1..pos + 1 + len]);
            pos += 1 + len;
        }

        let fqdn = Bytes::from(labels.join(&b'.'));
        if terminated && labels.len() > 1 {
            names.push((FqdnSubOptionCode::Hostname, Bytes::copy_from_slice(labels[0])));
            names.push((FqdnSubOptionCode::Domainname, Bytes::from(labels[1..].join(&b'.'))));
        } else if !fqdn.is_empty() {
            names.push((FqdnSubOptionCode::Hostname, fqdn.clone()));
        }
        if !fqdn.is_empty() {
            names.push((FqdnSubOptionCode::Fqdn, fqdn));
        }
    } else {
        let mut name = buf.slice(3..);
        if name.last() == Some(&0) {
            name.truncate(name.len() - 1);
        }

        let host_len = name.iter().position(|c| *c == b'.').unwrap_or(name.len());
        if host_len > 0 {
            names.push((FqdnSubOptionCode::Hostname, name.slice(..host_len)));
        }
        if host_len + 1 < name.len() {
            names.push((FqdnSubOptionCode::Domainname, name.slice(host_len + 1..)));
        }
        if !name.is_empty() {
            names.push((FqdnSubOptionCode::Fqdn, name));
        }
    }

    transaction(store, |store| {
        fqdn_save(registry, store, universe, FqdnSubOptionCode::Encoded,
                  Bytes::copy_from_slice(&[encoded as u8]));
        for (code, value) in names {
            fqdn_save(registry, store, universe, code, value);
        }
        fqdn_save(registry, store, universe, FqdnSubOptionCode::NoClientUpdate,
                  Bytes::copy_from_slice(&[(flags & 2 != 0) as u8]));
        fqdn_save(registry, store, universe, FqdnSubOptionCode::ServerUpdate,
                  Bytes::copy_from_slice(&[(flags & 1 != 0) as u8]));
        fqdn_save(registry, store, universe, FqdnSubOptionCode::Rcode1, buf.slice(1..2));
        fqdn_save(registry, store, universe, FqdnSubOptionCode::Rcode2, buf.slice(2..3));
        Ok(())
    })
}

/// Decode the options area of a packet, cookie included, then the file
/// and sname fields if the overload option says so.  Returns false when
/// the cookie is missing and nothing was decoded.
pub fn parse_options(registry: &Registry, store: &mut OptionStore, options: &Bytes,
                     file: &Bytes, sname: &Bytes, policy: &ParsePolicy) -> Result<bool, DhcpError> {
    if options.len() < DHCP_OPTIONS_COOKIE.len() || options[..4] != DHCP_OPTIONS_COOKIE {
        debug!("no DHCP options cookie");
        return Ok(false);
    }

    let dhcp = registry.dhcp();
    if let Err(e) = parse_region(registry, store, &options.slice(4..), dhcp, policy.end) {
        match store.message_type() {
            Some(t) if policy.tolerated_types.contains(&t) => {
                warn!("accepting {:?} with malformed options: {}", t, e);
            }
            _ => return Err(e),
        }
    }

    let overload = store.value(DHCP_UNIVERSE, DhcpOptionCode::Overload.code())
        .and_then(|v| v.as_bytes().first().copied())
        .unwrap_or(0);
    if overload & 1 != 0 {
        parse_option_buffer(registry, store, file, dhcp, policy.end)?;
    }
    if overload & 2 != 0 {
        parse_option_buffer(registry, store, sname, dhcp, policy.end)?;
    }

    Ok(true)
}

/// Decode the vendor-encapsulated-options value already in `store` as
/// `space`.  Returns false when there is no such value.
pub fn reparse_vendor_options(registry: &Registry, store: &mut OptionStore,
                              space: &str) -> Result<bool, DhcpError> {
    let value = match store.value(DHCP_UNIVERSE, DhcpOptionCode::VendorSpecific.code()) {
        Some(value) => value.bytes(),
        None => return Ok(false),
    };
    let universe = registry.lookup_universe(space)
        .ok_or_else(|| DhcpError::EncapsulationFailure(format!("no option space {}", space)))?;

    universe.codec().decode(registry, store, &value, universe)?;
    Ok(true)
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryBuilder, SpaceSpec};

    fn text(store: &OptionStore, universe: &Universe, code: FqdnSubOptionCode) -> Option<Vec<u8>> {
        store.value(universe.id, code.code()).map(|v| v.as_bytes().to_vec())
    }

    #[test]
    pub fn test_parse_basic() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x35, 0x01, 0x05, 0x00, 0x01, 0x04, 0xff, 0xff, 0xff, 0x00, 0xff]);

        match parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(()) => {
                assert_eq!(store.message_type(), Some(DhcpMessageType::DHCPACK));
                assert_eq!(store.value(DHCP_UNIVERSE, 1).unwrap().as_bytes(), &[255, 255, 255, 0]);
                assert_eq!(store.iter(DHCP_UNIVERSE).count(), 2);
            }
        }
    }

    #[test]
    pub fn test_parse_concat() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x0c, 0x03, b'f', b'o', b'o', 0x0c, 0x03, b'b', b'a', b'r', 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        let entry = store.lookup(DHCP_UNIVERSE, 12).unwrap();
        assert_eq!(entry.value().unwrap().as_bytes(), b"foobar");
        assert_eq!(entry.chain().count(), 1);
    }

    #[test]
    pub fn test_parse_nulls() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x0c, 0x05, b'h', b'o', b's', b't', 0x00]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        let value = store.value(DHCP_UNIVERSE, 12).unwrap();
        assert_eq!(value.as_bytes(), b"host");
        assert_eq!(value.as_c_bytes(), Some(&b"host\0"[..]));
        assert!(store.had_nulls(DHCP_UNIVERSE, 12));
    }

    #[test]
    pub fn test_parse_overrun() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        store.add_option(&registry, 15, b"kept").unwrap();
        let buf = Bytes::from_static(&[0x01, 0x04, 0xff, 0xff, 0xff, 0x00, 0x03, 0x08, 0x0a, 0x00]);

        match parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional) {
            Ok(_) => assert!(false, "overrun must fail"),
            Err(e) => assert!(matches!(e, DhcpError::Malformed(_))),
        }
        assert!(store.lookup(DHCP_UNIVERSE, 1).is_none());
        assert!(store.lookup(DHCP_UNIVERSE, 15).is_some());
    }

    #[test]
    pub fn test_parse_end_policy() {
        let registry = Registry::standard().unwrap();
        let buf = Bytes::from_static(&[0x35, 0x01, 0x01, 0x00, 0x00]);

        let mut store = OptionStore::new();
        assert!(parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).is_ok());

        let mut store = OptionStore::new();
        assert!(parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Required).is_err());
        assert!(store.is_empty());
    }

    #[test]
    pub fn test_parse_pad_no_end() {
        let registry = Registry::standard().unwrap();
        let buf = Bytes::from_static(&[0x00, 0x00, 0x01, 0x01, 0x05]);

        let mut store = OptionStore::new();
        match parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(()) => {
                assert_eq!(store.iter(DHCP_UNIVERSE).count(), 1);
                assert_eq!(store.value(DHCP_UNIVERSE, 1).unwrap().as_bytes(), &[0x05]);
            }
        }

        let mut store = OptionStore::new();
        match parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Required) {
            Ok(_) => assert!(false, "missing END must fail"),
            Err(e) => assert!(matches!(e, DhcpError::Malformed(_))),
        }
        assert!(store.is_empty());
    }

    #[test]
    pub fn test_parse_tag_without_length() {
        let registry = Registry::standard().unwrap();

        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x01]);
        match parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional) {
            Ok(_) => assert!(false, "tag without length must fail"),
            Err(e) => assert!(matches!(e, DhcpError::Malformed(_))),
        }
        assert!(store.is_empty());

        let isc = registry.lookup_universe("isc").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x00, 0x01, 0x00]);
        match parse_option_buffer(&registry, &mut store, &buf, isc, EndPolicy::Optional) {
            Ok(_) => assert!(false, "tag without length must fail"),
            Err(e) => assert!(matches!(e, DhcpError::Malformed(_))),
        }
        assert!(store.is_empty());
    }

    #[test]
    pub fn test_parse_text_unchanged() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x0c, 0x03, b'a', b'b', b'c', 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        let value = store.value(DHCP_UNIVERSE, 12).unwrap();
        assert_eq!(value.as_bytes(), b"abc");
        assert_eq!(value.as_c_bytes(), Some(&b"abc\0"[..]));
        assert!(!value.had_nulls());
        assert!(!store.had_nulls(DHCP_UNIVERSE, 12));
    }

    #[test]
    pub fn test_parse_chain_raw() {
        let registry = Registry::standard().unwrap();
        let isc = registry.lookup_universe("isc").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x00, 0x01, 0x00, 0x03, b'a', b'b', 0x00,
                                       0x00, 0x01, 0x00, 0x03, b'c', b'd', 0x00]);

        match parse_option_buffer(&registry, &mut store, &buf, isc, EndPolicy::Optional) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(()) => {
                let values: Vec<&OptionValue> = store.lookup(isc.id, 1).unwrap()
                    .chain()
                    .filter_map(|e| e.value())
                    .collect();
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].as_bytes(), b"ab");
                assert!(values[0].had_nulls());
                assert_eq!(values[1].as_bytes(), b"cd\0");
                assert!(!values[1].had_nulls());
            }
        }
    }

    #[test]
    pub fn test_parse_agent() {
        let registry = Registry::standard().unwrap();
        let agent = registry.lookup_universe("agent").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x52, 0x08, 0x01, 0x02, 0xaa, 0xbb, 0x02, 0x02, 0xcc, 0xdd, 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert!(store.lookup(DHCP_UNIVERSE, 82).is_none());
        assert_eq!(store.value(agent.id, 1).unwrap().as_bytes(), &[0xaa, 0xbb]);
        assert_eq!(store.value(agent.id, 2).unwrap().as_bytes(), &[0xcc, 0xdd]);
    }

    #[test]
    pub fn test_parse_agent_malformed() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = Registry::standard().unwrap();
        let agent = registry.lookup_universe("agent").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x52, 0x05, 0x01, 0x02, 0xaa, 0xbb, 0x02, 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert_eq!(store.value(DHCP_UNIVERSE, 82).unwrap().as_bytes(), &[0x01, 0x02, 0xaa, 0xbb, 0x02]);
        assert!(store.lookup(agent.id, 1).is_none());
    }

    #[test]
    pub fn test_parse_vendor_space() {
        let registry = Registry::standard().unwrap();
        let vendor = registry.lookup_universe("vendor").unwrap();
        let isc = registry.lookup_universe("isc").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x7d, 0x0a,
                                       0x00, 0x00, 0x09, 0xbf, 0x05,
                                       0x00, 0x01, 0x00, 0x01, b'x', 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert!(store.lookup(vendor.id, 2495).is_none());
        assert_eq!(store.value(isc.id, 1).unwrap().as_bytes(), b"x");
    }

    #[test]
    pub fn test_fqdn_plain() {
        let registry = Registry::standard().unwrap();
        let fqdn = registry.lookup_universe("fqdn").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(b"\x51\x14\x01\x00\x00host.example.com\x00");

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Hostname), Some(b"host".to_vec()));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Domainname), Some(b"example.com".to_vec()));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Fqdn), Some(b"host.example.com".to_vec()));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Encoded), Some(vec![0]));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::ServerUpdate), Some(vec![1]));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::NoClientUpdate), Some(vec![0]));

        let codes: Vec<u32> = store.iter(fqdn.id).map(|e| e.code()).collect();
        assert_eq!(codes, vec![3, 6, 7, 8, 1, 2, 4, 5]);
    }

    #[test]
    pub fn test_fqdn_encoded() {
        let registry = Registry::standard().unwrap();
        let fqdn = registry.lookup_universe("fqdn").unwrap();

        let mut store = OptionStore::new();
        let buf = Bytes::from_static(b"\x05\x00\x00\x04host\x07example\x03com\x00");
        match fqdn_universe_decode(&registry, &mut store, &buf, fqdn) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(()) => {
                assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Hostname), Some(b"host".to_vec()));
                assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Domainname), Some(b"example.com".to_vec()));
                assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Fqdn), Some(b"host.example.com".to_vec()));
                assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Encoded), Some(vec![1]));
            }
        }

        let mut store = OptionStore::new();
        let buf = Bytes::from_static(b"\x04\x00\x00\x04host\x07example");
        fqdn_universe_decode(&registry, &mut store, &buf, fqdn).unwrap();
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Hostname), Some(b"host.example".to_vec()));
        assert_eq!(text(&store, fqdn, FqdnSubOptionCode::Domainname), None);

        let mut store = OptionStore::new();
        let buf = Bytes::from_static(b"\x04\x00\x00\x09host");
        assert!(fqdn_universe_decode(&registry, &mut store, &buf, fqdn).is_err());
        assert!(store.is_empty());

        let buf = Bytes::from_static(b"\x04\x00");
        assert!(fqdn_universe_decode(&registry, &mut store, &buf, fqdn).is_err());
    }

    #[test]
    pub fn test_parse_options_overload() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let options = Bytes::from_static(&[0x63, 0x82, 0x53, 0x63, 0x35, 0x01, 0x02, 0x34, 0x01, 0x03, 0xff]);
        let mut file = vec![0u8; 128];
        file[..6].copy_from_slice(&[0x0f, 0x03, b'a', b'b', b'c', 0xff]);
        let mut sname = vec![0u8; 64];
        sname[..7].copy_from_slice(&[0x01, 0x04, 0xff, 0xff, 0xff, 0x00, 0xff]);

        match parse_options(&registry, &mut store, &options, &Bytes::from(file), &Bytes::from(sname),
                            &ParsePolicy::default()) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(found) => {
                assert!(found);
                assert_eq!(store.value(DHCP_UNIVERSE, 15).unwrap().as_bytes(), b"abc");
                assert_eq!(store.value(DHCP_UNIVERSE, 1).unwrap().as_bytes(), &[255, 255, 255, 0]);
            }
        }
    }

    #[test]
    pub fn test_parse_options_cookie() {
        let registry = Registry::standard().unwrap();
        let mut store = OptionStore::new();
        let options = Bytes::from_static(&[0x00, 0x00, 0x00, 0x00, 0x35, 0x01, 0x02, 0xff]);
        let empty = Bytes::new();

        assert_eq!(parse_options(&registry, &mut store, &options, &empty, &empty, &ParsePolicy::default()),
                   Ok(false));
        assert!(store.is_empty());
    }

    #[test]
    pub fn test_parse_options_tolerance() {
        let _ = env_logger::builder().is_test(true).try_init();
        let registry = Registry::standard().unwrap();
        let empty = Bytes::new();
        let policy = ParsePolicy::default();

        let mut store = OptionStore::new();
        let options = Bytes::from_static(&[0x63, 0x82, 0x53, 0x63, 0x35, 0x01, 0x05, 0x03, 0x08, 0x0a]);
        assert_eq!(parse_options(&registry, &mut store, &options, &empty, &empty, &policy), Ok(true));
        assert_eq!(store.message_type(), Some(DhcpMessageType::DHCPACK));

        let mut store = OptionStore::new();
        let options = Bytes::from_static(&[0x63, 0x82, 0x53, 0x63, 0x35, 0x01, 0x01, 0x03, 0x08, 0x0a]);
        assert!(parse_options(&registry, &mut store, &options, &empty, &empty, &policy).is_err());

        let strict = ParsePolicy { tolerated_types: Vec::new(), ..ParsePolicy::default() };
        let mut store = OptionStore::new();
        let options = Bytes::from_static(&[0x63, 0x82, 0x53, 0x63, 0x35, 0x01, 0x05, 0x03, 0x08, 0x0a]);
        assert!(parse_options(&registry, &mut store, &options, &empty, &empty, &strict).is_err());
    }

    #[test]
    pub fn test_reparse_vendor_options() {
        let registry = RegistryBuilder::standard()
            .space(SpaceSpec::new("acme", 1, 1))
            .option("acme", "boot-server", 1, "t")
            .build()
            .unwrap();
        let acme = registry.lookup_universe("acme").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0x2b, 0x05, 0x01, 0x03, b'b', b's', b'1', 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert_eq!(store.value(DHCP_UNIVERSE, 43).unwrap().as_bytes(), &[0x01, 0x03, b'b', b's', b'1']);

        assert_eq!(reparse_vendor_options(&registry, &mut store, "acme"), Ok(true));
        assert_eq!(store.value(acme.id, 1).unwrap().as_bytes(), b"bs1");
        assert!(reparse_vendor_options(&registry, &mut store, "nowhere").is_err());

        let mut empty = OptionStore::new();
        assert_eq!(reparse_vendor_options(&registry, &mut empty, "acme"), Ok(false));
    }

    #[test]
    pub fn test_partial_encapsulation() {
        let registry = RegistryBuilder::standard()
            .space(SpaceSpec::new("inner", 1, 1))
            .option("inner", "label", 1, "t")
            .option("dhcp", "wrapped", 200, "eBEinner.")
            .build()
            .unwrap();
        let inner = registry.lookup_universe("inner").unwrap();
        let mut store = OptionStore::new();
        let buf = Bytes::from_static(&[0xc8, 0x04, 0x07, 0x01, 0x01, b'z', 0xff]);

        parse_option_buffer(&registry, &mut store, &buf, registry.dhcp(), EndPolicy::Optional).unwrap();
        assert_eq!(store.value(DHCP_UNIVERSE, 200).unwrap().as_bytes(), &[0x07, 0x01, 0x01, b'z']);
        assert_eq!(store.value(inner.id, 1).unwrap().as_bytes(), b"z");
    }
}
