//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Encapsulate:
//  Encode the configured options of a space into the value of the
//  option that carries it.
//

use bytes::Bytes;
use log::{error, warn};

use crate::format::EncapsulationMode;
use crate::registry::{OptionDef, Registry};
use crate::store::{OptionEntry, OptionStore};
use crate::universe::Universe;
use crate::{DhcpError, FqdnSubOptionCode, FQDN_SUBOPTION_COUNT};

/// Everything an encoder looks at.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    pub registry: &'a Registry,
    /// Options to send.
    pub cfg: &'a OptionStore,
    /// Options of the message being answered, for computed values.
    pub inbound: Option<&'a OptionStore>,
    /// Space used for "E." formats.
    pub vendor_space: Option<&'a str>,
    /// Option spaces entered so far.
    pub(crate) depth: usize,
}

impl<'a> EncodeContext<'a> {
    pub fn new(registry: &'a Registry, cfg: &'a OptionStore) -> Self {
        EncodeContext {
            registry,
            cfg,
            inbound: None,
            vendor_space: None,
            depth: 0,
        }
    }

    pub fn with_inbound(mut self, inbound: &'a OptionStore) -> Self {
        self.inbound = Some(inbound);
        self
    }

    pub fn with_vendor_space(mut self, space: &'a str) -> Self {
        self.vendor_space = Some(space);
        self
    }

    pub fn evaluate(&self, entry: &OptionEntry) -> Option<Bytes> {
        entry.source.evaluate(self.inbound)
    }
}

/// Append a tag, length and `value` record to `result`.  Empty values
/// are only written for zero-length formats.
pub fn append_option(result: &mut Vec<u8>, universe: &Universe, option: &OptionDef,
                     value: &[u8]) -> Result<bool, DhcpError> {
    if value.is_empty() && !option.format.is_zero_length() {
        return Ok(false);
    }
    if let Some(max) = universe.max_value_length() {
        if value.len() > max {
            return Err(DhcpError::EncapsulationFailure(format!("{}.{}: {} bytes do not fit {} byte length",
                                                               universe.name, option.name,
                                                               value.len(), universe.length_size)));
        }
    }

    let mut header = [0u8; 8];
    let mut len = universe.store_tag(&mut header, option.code)?;
    len += universe.store_length(&mut header[len..], value.len() as u32)?;

    result.extend_from_slice(&header[..len]);
    result.extend_from_slice(value);
    Ok(true)
}

/// Encode one option instance, including the tail of an 'e' format.
pub fn store_option(ctx: &EncodeContext<'_>, result: &mut Vec<u8>, universe: &Universe,
                    entry: &OptionEntry) -> Result<bool, DhcpError> {
    let mut value = match ctx.evaluate(entry) {
        Some(value) => value.to_vec(),
        None => return Ok(false),
    };

    if entry.option.format.encapsulation_mode() == Some(EncapsulationMode::Partial) {
        if let Some(Some(name)) = entry.option.format.encapsulation() {
            match option_space_encapsulate(ctx, name) {
                Ok(Some(tail)) => value.extend_from_slice(&tail),
                Ok(None) => {}
                Err(e) => warn!("{}.{}: {}", universe.name, entry.option.name, e),
            }
        }
    }

    append_option(result, universe, &entry.option, &value)
}

/// Encode a space by name.
pub fn option_space_encapsulate(ctx: &EncodeContext<'_>, name: &str) -> Result<Option<Vec<u8>>, DhcpError> {
    let universe = ctx.registry.lookup_universe(name)
        .ok_or_else(|| DhcpError::EncapsulationFailure(format!("no option space {}", name)))?;
    encapsulate(ctx, universe)
}

/// Deepest nesting of option spaces the encoder follows.
pub const MAX_ENCAPSULATION_DEPTH: usize = 8;

/// Encode a space with its own strategy.
pub fn encapsulate(ctx: &EncodeContext<'_>, universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
    if ctx.depth >= MAX_ENCAPSULATION_DEPTH {
        return Err(DhcpError::EncapsulationFailure(format!("{}: nested more than {} deep",
                                                           universe.name, MAX_ENCAPSULATION_DEPTH)));
    }
    let ctx = EncodeContext { depth: ctx.depth + 1, ..*ctx };
    universe.codec().encapsulate(&ctx, universe)
}

fn store_entries(ctx: &EncodeContext<'_>, result: &mut Vec<u8>, universe: &Universe) -> bool {
    let mut stored = false;

    for head in ctx.cfg.iter(universe.id) {
        for entry in head.chain() {
            match store_option(ctx, result, universe, entry) {
                Ok(true) => stored = true,
                Ok(false) => {}
                Err(e) => error!("{}", e),
            }
        }
    }
    stored
}

/// Emit child spaces of `universe` whose carrying option has no value of
/// its own.
fn search_subencapsulation(ctx: &EncodeContext<'_>, result: &mut Vec<u8>, universe: &Universe) -> bool {
    let mut stored = false;

    for sub in ctx.registry.encapsulated_by(universe.id) {
        let Some((_, code)) = sub.enc_opt else {
            continue;
        };
        let Some(option) = ctx.registry.lookup_option(universe.id, code) else {
            continue;
        };
        if option.format.encapsulation_mode() != Some(EncapsulationMode::Full)
            || ctx.cfg.lookup(universe.id, code).is_some() {
            continue;
        }

        match encapsulate(ctx, sub) {
            Ok(Some(value)) => match append_option(result, universe, &option, &value) {
                Ok(true) => stored = true,
                Ok(false) => {}
                Err(e) => error!("{}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("{}.{}: {}", universe.name, option.name, e),
        }
    }
    stored
}

/// Hashed and linked spaces: every configured instance, then any
/// spaces nested below this one.
pub fn space_encapsulate(ctx: &EncodeContext<'_>, universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
    let mut result = Vec::new();

    let stored = store_entries(ctx, &mut result, universe);
    let nested = search_subencapsulation(ctx, &mut result, universe);

    if stored || nested {
        Ok(Some(result))
    } else {
        Ok(None)
    }
}

/// NetWare/IP sub-option 2, "NWIP exists in options area".
const NWIP_EXISTS: [u8; 2] = [2, 0];
/// NetWare/IP sub-option 1, "NWIP does not exist".
const NWIP_DOES_NOT_EXIST: [u8; 2] = [1, 0];

/// NetWare/IP: configured sub-options behind a status sub-option.
pub fn nwip_encapsulate(ctx: &EncodeContext<'_>, universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
    if ctx.cfg.iter(universe.id).next().is_none() {
        return Ok(None);
    }

    let mut result = NWIP_EXISTS.to_vec();
    if store_entries(ctx, &mut result, universe) {
        Ok(Some(result))
    } else {
        Ok(Some(NWIP_DOES_NOT_EXIST.to_vec()))
    }
}

/// Client FQDN: rebuild flags, rcodes and name from the virtual
/// sub-options.
pub fn fqdn_encapsulate(ctx: &EncodeContext<'_>, universe: &Universe) -> Result<Option<Vec<u8>>, DhcpError> {
    if ctx.cfg.iter(universe.id).next().is_none() {
        return Ok(None);
    }

    let mut results: [Option<Bytes>; FQDN_SUBOPTION_COUNT + 1] = Default::default();
    for entry in ctx.cfg.iter(universe.id) {
        let code = entry.code() as usize;
        if code > 0 && code <= FQDN_SUBOPTION_COUNT {
            results[code] = ctx.evaluate(entry);
        }
    }

    let first = |code: FqdnSubOptionCode| {
        results[code.code() as usize].as_ref().and_then(|v| v.first().copied())
    };

    let mut out = vec![0u8; 3];
    if first(FqdnSubOptionCode::NoClientUpdate).unwrap_or(0) != 0 {
        out[0] |= 2;
    }
    if first(FqdnSubOptionCode::ServerUpdate).unwrap_or(0) != 0 {
        out[0] |= 1;
    }
    if let Some(rcode) = first(FqdnSubOptionCode::Rcode1) {
        out[1] = rcode;
    }
    if let Some(rcode) = first(FqdnSubOptionCode::Rcode2) {
        out[2] = rcode;
    }

    let name = results[FqdnSubOptionCode::Fqdn.code() as usize].as_ref().filter(|v| !v.is_empty());
    if first(FqdnSubOptionCode::Encoded).unwrap_or(0) != 0 {
        out[0] |= 4;
        if let Some(name) = name {
            out.extend(fqdn_encode(name)?);
        }
    } else if let Some(name) = name {
        out.extend_from_slice(name);
    }

    Ok(Some(out))
}

/// Dotted name to DNS wire labels.  An empty label ends the name.
pub fn fqdn_encode(name: &[u8]) -> Result<Vec<u8>, DhcpError> {
    let mut out = Vec::with_capacity(name.len() + 2);
    let mut i = 0;

    while i < name.len() {
        let end = name[i..].iter()
            .position(|c| *c == b'.' || *c == 0)
            .map_or(name.len(), |p| i + p);
        let len = end - i;
        if len > 63 {
            return Err(DhcpError::EncapsulationFailure(format!("label of {} bytes", len)));
        }

        out.push(len as u8);
        if len == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&name[i..end]);
        i = end + 1;
    }
    out.push(0);
    Ok(out)
}
