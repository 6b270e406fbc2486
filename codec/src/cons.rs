//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Cons:
//  Build the options area of an outgoing packet: size it, choose what to
//  send and in which order, pack, then add overload and relay agent
//  information.
//

use log::{debug, error, warn};

use common::encode::decode_u16;

use crate::decode::DHCP_OPTIONS_COOKIE;
use crate::encapsulate::EncodeContext;
use crate::pack::{store_options, PackRegions};
use crate::universe::DHCP_UNIVERSE;
use crate::{DhcpError, DhcpMessageType, DhcpOptionCode, FqdnSubOptionCode};

pub const DHCP_UDP_OVERHEAD: usize = 20 + 8;
pub const DHCP_SNAME_LEN: usize = 64;
pub const DHCP_FILE_LEN: usize = 128;
pub const DHCP_FIXED_NON_UDP: usize = 236;
pub const DHCP_FIXED_LEN: usize = DHCP_FIXED_NON_UDP + DHCP_UDP_OVERHEAD;
pub const DHCP_MTU_MAX: usize = 1500;
pub const DHCP_MTU_MIN: usize = 576;
pub const DHCP_MAX_OPTION_LEN: usize = DHCP_MTU_MAX - DHCP_FIXED_LEN;
pub const DHCP_MIN_OPTION_LEN: usize = DHCP_MTU_MIN - DHCP_FIXED_LEN;
/// Options area of a BOOTP packet.
pub const BOOTP_MIN_OPTION_LEN: usize = 64;
/// Shortest datagram a BOOTP relay or client accepts.
pub const BOOTP_MIN_LEN: usize = 300;

/// Options sent ahead of everything else, in this order.
pub const MANDATORY_OPTIONS: [u32; 8] = [
    DhcpOptionCode::DHCPMsgType as u32,
    DhcpOptionCode::DHCPServerId as u32,
    DhcpOptionCode::AddressTime as u32,
    DhcpOptionCode::RenewalTime as u32,
    DhcpOptionCode::RebindingTime as u32,
    DhcpOptionCode::Message as u32,
    DhcpOptionCode::AddressRequest as u32,
    DhcpOptionCode::AssociatedIP as u32,
];

const PRIORITY_COUNT: usize = 300;

/// What the caller knows about the packet being built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildRequest {
    /// Type of the message being answered.
    pub inbound_type: Option<DhcpMessageType>,
    /// Length of the datagram being answered, used to size BOOTP replies.
    pub inbound_length: Option<usize>,
    /// Largest datagram the caller is willing to send.
    pub max_message_size: Option<usize>,
    pub bootp: bool,
    /// Overload regions that may be used: 1 file, 2 sname.
    pub overload_avail: u8,
    /// NUL terminate text options.
    pub terminate: bool,
    pub parameter_request_list: Option<Vec<u8>>,
    /// Echo relay agent information back.
    pub preserve_agent_options: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsOutcome {
    /// Cookie, options and END.
    pub options: Vec<u8>,
    pub file: Option<[u8; DHCP_FILE_LEN]>,
    pub sname: Option<[u8; DHCP_SNAME_LEN]>,
    pub overflowed: Vec<u32>,
}

/// Options area size, cookie included.
fn option_area_size(ctx: &EncodeContext<'_>, req: &BuildRequest) -> usize {
    let mut mms = req.max_message_size.unwrap_or(0);

    if let Some(inbound) = ctx.inbound {
        let requested = inbound.lookup(DHCP_UNIVERSE, DhcpOptionCode::MaxMessageSize.code())
            .and_then(|entry| ctx.evaluate(entry))
            .and_then(|v| decode_u16(&v).ok());
        if let Some(requested) = requested {
            let requested = requested as usize;
            if mms == 0 || requested < mms {
                mms = requested;
            }
        }
    }

    if mms > 0 {
        if mms < DHCP_MTU_MIN {
            DHCP_MIN_OPTION_LEN
        } else if mms > DHCP_MTU_MAX {
            DHCP_MAX_OPTION_LEN
        } else {
            mms - DHCP_FIXED_LEN
        }
    } else if req.bootp {
        match req.inbound_length {
            Some(len) if len >= BOOTP_MIN_OPTION_LEN + DHCP_FIXED_NON_UDP => len - DHCP_FIXED_NON_UDP,
            _ => BOOTP_MIN_OPTION_LEN,
        }
    } else {
        DHCP_MIN_OPTION_LEN
    }
}

fn priority_list(ctx: &EncodeContext<'_>, req: &BuildRequest) -> Vec<u32> {
    let cfg = ctx.cfg;
    let agent = DhcpOptionCode::RelayAgentInformation.code();
    let mut list: Vec<u32> = MANDATORY_OPTIONS.to_vec();

    match req.parameter_request_list.as_deref() {
        Some(prl) if !prl.is_empty() => {
            if cfg.lookup(DHCP_UNIVERSE, DhcpOptionCode::SubnetSelection.code()).is_some() {
                list.push(DhcpOptionCode::SubnetSelection.code());
            }
            list.extend(prl.iter().map(|c| *c as u32).filter(|c| *c != agent));

            let fqdn = ctx.registry.lookup_universe("fqdn");
            let client_fqdn = match (ctx.inbound, fqdn) {
                (Some(inbound), Some(fqdn)) => inbound.lookup(fqdn.id, FqdnSubOptionCode::Encoded.code()).is_some(),
                _ => false,
            };
            if client_fqdn {
                list.push(DhcpOptionCode::ClientFQDN.code());
            }
            if matches!(req.inbound_type, Some(DhcpMessageType::DHCPDISCOVER) | Some(DhcpMessageType::DHCPREQUEST)) {
                list.push(DhcpOptionCode::SubnetMask.code());
            }
        }
        _ => {
            list.extend([
                DhcpOptionCode::SubnetMask.code(),
                DhcpOptionCode::Router.code(),
                DhcpOptionCode::DomainServer.code(),
                DhcpOptionCode::HostName.code(),
                DhcpOptionCode::ClientFQDN.code(),
            ]);

            let site_code_min = cfg.site_code_min();
            if site_code_min > 0 {
                list.extend(cfg.iter(DHCP_UNIVERSE)
                            .map(|e| e.code())
                            .filter(|c| *c < site_code_min && *c != agent));
            }
            list.extend(cfg.iter(cfg.site_universe())
                        .map(|e| e.code())
                        .filter(|c| *c >= site_code_min && *c != agent));
            list.extend(ctx.registry.encapsulated_by(DHCP_UNIVERSE)
                        .filter_map(|u| u.enc_opt.map(|(_, code)| code))
                        .filter(|c| *c != agent));
            list.push(DhcpOptionCode::VendorSpecific.code());
        }
    }

    list.truncate(PRIORITY_COUNT);
    list
}

/// Relay agent information to echo, from the configured store or else
/// from the message being answered.
fn agent_options(ctx: &EncodeContext<'_>) -> Vec<u8> {
    let code = DhcpOptionCode::RelayAgentInformation.code();
    let agent = match ctx.registry.lookup_universe("agent") {
        Some(agent) => agent,
        None => return Vec::new(),
    };

    let source = match ctx.inbound {
        Some(inbound) if ctx.cfg.iter(agent.id).next().is_none()
            && ctx.cfg.lookup(DHCP_UNIVERSE, code).is_none() => inbound,
        _ => ctx.cfg,
    };
    let agent_ctx = EncodeContext { cfg: source, ..*ctx };
    store_options(&agent_ctx, PackRegions::primary(1024), &[code], false).primary
}

/// Build the options area for `ctx.cfg`.
pub fn cons_options(ctx: &EncodeContext<'_>, req: &BuildRequest) -> Result<ConsOutcome, DhcpError> {
    let mut mb_size = option_area_size(ctx, req);

    let agent = if req.preserve_agent_options {
        agent_options(ctx)
    } else {
        Vec::new()
    };
    if !agent.is_empty() {
        mb_size = (mb_size + agent.len()).min(DHCP_MAX_OPTION_LEN);
    }

    let priority = priority_list(ctx, req);
    let regions = PackRegions {
        primary: mb_size.saturating_sub(DHCP_OPTIONS_COOKIE.len() + agent.len()),
        secondary: if req.overload_avail & 1 != 0 { Some(DHCP_FILE_LEN) } else { None },
        tertiary: if req.overload_avail & 2 != 0 { Some(DHCP_SNAME_LEN) } else { None },
    };
    debug!("options area {} bytes, {} for options", mb_size, regions.primary);

    let packed = store_options(ctx, regions, &priority, req.terminate);

    for code in &packed.overflowed {
        if MANDATORY_OPTIONS.contains(code) {
            return Err(DhcpError::Overflow(format!("option {} does not fit", code)));
        }
    }

    let mut options = Vec::with_capacity(mb_size);
    options.extend_from_slice(&DHCP_OPTIONS_COOKIE);
    options.extend_from_slice(&packed.primary);

    if packed.overload != 0 {
        if mb_size.saturating_sub(agent.len() + options.len()) < 3 {
            return Err(DhcpError::Overflow("no room for option overload".to_string()));
        }
        options.extend_from_slice(&[DhcpOptionCode::Overload as u8, 1, packed.overload]);
    }

    if !agent.is_empty() {
        if mb_size.saturating_sub(options.len()) >= agent.len() {
            options.extend_from_slice(&agent);
        } else {
            error!("Unable to store relay agent information in reply packet.");
        }
    }

    if options.len() < mb_size {
        options.push(DhcpOptionCode::End as u8);
    } else {
        warn!("no room for END option");
    }

    Ok(ConsOutcome {
        options,
        file: packed.secondary.and_then(|v| <[u8; DHCP_FILE_LEN]>::try_from(v.as_slice()).ok()),
        sname: packed.tertiary.and_then(|v| <[u8; DHCP_SNAME_LEN]>::try_from(v.as_slice()).ok()),
        overflowed: packed.overflowed,
    })
}
