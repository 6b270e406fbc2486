//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::fmt;
use std::net::Ipv4Addr;

use bytes::Bytes;
use log::debug;

use common::encode::*;

use crate::*;
use crate::cons::{cons_options, BuildRequest, BOOTP_MIN_LEN, DHCP_FIXED_NON_UDP};
use crate::decode::{parse_options, ParsePolicy};
use crate::encapsulate::EncodeContext;
use crate::registry::Registry;
use crate::store::OptionStore;
use crate::universe::DHCP_UNIVERSE;

/// DHCP message.
pub struct DhcpMessage {
    /// Message type.
    pub op: BootpMessageType,

    /// Hardware type.
    pub htype: u8,

    /// Hardware address len.
    pub hlen: u8,

    /// Hops.
    pub hops: u8,

    /// Transaction ID.
    pub xid: u32,

    /// Seconds elapsed.
    pub secs: u16,

    /// BOOTP flags.
    pub flags: u16,

    /// Client IP address.
    pub ciaddr: Ipv4Addr,

    /// Your (client) IP address.
    pub yiaddr: Ipv4Addr,

    /// Next Server IP address.
    pub siaddr: Ipv4Addr,

    /// Relay agent IP address.
    pub giaddr: Ipv4Addr,

    /// Client Hardware address.
    pub chaddr: [u8; 16],

    /// Server host name.
    pub sname: [u8; 64],

    /// Boot file name.
    pub file: [u8; 128],

    /// Options.
    pub options: OptionStore,

    /// The options area started with the magic cookie.
    pub dhcp: bool,
}

fn chaddr_str(hlen: u8, chaddr: &[u8; 16]) -> String {
    let len = (hlen as usize).min(16);
    chaddr[..len].iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<String>>()
        .join(":")
}

fn u8_to_string(s: &[u8]) -> String {
    let end = s.iter().position(|c| *c == 0).unwrap_or(s.len());
    if end == 0 {
        String::from("(empty)")
    } else {
        match std::str::from_utf8(&s[..end]) {
            Ok(s) => s.to_string(),
            Err(_) => String::from("(error)")
        }
    }
}

impl fmt::Debug for DhcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op: {:?}, htype: {}, hlen: {}, hops: {}, xid: {:#8x}, secs: {}, flags: {:#x}, ciaddr: {}, yiaddr: {}, siaddr: {}, giaddr: {}, chaddr: {}, sname: {}, file: {}, options: {:?}",
               self.op, self.htype, self.hlen, self.hops, self.xid, self.secs, self.flags,
               self.ciaddr, self.yiaddr, self.siaddr, self.giaddr, chaddr_str(self.hlen, &self.chaddr),
               u8_to_string(&self.sname), u8_to_string(&self.file), &self.options)
    }
}

/// DhcpMessage implementation.
impl DhcpMessage {
    /// Empty message with the given op.
    pub fn new(op: BootpMessageType) -> DhcpMessage {
        DhcpMessage {
            op,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options: OptionStore::new(),
            dhcp: true,
        }
    }

    /// Reply skeleton carrying the request's transaction and client fields.
    pub fn reply_to(request: &DhcpMessage) -> DhcpMessage {
        DhcpMessage {
            htype: request.htype,
            hlen: request.hlen,
            xid: request.xid,
            flags: request.flags,
            giaddr: request.giaddr,
            chaddr: request.chaddr,
            ..DhcpMessage::new(BootpMessageType::BOOTREPLY)
        }
    }

    /// Parse DHCP message.
    pub fn new_from(registry: &Registry, buf: &[u8], policy: &ParsePolicy) -> Result<DhcpMessage, DhcpError> {
        if buf.len() < DHCP_FIXED_NON_UDP {
            return Err(DhcpError::InsufficientBufferSize(format!("for message {} < {}",
                                                                  buf.len(), DHCP_FIXED_NON_UDP)));
        }

        let op: BootpMessageType = decode_u8(&buf[..])?.try_into()?;
        let mut chaddr: [u8; 16] = [0; 16];
        let mut sname: [u8; 64] = [0; 64];
        let mut file: [u8; 128] = [0; 128];

        decode_data(&mut chaddr, &buf[28..44])?;
        decode_data(&mut sname, &buf[44..108])?;
        decode_data(&mut file, &buf[108..236])?;

        // Options share one copy of the datagram.
        let raw = Bytes::copy_from_slice(buf);
        let mut options = OptionStore::new();
        let dhcp = parse_options(registry, &mut options, &raw.slice(DHCP_FIXED_NON_UDP..),
                                 &raw.slice(108..236), &raw.slice(44..108), policy)?;

        Ok(DhcpMessage {
            op,
            htype: decode_u8(&buf[1..])?,
            hlen: decode_u8(&buf[2..])?,
            hops: decode_u8(&buf[3..])?,
            xid: decode_u32(&buf[4..])?,
            secs: decode_u16(&buf[8..])?,
            flags: decode_u16(&buf[10..])?,
            ciaddr: decode_ipv4(&buf[12..])?,
            yiaddr: decode_ipv4(&buf[16..])?,
            siaddr: decode_ipv4(&buf[20..])?,
            giaddr: decode_ipv4(&buf[24..])?,
            chaddr,
            sname,
            file,
            options,
            dhcp,
        })
    }

    pub fn message_type(&self) -> Option<DhcpMessageType> {
        self.options.message_type()
    }

    /// Sanity checks on a received message.
    pub fn validate(&self) -> bool {
        match self.options.value(DHCP_UNIVERSE, DhcpOptionCode::ClientId.code()) {
            Some(id) if id.is_empty() => {
                debug!("discarding packet with a zero-length client identifier");
                return false;
            }
            Some(id) if id.len() == 1 => {
                debug!("one-byte client identifier from {}", chaddr_str(self.hlen, &self.chaddr));
            }
            None if self.hlen == 0 => {
                debug!("received packet with no client identifier and no hardware address");
            }
            _ => {}
        }
        true
    }

    /// Build request for a reply to this message.  Text options are NUL
    /// terminated when the client sent its host name that way.
    pub fn reply_request(&self, registry: &Registry, datagram_len: usize) -> BuildRequest {
        let agent = registry.lookup_universe("agent")
            .is_some_and(|u| self.options.iter(u.id).next().is_some());

        BuildRequest {
            inbound_type: self.message_type(),
            inbound_length: Some(datagram_len),
            bootp: !self.dhcp,
            terminate: self.options.had_nulls(DHCP_UNIVERSE, DhcpOptionCode::HostName.code()),
            parameter_request_list: self.options.value(DHCP_UNIVERSE, DhcpOptionCode::ParameterList.code())
                .map(|v| v.as_bytes().to_vec()),
            preserve_agent_options: agent,
            ..Default::default()
        }
    }

    /// Encoding context for this message's options.
    pub fn encode_context<'a>(&'a self, registry: &'a Registry) -> EncodeContext<'a> {
        EncodeContext::new(registry, &self.options)
    }

    /// Encode the message.  Options come from `ctx.cfg`, normally this
    /// message's own store.
    pub fn octets(&self, ctx: &EncodeContext<'_>, req: &BuildRequest) -> Result<Vec<u8>, DhcpError> {
        let cons = cons_options(ctx, req)?;
        let mut buf = vec![0u8; DHCP_FIXED_NON_UDP + cons.options.len()];

        // Encode BOOTP compatible fields.
        encode_u8(&mut buf[0..], self.op as u8)?;
        encode_u8(&mut buf[1..], self.htype)?;
        encode_u8(&mut buf[2..], self.hlen)?;
        encode_u8(&mut buf[3..], self.hops)?;
        encode_u32(&mut buf[4..], self.xid)?;
        encode_u16(&mut buf[8..], self.secs)?;
        encode_u16(&mut buf[10..], self.flags)?;
        encode_ipv4(&mut buf[12..], self.ciaddr)?;
        encode_ipv4(&mut buf[16..], self.yiaddr)?;
        encode_ipv4(&mut buf[20..], self.siaddr)?;
        encode_ipv4(&mut buf[24..], self.giaddr)?;
        encode_data(&mut buf[28..], &self.chaddr)?;

        match &cons.sname {
            Some(sname) => encode_data(&mut buf[44..], sname)?,
            None => encode_data(&mut buf[44..], &self.sname)?,
        };
        match &cons.file {
            Some(file) => encode_data(&mut buf[108..], file)?,
            None => encode_data(&mut buf[108..], &self.file)?,
        };

        // Cookie, options and END.
        encode_data(&mut buf[DHCP_FIXED_NON_UDP..], &cons.options)?;

        // Append padding if it necessary.
        if buf.len() < BOOTP_MIN_LEN {
            buf.resize(BOOTP_MIN_LEN, 0);
        }

        Ok(buf)
    }
}
