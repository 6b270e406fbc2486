//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//

pub mod format;
pub mod universe;
pub mod registry;
pub mod tables;
pub mod store;
pub mod decode;
pub mod encapsulate;
pub mod pack;
pub mod cons;
pub mod message;
pub mod config;

use std::fmt;
use std::convert::TryFrom;

pub use common::DhcpError;

/// BOOTP Mesage type.
#[derive(PartialEq, Copy, Clone)]
pub enum BootpMessageType {
    BOOTREQUEST = 1,
    BOOTREPLY = 2,
}

impl fmt::Debug for BootpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            BootpMessageType::BOOTREQUEST => write!(f, "BOOTREQUEST"),
            BootpMessageType::BOOTREPLY => write!(f, "BOOTREPLY"),
        }
    }
}

impl TryFrom<u8> for BootpMessageType {
    type Error = DhcpError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            x if x == BootpMessageType::BOOTREQUEST as u8 => Ok(BootpMessageType::BOOTREQUEST),
            x if x == BootpMessageType::BOOTREPLY as u8 => Ok(BootpMessageType::BOOTREPLY),
            _ => Err(DhcpError::InvalidBootpMessageType),
        }
    }
}

/// DHCP Message Type.
#[derive(PartialEq, Eq, Copy, Clone)]
pub enum DhcpMessageType {
    DHCPDISCOVER = 1,
    DHCPOFFER = 2,
    DHCPREQUEST = 3,
    DHCPDECLINE = 4,
    DHCPACK = 5,
    DHCPNAK = 6,
    DHCPRELEASE = 7,
    DHCPINFORM = 8,
    DHCPFORCERENEW = 9,
    DHCPLEASEQUERY = 10,
    DHCPLEASEUNASSIGNED = 11,
    DHCPLEASEUNKNOWN = 12,
    DHCPLEASEACTIVE = 13,
}

impl fmt::Debug for DhcpMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match &self {
            DhcpMessageType::DHCPDISCOVER => "DHCPDISCOVER",
            DhcpMessageType::DHCPOFFER => "DHCPOFFER",
            DhcpMessageType::DHCPREQUEST => "DHCPREQUEST",
            DhcpMessageType::DHCPDECLINE => "DHCPDECLINE",
            DhcpMessageType::DHCPACK => "DHCPACK",
            DhcpMessageType::DHCPNAK => "DHCPNAK",
            DhcpMessageType::DHCPRELEASE => "DHCPRELEASE",
            DhcpMessageType::DHCPINFORM => "DHCPINFORM",
            DhcpMessageType::DHCPFORCERENEW => "DHCPFORCERENEW",
            DhcpMessageType::DHCPLEASEQUERY => "DHCPLEASEQUERY",
            DhcpMessageType::DHCPLEASEUNASSIGNED => "DHCPLEASEUNASSIGNED",
            DhcpMessageType::DHCPLEASEUNKNOWN => "DHCPLEASEUNKNOWN",
            DhcpMessageType::DHCPLEASEACTIVE => "DHCPLEASEACTIVE",
        };
        write!(f, "{}", s)
    }
}

impl TryFrom<u8> for DhcpMessageType {
    type Error = DhcpError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            x if x == DhcpMessageType::DHCPDISCOVER as u8 => Ok(DhcpMessageType::DHCPDISCOVER),
            x if x == DhcpMessageType::DHCPOFFER as u8 => Ok(DhcpMessageType::DHCPOFFER),
            x if x == DhcpMessageType::DHCPREQUEST as u8 => Ok(DhcpMessageType::DHCPREQUEST),
            x if x == DhcpMessageType::DHCPDECLINE as u8 => Ok(DhcpMessageType::DHCPDECLINE),
            x if x == DhcpMessageType::DHCPACK as u8 => Ok(DhcpMessageType::DHCPACK),
            x if x == DhcpMessageType::DHCPNAK as u8 => Ok(DhcpMessageType::DHCPNAK),
            x if x == DhcpMessageType::DHCPRELEASE as u8 => Ok(DhcpMessageType::DHCPRELEASE),
            x if x == DhcpMessageType::DHCPINFORM as u8 => Ok(DhcpMessageType::DHCPINFORM),
            x if x == DhcpMessageType::DHCPFORCERENEW as u8 => Ok(DhcpMessageType::DHCPFORCERENEW),
            x if x == DhcpMessageType::DHCPLEASEQUERY as u8 => Ok(DhcpMessageType::DHCPLEASEQUERY),
            x if x == DhcpMessageType::DHCPLEASEUNASSIGNED as u8 => Ok(DhcpMessageType::DHCPLEASEUNASSIGNED),
            x if x == DhcpMessageType::DHCPLEASEUNKNOWN as u8 => Ok(DhcpMessageType::DHCPLEASEUNKNOWN),
            x if x == DhcpMessageType::DHCPLEASEACTIVE as u8 => Ok(DhcpMessageType::DHCPLEASEACTIVE),
            _ => Err(DhcpError::InvalidDhcpMessageType),
        }
    }
}

/// DHCP Option Code, the ones the codec itself has to know about.
///   https://www.iana.org/assignments/bootp-dhcp-parameters/bootp-dhcp-parameters.xhtml
///
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum DhcpOptionCode {
    Pad = 0,					// RFC2132
    SubnetMask = 1,				// RFC2132
    Router = 3,					// RFC2132
    DomainServer = 6,				// RFC2132
    HostName = 12,				// RFC2132
    DomainName = 15,				// RFC2132
    VendorSpecific = 43,			// RFC2132
    NetWareIPInformation = 63,			// RFC2242
    AddressRequest = 50,			// RFC2132
    AddressTime = 51,				// RFC2132
    Overload = 52,				// RFC2132
    DHCPMsgType = 53,				// RFC2132
    DHCPServerId = 54,				// RFC2132
    ParameterList = 55,				// RFC2132
    Message = 56,				// RFC2132
    MaxMessageSize = 57,			// RFC2132
    RenewalTime = 58,				// RFC2132
    RebindingTime = 59,				// RFC2132
    ClientId = 61,				// RFC2132, RFC4361
    RapidCommit = 80,				// RFC4039
    ClientFQDN = 81,				// RFC4702
    RelayAgentInformation = 82,			// RFC3046
    AssociatedIP = 92,				// RFC4388
    SubnetSelection = 118,			// RFC3011
    VIVendorClass = 124,			// RFC3925
    VIVendorSpecificInformation = 125,		// RFC3925
    End = 255,					// RFC2132
}

impl DhcpOptionCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Sub-options of the virtual FQDN space.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum FqdnSubOptionCode {
    NoClientUpdate = 1,
    ServerUpdate = 2,
    Encoded = 3,
    Rcode1 = 4,
    Rcode2 = 5,
    Hostname = 6,
    Domainname = 7,
    Fqdn = 8,
}

impl FqdnSubOptionCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Number of sub-options in the FQDN space.
pub const FQDN_SUBOPTION_COUNT: usize = 8;
