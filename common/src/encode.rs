//
// DHCP-RS - Common
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Encode:
//  Low level utility functions to put/get values into/from a buffer.
//  All multi-byte values are in network byte order.
//

use std::mem::size_of;
use std::net::Ipv4Addr;

use crate::DhcpError;

fn short_buffer(what: &str, have: usize, need: usize) -> DhcpError {
    DhcpError::InsufficientBufferSize(format!("for {} {} < {}", what, have, need))
}

/// Largest value a field of `width` bytes can carry.
pub fn width_max(width: usize) -> u64 {
    match width {
        0 => 0,
        1 => 0xFF,
        2 => 0xFFFF,
        _ => 0xFFFF_FFFF,
    }
}

/// Copy arbitrary number of bytes from a slice to other.
pub fn encode_data(buf: &mut [u8], data: &[u8]) -> Result<usize, DhcpError> {
    if buf.len() < data.len() {
        return Err(short_buffer("data", buf.len(), data.len()));
    }

    buf[..data.len()].copy_from_slice(data);
    Ok(data.len())
}

/// Encode an unsigned value of 0, 1, 2 or 4 bytes.
pub fn encode_uint(buf: &mut [u8], width: usize, v: u32) -> Result<usize, DhcpError> {
    if buf.len() < width {
        return Err(short_buffer("uint", buf.len(), width));
    }
    if v as u64 > width_max(width) {
        return Err(DhcpError::InvalidValue(format!("{} does not fit in {} bytes", v, width)));
    }

    match width {
        0 => {}
        1 => buf[0] = v as u8,
        2 => buf[..2].copy_from_slice(&(v as u16).to_be_bytes()),
        4 => buf[..4].copy_from_slice(&v.to_be_bytes()),
        _ => return Err(DhcpError::InvalidValue(format!("width {}", width))),
    }
    Ok(width)
}

/// Encode u8 value into buffer.
pub fn encode_u8(buf: &mut [u8], v: u8) -> Result<usize, DhcpError> {
    encode_uint(buf, size_of::<u8>(), v as u32)
}

/// Encode u16 value into buffer.
pub fn encode_u16(buf: &mut [u8], v: u16) -> Result<usize, DhcpError> {
    encode_uint(buf, size_of::<u16>(), v as u32)
}

/// Encode u32 value into buffer.
pub fn encode_u32(buf: &mut [u8], v: u32) -> Result<usize, DhcpError> {
    encode_uint(buf, size_of::<u32>(), v)
}

/// Encode IPv4 address into buffer.
pub fn encode_ipv4(buf: &mut [u8], v: Ipv4Addr) -> Result<usize, DhcpError> {
    encode_data(buf, &v.octets())
}

/// Return an unsigned value of 0, 1, 2 or 4 bytes.
pub fn decode_uint(data: &[u8], width: usize) -> Result<u32, DhcpError> {
    if data.len() < width {
        return Err(short_buffer("uint", data.len(), width));
    }

    match width {
        0 => Ok(0),
        1 => Ok(data[0] as u32),
        2 => Ok(u16::from_be_bytes([data[0], data[1]]) as u32),
        4 => Ok(u32::from_be_bytes([data[0], data[1], data[2], data[3]])),
        _ => Err(DhcpError::InvalidValue(format!("width {}", width))),
    }
}

/// Return u8 value.
pub fn decode_u8(data: &[u8]) -> Result<u8, DhcpError> {
    Ok(decode_uint(data, size_of::<u8>())? as u8)
}

/// Return u16 value in host byte order.
pub fn decode_u16(data: &[u8]) -> Result<u16, DhcpError> {
    Ok(decode_uint(data, size_of::<u16>())? as u16)
}

/// Return u32 value in host byte order.
pub fn decode_u32(data: &[u8]) -> Result<u32, DhcpError> {
    decode_uint(data, size_of::<u32>())
}

/// Return Ipv4Addr.
pub fn decode_ipv4(data: &[u8]) -> Result<Ipv4Addr, DhcpError> {
    if data.len() < size_of::<Ipv4Addr>() {
        return Err(short_buffer("Ipv4Addr", data.len(), size_of::<Ipv4Addr>()));
    }
    Ok(Ipv4Addr::new(data[0], data[1], data[2], data[3]))
}

/// Copy data from buffer.
pub fn decode_data(buf: &mut [u8], data: &[u8]) -> Result<(), DhcpError> {
    if buf.len() < data.len() {
        return Err(short_buffer("data", buf.len(), data.len()));
    }

    buf[..data.len()].copy_from_slice(data);
    Ok(())
}
