//
// DHCP-RS - Common
//   Copyright (C) 2024-2025, Toshiaki Takada
//

pub mod encode;
pub mod error;

pub use error::DhcpError;
