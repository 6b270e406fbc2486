//
// DHCP-RS - Common
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum DhcpError {
    #[error("Invalid BOOTP Message Type")]
    InvalidBootpMessageType,
    #[error("Invalid DHCP Message Type")]
    InvalidDhcpMessageType,
    #[error("Insuffcient buffer size {0}")]
    InsufficientBufferSize(String),
    #[error("Malformed option {0}")]
    Malformed(String),
    #[error("Encapsulation failure {0}")]
    EncapsulationFailure(String),
    #[error("Overflow {0}")]
    Overflow(String),
    #[error("Invalid format {0}")]
    InvalidFormat(String),
    #[error("Invalid Value {0}")]
    InvalidValue(String),
    #[error("Unknown option {0}")]
    UnknownOption(String),
    #[error("Registry error {0}")]
    RegistryError(String),
    #[error("Config error {0}")]
    ConfigError(String),
}
