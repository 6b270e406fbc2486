//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::*;
use crate::cons::BuildRequest;
use crate::decode::{EndPolicy, ParsePolicy, TOLERATED_MALFORMED_TYPES};
use crate::registry::{Enumeration, Registry, RegistryBuilder, SpaceSpec};
use crate::store::OptionStore;
use crate::universe::SpaceKind;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: ConfigGlobal,
    #[serde(default)]
    pub option_space: BTreeMap<String, ConfigOptionSpace>,
    #[serde(default)]
    pub enumeration: BTreeMap<String, ConfigEnumeration>,
}

impl Config {
    pub fn from_json(s: &str) -> Result<Config, DhcpError> {
        serde_json::from_str(s)
            .map_err(|e| DhcpError::ConfigError(format!("{}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, DhcpError> {
        let s = fs::read_to_string(path.as_ref())
            .map_err(|e| DhcpError::ConfigError(format!("{}: {}", path.as_ref().display(), e)))?;
        Config::from_json(&s)
    }

    pub fn is_debug_enabled(&self) -> bool {
        match self.global.debug {
            Some(debug) => debug,
            None => false,
        }
    }

    /// Standard spaces plus the configured ones.
    pub fn registry(&self) -> Result<Registry, DhcpError> {
        let mut builder = RegistryBuilder::standard();

        for (name, e) in &self.enumeration {
            let mut values: Vec<(String, u32)> = e.values.iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            values.sort_by_key(|(_, v)| *v);
            builder = builder.enumeration(Enumeration {
                name: name.clone(),
                width: e.width,
                values,
            });
        }

        for (name, space) in &self.option_space {
            if !builder.has_space(name) {
                debug!("option space {} from config", name);
                builder = builder.space(space.spec(name));
            }
            for option in &space.options {
                builder = builder.option(name, &option.name, option.code, &option.format);
            }
        }

        builder.build()
    }

    pub fn parse_policy(&self) -> Result<ParsePolicy, DhcpError> {
        let end = match self.global.require_end_option {
            Some(true) => EndPolicy::Required,
            _ => EndPolicy::Optional,
        };
        let tolerated_types = match &self.global.tolerated_malformed_types {
            Some(types) => types.iter()
                .map(|t| DhcpMessageType::try_from(*t))
                .collect::<Result<Vec<DhcpMessageType>, DhcpError>>()?,
            None => TOLERATED_MALFORMED_TYPES.to_vec(),
        };

        Ok(ParsePolicy { end, tolerated_types })
    }

    /// Sizing and termination defaults for replies.
    pub fn build_request(&self) -> BuildRequest {
        BuildRequest {
            max_message_size: self.global.max_message_size,
            terminate: self.global.terminate_text.unwrap_or(false),
            ..Default::default()
        }
    }

    pub fn vendor_option_space(&self) -> Option<&str> {
        self.global.vendor_option_space.as_deref()
    }

    /// Point `store` at the configured site space.
    pub fn apply_site_space(&self, registry: &Registry, store: &mut OptionStore) -> Result<(), DhcpError> {
        let name = match &self.global.site_option_space {
            Some(name) => name,
            None => return Ok(()),
        };
        match registry.lookup_universe(name) {
            Some(universe) => {
                store.set_site_space(universe.id, self.global.site_code_min.unwrap_or(224));
                Ok(())
            }
            None => Err(DhcpError::ConfigError(format!("unknown site option space {}", name))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigGlobal {
    pub debug: Option<bool>,
    pub max_message_size: Option<usize>,
    pub terminate_text: Option<bool>,
    pub require_end_option: Option<bool>,
    pub vendor_option_space: Option<String>,
    pub tolerated_malformed_types: Option<Vec<u8>>,
    pub site_option_space: Option<String>,
    pub site_code_min: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStorage {
    Hashed,
    Linked,
}

#[derive(Debug, Deserialize)]
pub struct ConfigParent {
    pub space: String,
    pub code: u32,
}

#[derive(Debug, Deserialize)]
pub struct ConfigOptionSpace {
    pub code_width: usize,
    pub length_width: usize,
    pub storage: Option<ConfigStorage>,
    pub parent: Option<ConfigParent>,
    #[serde(default)]
    pub options: Vec<ConfigOption>,
}

impl ConfigOptionSpace {
    fn spec(&self, name: &str) -> SpaceSpec {
        let mut spec = SpaceSpec::new(name, self.code_width, self.length_width);
        spec.kind = match self.storage {
            Some(ConfigStorage::Linked) => SpaceKind::Linked,
            _ => SpaceKind::Hashed,
        };
        spec.parent = self.parent.as_ref()
            .map(|p| (p.space.clone(), p.code));
        spec
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigOption {
    pub name: String,
    pub code: u32,
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfigEnumeration {
    pub width: usize,
    pub values: BTreeMap<String, u32>,
}
