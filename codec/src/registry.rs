//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Registry:
//  Option spaces, option definitions and named enumerations.  Built once
//  and read-only afterwards.
//

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use log::{debug, error, warn};

use crate::format::{Format, MinLength};
use crate::tables;
use crate::universe::{SpaceKind, Universe, UniverseId, DHCP_UNIVERSE};
use crate::DhcpError;

/// Option definition.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDef {
    pub code: u32,
    pub name: String,
    pub universe: UniverseId,
    pub format: Format,
    min_length: MinLength,
    text_like: bool,
    encapsulation_offset: Option<usize>,
}

impl OptionDef {
    /// Minimum length of the fixed fields of the value.
    pub fn min_length(&self) -> MinLength {
        self.min_length
    }

    pub fn is_text_like(&self) -> bool {
        self.text_like
    }

    /// Where the encapsulated space starts inside the value.
    pub fn encapsulation_offset(&self) -> Option<usize> {
        self.encapsulation_offset
    }
}

/// Named enumeration usable in formats as "N<name>.".
#[derive(Debug, Clone, PartialEq)]
pub struct Enumeration {
    pub name: String,
    /// Width in bytes, 1, 2 or 4.
    pub width: usize,
    pub values: Vec<(String, u32)>,
}

/// Description of an option space handed to the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceSpec {
    pub name: String,
    pub tag_size: usize,
    pub length_size: usize,
    pub pad: Option<u32>,
    pub end: u32,
    pub concat_duplicates: bool,
    pub kind: SpaceKind,
    /// Parent space name and the code carrying this space.
    pub parent: Option<(String, u32)>,
}

impl SpaceSpec {
    /// An ordinary sub-option space without pad and with END code 0.
    pub fn new(name: &str, tag_size: usize, length_size: usize) -> SpaceSpec {
        SpaceSpec {
            name: name.to_string(),
            tag_size,
            length_size,
            pad: None,
            end: 0,
            concat_duplicates: false,
            kind: SpaceKind::Hashed,
            parent: None,
        }
    }
}

#[derive(Debug, Clone)]
struct OptionSpec {
    space: String,
    name: String,
    code: u32,
    format: String,
}

/// Collects spaces, options and enumerations, then validates them into
/// a `Registry`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    spaces: Vec<SpaceSpec>,
    options: Vec<OptionSpec>,
    enumerations: Vec<Enumeration>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder with the built-in spaces already registered.
    pub fn standard() -> Self {
        tables::load_standard(Self::new())
    }

    pub fn space(mut self, space: SpaceSpec) -> Self {
        self.spaces.push(space);
        self
    }

    /// Add an option; a later definition of the same code in the same
    /// space replaces the earlier one.
    pub fn option(mut self, space: &str, name: &str, code: u32, format: &str) -> Self {
        self.options.push(OptionSpec {
            space: space.to_string(),
            name: name.to_string(),
            code,
            format: format.to_string(),
        });
        self
    }

    pub fn enumeration(mut self, enumeration: Enumeration) -> Self {
        self.enumerations.push(enumeration);
        self
    }

    pub fn has_space(&self, name: &str) -> bool {
        self.spaces.iter().any(|s| s.name == name)
    }

    pub fn build(self) -> Result<Registry, DhcpError> {
        let mut registry = Registry {
            universes: Vec::new(),
            universe_names: HashMap::new(),
            codes: Vec::new(),
            names: Vec::new(),
            enumerations: HashMap::new(),
        };

        for e in self.enumerations {
            if !matches!(e.width, 1 | 2 | 4) {
                return Err(DhcpError::ConfigError(format!("enumeration {} width {}", e.name, e.width)));
            }
            let max = common::encode::width_max(e.width);
            if let Some((name, value)) = e.values.iter().find(|(_, v)| *v as u64 > max) {
                return Err(DhcpError::ConfigError(format!("enumeration {} value {} = {} too wide",
                                                          e.name, name, value)));
            }
            registry.enumerations.insert(e.name.clone(), e);
        }

        for (index, spec) in self.spaces.iter().enumerate() {
            if registry.universe_names.contains_key(&spec.name) {
                return Err(DhcpError::ConfigError(format!("duplicate option space {}", spec.name)));
            }
            if !matches!(spec.tag_size, 1 | 2 | 4) {
                return Err(DhcpError::ConfigError(format!("option space {} code width {}",
                                                          spec.name, spec.tag_size)));
            }
            if !matches!(spec.length_size, 0 | 1 | 2 | 4) {
                return Err(DhcpError::ConfigError(format!("option space {} length width {}",
                                                          spec.name, spec.length_size)));
            }

            let id = UniverseId(index);
            registry.universes.push(Universe {
                id,
                name: spec.name.clone(),
                tag_size: spec.tag_size,
                length_size: spec.length_size,
                pad: spec.pad,
                end: spec.end,
                concat_duplicates: spec.concat_duplicates,
                enc_opt: None,
                kind: spec.kind,
            });
            registry.universe_names.insert(spec.name.clone(), id);
            registry.codes.push(HashMap::new());
            registry.names.push(HashMap::new());
        }

        match registry.universe_names.get("dhcp") {
            Some(id) if *id == DHCP_UNIVERSE => {}
            _ => return Err(DhcpError::ConfigError("dhcp option space must come first".to_string())),
        }

        for (index, spec) in self.spaces.iter().enumerate() {
            if let Some((parent, code)) = &spec.parent {
                let parent_id = *registry.universe_names.get(parent).ok_or_else(|| {
                    DhcpError::ConfigError(format!("option space {} encapsulated by unknown space {}",
                                                   spec.name, parent))
                })?;
                if parent_id.0 == index {
                    return Err(DhcpError::ConfigError(format!("option space {} encapsulates itself",
                                                              spec.name)));
                }
                registry.universes[index].enc_opt = Some((parent_id, *code));
            }
        }

        for spec in self.options {
            let id = *registry.universe_names.get(&spec.space).ok_or_else(|| {
                DhcpError::ConfigError(format!("option {} in unknown space {}", spec.name, spec.space))
            })?;
            let universe = &registry.universes[id.0];
            if spec.code as u64 > common::encode::width_max(universe.tag_size) {
                return Err(DhcpError::ConfigError(format!("option {}.{} code {} too wide",
                                                          spec.space, spec.name, spec.code)));
            }

            let format = Format::parse(&spec.format);
            if let Err(e) = format.validate() {
                warn!("option {}.{}: {}", spec.space, spec.name, e);
            }
            let widths = |name: &str| registry.enumerations.get(name).map(|e| e.width);
            let option = Arc::new(OptionDef {
                code: spec.code,
                name: spec.name.clone(),
                universe: id,
                min_length: format.min_length(widths),
                text_like: format.is_text_like(),
                encapsulation_offset: format.encapsulation_offset(widths),
                format,
            });

            if let Some(old) = registry.codes[id.0].insert(spec.code, option.clone()) {
                debug!("option {}.{} replaced by {}", spec.space, old.name, spec.name);
                registry.names[id.0].remove(&old.name);
            }
            registry.names[id.0].insert(spec.name, option);
        }

        registry.check_encapsulation_cycles()?;
        Ok(registry)
    }
}

/// Read-only option registry.
#[derive(Debug)]
pub struct Registry {
    universes: Vec<Universe>,
    universe_names: HashMap<String, UniverseId>,
    codes: Vec<HashMap<u32, Arc<OptionDef>>>,
    names: Vec<HashMap<String, Arc<OptionDef>>>,
    enumerations: HashMap<String, Enumeration>,
}

impl Registry {
    /// Registry holding only the built-in spaces.
    pub fn standard() -> Result<Registry, DhcpError> {
        RegistryBuilder::standard().build()
    }

    pub fn dhcp(&self) -> &Universe {
        &self.universes[DHCP_UNIVERSE.0]
    }

    pub fn universe(&self, id: UniverseId) -> Option<&Universe> {
        self.universes.get(id.0)
    }

    pub fn universes(&self) -> impl Iterator<Item = &Universe> {
        self.universes.iter()
    }

    pub fn lookup_universe(&self, name: &str) -> Option<&Universe> {
        self.universe_names.get(name).map(|id| &self.universes[id.0])
    }

    pub fn lookup_option(&self, universe: UniverseId, code: u32) -> Option<Arc<OptionDef>> {
        self.codes.get(universe.0)?.get(&code).cloned()
    }

    pub fn lookup_option_by_name(&self, universe: UniverseId, name: &str) -> Option<Arc<OptionDef>> {
        self.names.get(universe.0)?.get(name).cloned()
    }

    /// Definition for a code nobody registered.  It is not remembered.
    pub fn unknown_option(&self, universe: UniverseId, code: u32) -> Arc<OptionDef> {
        Arc::new(OptionDef {
            code,
            name: format!("unknown-{}", code),
            universe,
            format: Format::parse("X"),
            min_length: MinLength::Bounded(0),
            text_like: false,
            encapsulation_offset: None,
        })
    }

    /// Definition of `code`, or a fresh unknown one.
    pub fn option_or_unknown(&self, universe: UniverseId, code: u32) -> Arc<OptionDef> {
        self.lookup_option(universe, code)
            .unwrap_or_else(|| self.unknown_option(universe, code))
    }

    pub fn enumeration_width(&self, name: &str) -> Option<usize> {
        self.enumerations.get(name).map(|e| e.width)
    }

    /// Spaces carried by an option of `parent`.
    pub fn encapsulated_by(&self, parent: UniverseId) -> impl Iterator<Item = &Universe> {
        self.universes.iter()
            .filter(move |u| matches!(u.enc_opt, Some((p, _)) if p == parent))
    }

    /// Space an option's value encapsulates.  "E." refers to the vendor
    /// space given by `vendor_override`.
    pub fn find_encapsulation_universe(&self, option: &OptionDef,
                                       vendor_override: Option<&str>) -> Option<&Universe> {
        let name = match option.format.encapsulation()? {
            Some(name) => name,
            None => vendor_override?,
        };
        match self.lookup_universe(name) {
            Some(universe) => Some(universe),
            None => {
                error!("option {} refers to unknown option space {}", option.name, name);
                None
            }
        }
    }
}

impl Registry {
    /// Spaces emitted while encoding `id`: child spaces and the spaces
    /// named by its options' formats.
    fn nested_spaces(&self, id: UniverseId) -> Vec<UniverseId> {
        let mut nested: Vec<UniverseId> = self.encapsulated_by(id).map(|u| u.id).collect();
        for option in self.codes[id.0].values() {
            if let Some(Some(name)) = option.format.encapsulation() {
                if let Some(sub) = self.universe_names.get(name) {
                    nested.push(*sub);
                }
            }
        }
        nested
    }

    /// No option space may end up nested inside itself.
    fn check_encapsulation_cycles(&self) -> Result<(), DhcpError> {
        // 0: not seen, 1: on the current path, 2: done.
        let mut state = vec![0u8; self.universes.len()];

        for start in 0..self.universes.len() {
            if state[start] != 0 {
                continue;
            }
            state[start] = 1;
            let mut stack = vec![(UniverseId(start), self.nested_spaces(UniverseId(start)))];

            while let Some((id, children)) = stack.last_mut() {
                let id = *id;
                match children.pop() {
                    Some(child) => match state[child.0] {
                        0 => {
                            state[child.0] = 1;
                            let nested = self.nested_spaces(child);
                            stack.push((child, nested));
                        }
                        1 => {
                            return Err(DhcpError::ConfigError(format!(
                                "option space {} is nested inside itself through {}",
                                self.universes[child.0].name, self.universes[id.0].name)));
                        }
                        _ => {}
                    },
                    None => {
                        state[id.0] = 2;
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Install the process-wide registry.  Only the first call succeeds.
pub fn initialize_registry(registry: Registry) -> Result<&'static Registry, DhcpError> {
    REGISTRY.set(registry)
        .map_err(|_| DhcpError::RegistryError("already initialized".to_string()))?;
    self::registry()
}

/// The process-wide registry.
pub fn registry() -> Result<&'static Registry, DhcpError> {
    REGISTRY.get()
        .ok_or_else(|| DhcpError::RegistryError("not initialized".to_string()))
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;
    use crate::DhcpOptionCode;

    #[test]
    pub fn test_standard() {
        match Registry::standard() {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(registry) => {
                let dhcp = registry.dhcp();
                assert_eq!(dhcp.name, "dhcp");
                assert_eq!(dhcp.pad, Some(0));
                assert_eq!(dhcp.end, 255);
                assert!(dhcp.concat_duplicates);

                let option = registry.lookup_option(DHCP_UNIVERSE, 12).unwrap();
                assert_eq!(option.name, "host-name");
                assert!(option.is_text_like());
                assert_eq!(option.min_length(), MinLength::Bounded(0));

                let option = registry.lookup_option_by_name(DHCP_UNIVERSE, "routers").unwrap();
                assert_eq!(option.code, DhcpOptionCode::Router.code());
                assert_eq!(option.min_length(), MinLength::Bounded(4));

                let isc = registry.lookup_universe("isc").unwrap();
                assert_eq!(isc.tag_size, 2);
                assert_eq!(isc.length_size, 2);
                let vendor = registry.lookup_universe("vendor").unwrap();
                assert_eq!(isc.enc_opt, Some((vendor.id, 2495)));

                let agent = registry.lookup_universe("agent").unwrap();
                assert_eq!(agent.enc_opt, Some((DHCP_UNIVERSE, 82)));
                assert_eq!(agent.pad, None);
            }
        }
    }

    #[test]
    pub fn test_encapsulation() {
        let registry = Registry::standard().unwrap();

        let agent = registry.lookup_option(DHCP_UNIVERSE, 82).unwrap();
        let universe = registry.find_encapsulation_universe(&agent, None).unwrap();
        assert_eq!(universe.name, "agent");

        let vendor = registry.lookup_option(DHCP_UNIVERSE, 43).unwrap();
        assert!(registry.find_encapsulation_universe(&vendor, None).is_none());
        let universe = registry.find_encapsulation_universe(&vendor, Some("isc")).unwrap();
        assert_eq!(universe.name, "isc");

        let names: Vec<&str> = registry.encapsulated_by(DHCP_UNIVERSE).map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["agent", "nwip", "fqdn", "vendor-class", "vendor"]);
    }

    #[test]
    pub fn test_unknown_option() {
        let registry = Registry::standard().unwrap();

        assert!(registry.lookup_option(DHCP_UNIVERSE, 250).is_none());
        let option = registry.option_or_unknown(DHCP_UNIVERSE, 250);
        assert_eq!(option.name, "unknown-250");
        assert_eq!(option.format.as_str(), "X");
        assert!(registry.lookup_option(DHCP_UNIVERSE, 250).is_none());
    }

    #[test]
    pub fn test_build_errors() {
        let res = RegistryBuilder::new().space(SpaceSpec::new("site", 3, 1)).build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        let res = RegistryBuilder::new().space(SpaceSpec::new("site", 1, 1)).build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        let res = RegistryBuilder::standard().space(SpaceSpec::new("site", 1, 3)).build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        let res = RegistryBuilder::standard().option("nowhere", "foo", 1, "B").build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        let res = RegistryBuilder::standard().option("dhcp", "too-big", 256, "B").build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        let res = RegistryBuilder::standard().space(SpaceSpec::new("agent", 1, 1)).build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));
    }

    #[test]
    pub fn test_site_space() {
        let registry = RegistryBuilder::standard()
            .space(SpaceSpec::new("site", 1, 1))
            .enumeration(Enumeration {
                name: "colors".to_string(),
                width: 2,
                values: vec![("red".to_string(), 1), ("blue".to_string(), 2)],
            })
            .option("site", "favorite-color", 224, "Ncolors.")
            .option("dhcp", "host-name", 12, "X")
            .build()
            .unwrap();

        let site = registry.lookup_universe("site").unwrap();
        let option = registry.lookup_option(site.id, 224).unwrap();
        assert_eq!(option.min_length(), MinLength::Bounded(2));
        assert_eq!(registry.enumeration_width("colors"), Some(2));

        let option = registry.lookup_option(DHCP_UNIVERSE, 12).unwrap();
        assert!(!option.is_text_like());
    }

    #[test]
    pub fn test_initialize_registry() {
        match initialize_registry(Registry::standard().unwrap()) {
            Err(e) => assert!(false, "Error: {:?}", e),
            Ok(reg) => {
                assert_eq!(reg.dhcp().name, "dhcp");
                assert!(registry().is_ok());
            }
        }

        match initialize_registry(Registry::standard().unwrap()) {
            Ok(_) => assert!(false, "second initialization must fail"),
            Err(e) => assert!(matches!(e, DhcpError::RegistryError(_))),
        }
    }

    #[test]
    pub fn test_encapsulation_cycles() {
        let mut a = SpaceSpec::new("a", 1, 1);
        a.parent = Some(("b".to_string(), 1));
        let mut b = SpaceSpec::new("b", 1, 1);
        b.parent = Some(("a".to_string(), 1));
        let res = RegistryBuilder::standard()
            .space(a)
            .space(b)
            .option("a", "to-b", 1, "Eb.")
            .option("b", "to-a", 1, "Ea.")
            .option("dhcp", "to-a", 200, "Ea.")
            .build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        // A format naming its own space.
        let res = RegistryBuilder::standard()
            .space(SpaceSpec::new("site", 1, 1))
            .option("site", "loop", 224, "eBEsite.")
            .build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        // Formats alone can close the loop.
        let res = RegistryBuilder::standard()
            .space(SpaceSpec::new("a", 1, 1))
            .space(SpaceSpec::new("b", 1, 1))
            .option("a", "to-b", 1, "Eb.")
            .option("b", "to-a", 1, "Ea.")
            .build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));

        // Two paths into the same space are fine.
        let mut c = SpaceSpec::new("c", 1, 1);
        c.parent = Some(("dhcp".to_string(), 200));
        let res = RegistryBuilder::standard()
            .space(c)
            .option("dhcp", "to-c", 200, "Ec.")
            .option("vendor", "also-c", 7, "Ec.")
            .build();
        assert!(res.is_ok());
    }

    #[test]
    pub fn test_enumeration_width() {
        let res = RegistryBuilder::standard()
            .enumeration(Enumeration {
                name: "colors".to_string(),
                width: 1,
                values: vec![("red".to_string(), 1), ("ultraviolet".to_string(), 256)],
            })
            .build();
        assert!(matches!(res, Err(DhcpError::ConfigError(_))));
    }
}
