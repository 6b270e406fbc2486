//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Store:
//  Per-message collection of option values, grouped by option space.
//

use std::collections::BTreeMap;
use std::fmt;
use std::slice;
use std::collections::btree_map;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::registry::{OptionDef, Registry};
use crate::universe::{Storage, Universe, UniverseId, DHCP_UNIVERSE};
use crate::{DhcpError, DhcpMessageType, DhcpOptionCode};

/// Option value bytes.  Decoded text values carry a NUL right after the
/// visible bytes so they can be handed out as C strings.
#[derive(Clone)]
pub struct OptionValue {
    data: Bytes,
    len: usize,
    terminated: bool,
    had_nulls: bool,
}

impl OptionValue {
    pub fn new(data: Bytes) -> OptionValue {
        let len = data.len();
        OptionValue {
            data,
            len,
            terminated: false,
            had_nulls: false,
        }
    }

    /// Copy of `src` followed by a NUL that is not part of the value.
    pub fn terminated(src: &[u8]) -> OptionValue {
        let mut data = BytesMut::with_capacity(src.len() + 1);
        data.extend_from_slice(src);
        data.extend_from_slice(&[0]);
        OptionValue {
            data: data.freeze(),
            len: src.len(),
            terminated: true,
            had_nulls: false,
        }
    }

    /// Drop trailing NULs, never below `min` bytes.
    pub fn strip_nulls(mut self, min: usize) -> OptionValue {
        while self.len > min && self.data[self.len - 1] == 0 {
            self.len -= 1;
            self.had_nulls = true;
        }
        self
    }

    /// New value made of this one followed by `tail`.
    pub fn concat(&self, tail: &[u8]) -> OptionValue {
        let mut data = BytesMut::with_capacity(self.len + tail.len());
        data.extend_from_slice(self.as_bytes());
        data.extend_from_slice(tail);
        OptionValue {
            had_nulls: self.had_nulls,
            ..OptionValue::new(data.freeze())
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn bytes(&self) -> Bytes {
        self.data.slice(..self.len)
    }

    /// Value including its terminating NUL.
    pub fn as_c_bytes(&self) -> Option<&[u8]> {
        if self.terminated {
            Some(&self.data[..self.len + 1])
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Trailing NULs were removed on decode.
    pub fn had_nulls(&self) -> bool {
        self.had_nulls
    }
}

impl From<&[u8]> for OptionValue {
    fn from(src: &[u8]) -> OptionValue {
        OptionValue::new(Bytes::copy_from_slice(src))
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(src: Vec<u8>) -> OptionValue {
        OptionValue::new(Bytes::from(src))
    }
}

impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: Vec<String> = self.as_bytes().iter().map(|b| format!("{:02x}", b)).collect();
        write!(f, "[{}]", hex.join(" "))
    }
}

/// Value produced at encode time, possibly from the inbound message.
pub trait ComputeValue: Send + Sync + fmt::Debug {
    fn evaluate(&self, inbound: Option<&OptionStore>) -> Option<Vec<u8>>;
}

/// Where an option's value comes from.
#[derive(Clone, Debug)]
pub enum OptionSource {
    Data(OptionValue),
    Computed(Arc<dyn ComputeValue>),
}

impl OptionSource {
    pub fn evaluate(&self, inbound: Option<&OptionStore>) -> Option<Bytes> {
        match self {
            OptionSource::Data(value) => Some(value.bytes()),
            OptionSource::Computed(expr) => expr.evaluate(inbound).map(Bytes::from),
        }
    }
}

impl From<&[u8]> for OptionSource {
    fn from(src: &[u8]) -> OptionSource {
        OptionSource::Data(OptionValue::from(src))
    }
}

impl PartialEq for OptionSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OptionSource::Data(a), OptionSource::Data(b)) => a == b,
            (OptionSource::Computed(a), OptionSource::Computed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Sources evaluated in order and joined.
#[derive(Debug)]
struct Concat(Vec<OptionSource>);

impl ComputeValue for Concat {
    fn evaluate(&self, inbound: Option<&OptionStore>) -> Option<Vec<u8>> {
        let mut value = Vec::new();
        for source in &self.0 {
            value.extend_from_slice(&source.evaluate(inbound)?);
        }
        Some(value)
    }
}

fn join(head: OptionSource, tail: OptionSource) -> OptionSource {
    match (head, tail) {
        (OptionSource::Data(a), OptionSource::Data(b)) => OptionSource::Data(a.concat(b.as_bytes())),
        (a, b) => OptionSource::Computed(Arc::new(Concat(vec![a, b]))),
    }
}

/// One instance of an option.  Further instances of the same code hang
/// off `next`.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionEntry {
    pub option: Arc<OptionDef>,
    pub source: OptionSource,
    pub next: Option<Box<OptionEntry>>,
}

impl OptionEntry {
    pub fn new(option: Arc<OptionDef>, source: OptionSource) -> OptionEntry {
        OptionEntry {
            option,
            source,
            next: None,
        }
    }

    pub fn code(&self) -> u32 {
        self.option.code
    }

    /// Literal value, if the entry has one.
    pub fn value(&self) -> Option<&OptionValue> {
        match &self.source {
            OptionSource::Data(value) => Some(value),
            OptionSource::Computed(_) => None,
        }
    }

    /// This entry and every later instance.
    pub fn chain(&self) -> Chain<'_> {
        Chain { next: Some(self) }
    }

    fn push_back(&mut self, entry: OptionEntry) {
        match &mut self.next {
            Some(next) => next.push_back(entry),
            None => self.next = Some(Box::new(entry)),
        }
    }
}

pub struct Chain<'a> {
    next: Option<&'a OptionEntry>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a OptionEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.next?;
        self.next = entry.next.as_deref();
        Some(entry)
    }
}

/// How `set_option` combines a value with an existing one.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SetOp {
    /// Only set when absent.
    Default,
    /// Replace.
    Supersede,
    /// Existing value followed by the new one.
    Append,
    /// New value followed by the existing one.
    Prepend,
}

#[derive(Clone, Debug, PartialEq)]
enum SpaceStore {
    Hashed(BTreeMap<u32, OptionEntry>),
    Linked(Vec<OptionEntry>),
}

impl SpaceStore {
    fn new(storage: Storage) -> SpaceStore {
        match storage {
            Storage::Hashed => SpaceStore::Hashed(BTreeMap::new()),
            Storage::Linked => SpaceStore::Linked(Vec::new()),
        }
    }

    fn get(&self, code: u32) -> Option<&OptionEntry> {
        match self {
            SpaceStore::Hashed(map) => map.get(&code),
            SpaceStore::Linked(list) => list.iter().find(|e| e.code() == code),
        }
    }

    fn get_mut(&mut self, code: u32) -> Option<&mut OptionEntry> {
        match self {
            SpaceStore::Hashed(map) => map.get_mut(&code),
            SpaceStore::Linked(list) => list.iter_mut().find(|e| e.code() == code),
        }
    }

    fn put(&mut self, entry: OptionEntry) {
        match self {
            SpaceStore::Hashed(map) => {
                map.insert(entry.code(), entry);
            }
            SpaceStore::Linked(list) => match list.iter_mut().find(|e| e.code() == entry.code()) {
                Some(old) => *old = entry,
                None => list.push(entry),
            },
        }
    }

    fn remove(&mut self, code: u32) -> Option<OptionEntry> {
        match self {
            SpaceStore::Hashed(map) => map.remove(&code),
            SpaceStore::Linked(list) => {
                let pos = list.iter().position(|e| e.code() == code)?;
                Some(list.remove(pos))
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            SpaceStore::Hashed(map) => map.len(),
            SpaceStore::Linked(list) => list.len(),
        }
    }
}

/// Head entries of one space.
pub enum Heads<'a> {
    Hashed(btree_map::Values<'a, u32, OptionEntry>),
    Linked(slice::Iter<'a, OptionEntry>),
    Empty,
}

impl<'a> Iterator for Heads<'a> {
    type Item = &'a OptionEntry;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Heads::Hashed(iter) => iter.next(),
            Heads::Linked(iter) => iter.next(),
            Heads::Empty => None,
        }
    }
}

/// Option store.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionStore {
    spaces: BTreeMap<UniverseId, SpaceStore>,
    site_universe: UniverseId,
    site_code_min: u32,
}

impl Default for OptionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionStore {
    pub fn new() -> OptionStore {
        OptionStore {
            spaces: BTreeMap::new(),
            site_universe: DHCP_UNIVERSE,
            site_code_min: 0,
        }
    }

    /// Codes at or above `code_min` are looked up in `universe` when packing.
    pub fn set_site_space(&mut self, universe: UniverseId, code_min: u32) {
        self.site_universe = universe;
        self.site_code_min = code_min;
    }

    pub fn site_universe(&self) -> UniverseId {
        self.site_universe
    }

    pub fn site_code_min(&self) -> u32 {
        self.site_code_min
    }

    fn space_mut(&mut self, universe: &Universe) -> &mut SpaceStore {
        self.spaces.entry(universe.id)
            .or_insert_with(|| SpaceStore::new(universe.storage()))
    }

    /// Store `entry` as the only instance of its code.
    pub fn save(&mut self, universe: &Universe, entry: OptionEntry) {
        self.space_mut(universe).put(entry);
    }

    /// Add `entry` after any existing instances of its code.
    pub fn append(&mut self, universe: &Universe, entry: OptionEntry) {
        let space = self.space_mut(universe);
        match space.get_mut(entry.code()) {
            Some(head) => head.push_back(entry),
            None => space.put(entry),
        }
    }

    pub fn lookup(&self, universe: UniverseId, code: u32) -> Option<&OptionEntry> {
        self.spaces.get(&universe)?.get(code)
    }

    pub fn lookup_mut(&mut self, universe: UniverseId, code: u32) -> Option<&mut OptionEntry> {
        self.spaces.get_mut(&universe)?.get_mut(code)
    }

    /// Literal value of the first instance of `code`.
    pub fn value(&self, universe: UniverseId, code: u32) -> Option<&OptionValue> {
        self.lookup(universe, code)?.value()
    }

    pub fn delete(&mut self, universe: UniverseId, code: u32) -> Option<OptionEntry> {
        let space = self.spaces.get_mut(&universe)?;
        let entry = space.remove(code);
        if space.len() == 0 {
            self.spaces.remove(&universe);
        }
        entry
    }

    /// First instance of every code, in code order for hashed spaces and
    /// insertion order for linked ones.
    pub fn iter(&self, universe: UniverseId) -> Heads<'_> {
        match self.spaces.get(&universe) {
            Some(SpaceStore::Hashed(map)) => Heads::Hashed(map.values()),
            Some(SpaceStore::Linked(list)) => Heads::Linked(list.iter()),
            None => Heads::Empty,
        }
    }

    /// Spaces holding at least one entry.
    pub fn universes(&self) -> impl Iterator<Item = UniverseId> + '_ {
        self.spaces.iter().filter(|(_, s)| s.len() > 0).map(|(id, _)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.spaces.values().all(|s| s.len() == 0)
    }

    /// Set a DHCP option from raw bytes.
    pub fn add_option(&mut self, registry: &Registry, code: u32, data: &[u8]) -> Result<(), DhcpError> {
        self.set_option(registry, DHCP_UNIVERSE, code, OptionSource::from(data), SetOp::Supersede)
    }

    pub fn set_option(&mut self, registry: &Registry, universe: UniverseId, code: u32,
                      source: OptionSource, op: SetOp) -> Result<(), DhcpError> {
        let space = registry.universe(universe)
            .ok_or_else(|| DhcpError::UnknownOption(format!("no option space {:?}", universe)))?;
        let option = registry.lookup_option(universe, code)
            .ok_or_else(|| DhcpError::UnknownOption(format!("{}.{}", space.name, code)))?;

        let existing = self.lookup(universe, code).map(|e| e.source.clone());
        let source = match (op, existing) {
            (SetOp::Default, Some(_)) => return Ok(()),
            (SetOp::Append, Some(old)) => join(old, source),
            (SetOp::Prepend, Some(old)) => join(source, old),
            _ => source,
        };
        self.save(space, OptionEntry::new(option, source));
        Ok(())
    }

    /// Trailing NULs were stripped from the value of `code` on decode.
    pub fn had_nulls(&self, universe: UniverseId, code: u32) -> bool {
        self.value(universe, code).is_some_and(|v| v.had_nulls())
    }

    /// DHCP message type option, if present and valid.
    pub fn message_type(&self) -> Option<DhcpMessageType> {
        let value = self.value(DHCP_UNIVERSE, DhcpOptionCode::DHCPMsgType.code())?;
        let t = *value.as_bytes().first()?;
        DhcpMessageType::try_from(t).ok()
    }
}
