//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Pack:
//  Place prioritized DHCP options into the options area and, when
//  allowed, the file and sname fields.  Long values are split into
//  several records (RFC 3396).
//

use std::mem;

use log::{trace, warn};

use crate::encapsulate::{option_space_encapsulate, EncodeContext};
use crate::format::EncapsulationMode;
use crate::universe::DHCP_UNIVERSE;
use crate::DhcpOptionCode;

/// Capacities of the regions options may go into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackRegions {
    /// Options area, cookie excluded.
    pub primary: usize,
    /// The file field.
    pub secondary: Option<usize>,
    /// The sname field.
    pub tertiary: Option<usize>,
}

impl PackRegions {
    pub fn primary(capacity: usize) -> Self {
        PackRegions {
            primary: capacity,
            secondary: None,
            tertiary: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PackOutcome {
    pub primary: Vec<u8>,
    /// END terminated and PAD filled to capacity, when used.
    pub secondary: Option<Vec<u8>>,
    pub tertiary: Option<Vec<u8>>,
    /// Option overload value: 1 file, 2 sname.
    pub overload: u8,
    /// Codes that had a value but did not fit.
    pub overflowed: Vec<u32>,
}

struct Region {
    data: Vec<u8>,
    staged: Vec<u8>,
    capacity: usize,
}

impl Region {
    fn new(capacity: usize) -> Region {
        Region {
            data: Vec::with_capacity(capacity),
            staged: Vec::new(),
            capacity,
        }
    }

    fn used(&self) -> usize {
        self.data.len() + self.staged.len()
    }

    fn stage(&mut self, code: u8, chunk: &[u8]) {
        self.staged.push(code);
        self.staged.push(chunk.len() as u8);
        self.staged.extend_from_slice(chunk);
    }

    fn commit(&mut self) {
        let staged = mem::take(&mut self.staged);
        self.data.extend(staged);
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }

    /// Overload region as it goes on the wire, if anything went into it.
    fn finish(mut self) -> Option<Vec<u8>> {
        if self.data.is_empty() {
            return None;
        }
        self.data.push(DhcpOptionCode::End as u8);
        self.data.resize(self.capacity, DhcpOptionCode::Pad as u8);
        Some(self.data)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
enum Slot {
    Primary,
    Secondary,
    Tertiary,
}

struct Regions {
    primary: Region,
    secondary: Option<Region>,
    tertiary: Option<Region>,
}

impl Regions {
    fn region(&mut self, slot: Slot) -> Option<&mut Region> {
        match slot {
            Slot::Primary => Some(&mut self.primary),
            Slot::Secondary => self.secondary.as_mut(),
            Slot::Tertiary => self.tertiary.as_mut(),
        }
    }

    fn overflow_used(&self) -> bool {
        self.secondary.as_ref().is_some_and(|r| r.used() > 0)
            || self.tertiary.as_ref().is_some_and(|r| r.used() > 0)
    }

    fn fits(region: Option<&Region>, len: usize) -> bool {
        region.is_some_and(|r| r.used() + 3 + len < r.capacity)
    }

    fn split_room(region: Option<&Region>) -> Option<usize> {
        let r = region?;
        if r.used() + 4 < r.capacity {
            Some(r.capacity - r.used() - 3)
        } else {
            None
        }
    }

    /// Region and chunk size for the next record.
    fn choose(&self, remaining: usize, last: bool, splitup: &mut bool) -> Option<(Slot, usize)> {
        let primary = &self.primary;

        if !*splitup {
            if (!self.overflow_used() && last && primary.used() + 2 + remaining < primary.capacity)
                || primary.used() + 5 + remaining < primary.capacity {
                return Some((Slot::Primary, remaining));
            }
            if Self::fits(self.secondary.as_ref(), remaining) {
                return Some((Slot::Secondary, remaining));
            }
            if Self::fits(self.tertiary.as_ref(), remaining) {
                return Some((Slot::Tertiary, remaining));
            }
        }

        *splitup = true;
        if primary.used() + 6 < primary.capacity {
            return Some((Slot::Primary, primary.capacity - primary.used() - 5));
        }
        if let Some(room) = Self::split_room(self.secondary.as_ref()) {
            return Some((Slot::Secondary, room));
        }
        if let Some(room) = Self::split_room(self.tertiary.as_ref()) {
            return Some((Slot::Tertiary, room));
        }
        None
    }

    /// Stage every record of one option.  False when it does not fit.
    fn place(&mut self, code: u8, value: &[u8], last: bool) -> bool {
        let mut splitup = value.len() > 255;
        let mut ix = 0;

        loop {
            let remaining = value.len() - ix;
            let Some((slot, room)) = self.choose(remaining, last, &mut splitup) else {
                return false;
            };
            let Some(region) = self.region(slot) else {
                return false;
            };

            let incr = room.min(remaining).min(255);
            trace!("option {}: {} bytes into {:?}", code, incr, slot);
            region.stage(code, &value[ix..ix + incr]);
            ix += incr;

            if ix >= value.len() {
                return true;
            }
        }
    }

    fn for_each(&mut self, f: fn(&mut Region)) {
        f(&mut self.primary);
        if let Some(r) = self.secondary.as_mut() {
            f(r);
        }
        if let Some(r) = self.tertiary.as_mut() {
            f(r);
        }
    }
}

/// De-duplicate keeping first occurrences, and put subnet-mask ahead of
/// routers.
pub fn normalize_priority(priority: &[u32]) -> Vec<u32> {
    let mut list: Vec<u32> = Vec::with_capacity(priority.len());
    for code in priority {
        if !list.contains(code) {
            list.push(*code);
        }
    }

    let routers = list.iter().position(|c| *c == DhcpOptionCode::Router.code());
    let mask = list.iter().position(|c| *c == DhcpOptionCode::SubnetMask.code());
    if let (Some(r), Some(m)) = (routers, mask) {
        if r < m {
            list.swap(r, m);
        }
    }
    list
}

/// Wire value of `code`: the configured value followed by any
/// encapsulation, with a NUL for text when `terminate` is set.
fn option_value(ctx: &EncodeContext<'_>, code: u32, terminate: bool) -> Option<Vec<u8>> {
    let cfg = ctx.cfg;
    let universe = if code >= cfg.site_code_min() {
        cfg.site_universe()
    } else {
        DHCP_UNIVERSE
    };

    let entry = cfg.lookup(universe, code);
    let option = match entry {
        Some(entry) => Some(entry.option.clone()),
        None => ctx.registry.lookup_option(universe, code),
    };

    let mut encapsulation = None;
    if let Some(option) = &option {
        let mode = option.format.encapsulation_mode();
        if (entry.is_none() && mode == Some(EncapsulationMode::Full))
            || (entry.is_some() && mode == Some(EncapsulationMode::Partial)) {
            let space = match option.format.encapsulation() {
                Some(Some(name)) => Some(name),
                Some(None) => ctx.vendor_space,
                None => None,
            };
            if let Some(space) = space {
                match option_space_encapsulate(ctx, space) {
                    Ok(value) => encapsulation = value,
                    Err(e) => warn!("option {}: {}", option.name, e),
                }
            }
        }
    }

    if entry.is_none() && encapsulation.is_none() {
        return None;
    }

    let mut value = Vec::new();
    if let Some(entry) = entry {
        match ctx.evaluate(entry) {
            Some(v) if !v.is_empty() || entry.option.format.is_zero_length() => value.extend_from_slice(&v),
            _ => return None,
        }
    }
    if let Some(tail) = encapsulation {
        value.extend(tail);
    }
    if terminate && option.is_some_and(|o| o.is_text_like()) {
        value.push(0);
    }
    Some(value)
}

/// Pack the options named in `priority` into `regions`.  Options that do
/// not fit are left out and reported in `overflowed`.
pub fn store_options(ctx: &EncodeContext<'_>, regions: PackRegions, priority: &[u32],
                     terminate: bool) -> PackOutcome {
    let list = normalize_priority(priority);
    let mut r = Regions {
        primary: Region::new(regions.primary),
        secondary: regions.secondary.map(Region::new),
        tertiary: regions.tertiary.map(Region::new),
    };
    let mut overflowed = Vec::new();

    for (i, code) in list.iter().enumerate() {
        let last = i + 1 == list.len();
        let Some(value) = option_value(ctx, *code, terminate) else {
            continue;
        };

        let placed = match u8::try_from(*code) {
            Ok(c) => r.place(c, &value, last),
            Err(_) => false,
        };
        if placed {
            r.for_each(Region::commit);
        } else {
            r.for_each(Region::rollback);
            warn!("option {}: {} bytes do not fit", code, value.len());
            overflowed.push(*code);
        }
    }

    let secondary = r.secondary.and_then(Region::finish);
    let tertiary = r.tertiary.and_then(Region::finish);
    let mut overload = 0;
    if secondary.is_some() {
        overload |= 1;
    }
    if tertiary.is_some() {
        overload |= 2;
    }

    PackOutcome {
        primary: r.primary.data,
        secondary,
        tertiary,
        overload,
        overflowed,
    }
}
