//
// DHCP-RS - Codec
//   Copyright (C) 2024-2025, Toshiaki Takada
//
// Format:
//  Option value type descriptions.  A format string such as "IA" or
//  "Evendor." is parsed once into a sequence of atoms.
//

use std::fmt;

use log::error;

use crate::DhcpError;

/// One element of an option format.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FormatAtom {
    /// 'I': IPv4 address.
    Ipv4,
    /// '6': IPv6 address.
    Ipv6,
    /// 'l': signed 32-bit integer.
    Int32,
    /// 'L': unsigned 32-bit integer.
    Uint32,
    /// 'T': lease time.
    LeaseTime,
    /// 's': signed 16-bit integer.
    Int16,
    /// 'S': unsigned 16-bit integer.
    Uint16,
    /// 'b': signed 8-bit integer.
    Int8,
    /// 'B': unsigned 8-bit integer.
    Uint8,
    /// 'f': flag.
    Flag,
    /// 'F': implicit flag.
    ImplicitFlag,
    /// 't': text.
    Text,
    /// 'd': domain name.
    DomainName,
    /// 'D' or 'Dc': list of domain names, optionally compressed.
    DomainList { compressed: bool },
    /// 'x': hex.
    Hex,
    /// 'X': text or hex.
    TextOrHex,
    /// 'A': array of everything before it.
    ArrayAll,
    /// 'a': array of the preceding atom.
    ArrayLast,
    /// 'o': preceding atom is optional.
    Optional,
    /// 'U': option space name.
    SpaceName,
    /// 'Z': zero length.
    Zero,
    /// 'N<name>.': named enumeration.
    Enumeration(String),
    /// 'E<name>.': encapsulated option space; `None` for "E.", the vendor space.
    Encapsulate(Option<String>),
    /// 'e': there is an 'E' later in the format.
    EncapsulationHint,
    /// Anything the parser did not understand.
    Invalid(char),
}

/// Minimum wire length of a format.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum MinLength {
    Bounded(usize),
    Unbounded,
}

/// How an option carries an encapsulated space.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum EncapsulationMode {
    /// Value is entirely the encapsulated space ('E' first).
    Full,
    /// Fixed fields precede the encapsulated space ('e' first).
    Partial,
}

/// Parsed option format.
#[derive(PartialEq, Eq, Clone)]
pub struct Format {
    text: String,
    atoms: Vec<FormatAtom>,
}

fn parse_name(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut name = String::new();

    for c in chars.by_ref() {
        if c == '.' {
            return Some(name);
        }
        name.push(c);
    }
    None
}

impl Format {
    /// Parse a format string.
    pub fn parse(text: &str) -> Format {
        let mut atoms = Vec::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            let atom = match c {
                'I' => FormatAtom::Ipv4,
                '6' => FormatAtom::Ipv6,
                'l' => FormatAtom::Int32,
                'L' => FormatAtom::Uint32,
                'T' => FormatAtom::LeaseTime,
                's' => FormatAtom::Int16,
                'S' => FormatAtom::Uint16,
                'b' => FormatAtom::Int8,
                'B' => FormatAtom::Uint8,
                'f' => FormatAtom::Flag,
                'F' => FormatAtom::ImplicitFlag,
                't' => FormatAtom::Text,
                'd' => FormatAtom::DomainName,
                'D' => {
                    let compressed = chars.peek() == Some(&'c');
                    if compressed {
                        chars.next();
                    }
                    FormatAtom::DomainList { compressed }
                }
                'x' => FormatAtom::Hex,
                'X' => FormatAtom::TextOrHex,
                'A' => FormatAtom::ArrayAll,
                'a' => FormatAtom::ArrayLast,
                'o' => FormatAtom::Optional,
                'U' => FormatAtom::SpaceName,
                'Z' => FormatAtom::Zero,
                'e' => FormatAtom::EncapsulationHint,
                'N' => match parse_name(&mut chars) {
                    Some(name) => FormatAtom::Enumeration(name),
                    None => FormatAtom::Invalid('N'),
                },
                'E' => match parse_name(&mut chars) {
                    Some(name) if name.is_empty() => FormatAtom::Encapsulate(None),
                    Some(name) => FormatAtom::Encapsulate(Some(name)),
                    None => FormatAtom::Invalid('E'),
                },
                other => FormatAtom::Invalid(other),
            };
            atoms.push(atom);
        }

        Format {
            text: text.to_string(),
            atoms,
        }
    }

    /// Format string as registered.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn atoms(&self) -> &[FormatAtom] {
        &self.atoms
    }

    /// Whether the value is, or ends with, an encapsulated option space.
    pub fn encapsulation_mode(&self) -> Option<EncapsulationMode> {
        match self.atoms.first() {
            Some(FormatAtom::Encapsulate(_)) => Some(EncapsulationMode::Full),
            Some(FormatAtom::EncapsulationHint) => Some(EncapsulationMode::Partial),
            _ => None,
        }
    }

    /// The encapsulated space reference.  It must be the last atom.
    /// `Some(None)` refers to the vendor space chosen at run time.
    pub fn encapsulation(&self) -> Option<Option<&str>> {
        let pos = self.atoms.iter().position(|a| matches!(a, FormatAtom::Encapsulate(_)))?;

        if pos + 1 != self.atoms.len() {
            error!("encapsulation must end the format: {}", self.text);
            return None;
        }
        match &self.atoms[pos] {
            FormatAtom::Encapsulate(name) => Some(name.as_deref()),
            _ => None,
        }
    }

    /// Check for atoms the interpreter cannot handle.  Such formats still
    /// work, with worst case lengths.
    pub fn validate(&self) -> Result<(), DhcpError> {
        if let Some(FormatAtom::Invalid(c)) = self.atoms.iter().find(|a| matches!(a, FormatAtom::Invalid(_))) {
            return Err(DhcpError::InvalidFormat(format!("'{}' in \"{}\"", c, self.text)));
        }
        match self.atoms.iter().position(|a| matches!(a, FormatAtom::Encapsulate(_))) {
            Some(pos) if pos + 1 != self.atoms.len() => {
                Err(DhcpError::InvalidFormat(format!("encapsulation before the end of \"{}\"", self.text)))
            }
            _ => Ok(()),
        }
    }

    /// Zero-length option ('Z' first).
    pub fn is_zero_length(&self) -> bool {
        matches!(self.atoms.first(), Some(FormatAtom::Zero))
    }

    /// Minimum length of the fixed fields before anything variable.
    /// `enum_width` looks up the width of a named enumeration.
    pub fn min_length<F>(&self, enum_width: F) -> MinLength
    where
        F: Fn(&str) -> Option<usize>,
    {
        let mut total: usize = 0;
        let mut last: usize = 0;

        for atom in &self.atoms {
            let width = match atom {
                FormatAtom::Ipv6 => 16,
                FormatAtom::Ipv4
                | FormatAtom::Int32
                | FormatAtom::Uint32
                | FormatAtom::LeaseTime => 4,
                FormatAtom::Int16 | FormatAtom::Uint16 => 2,
                FormatAtom::Int8
                | FormatAtom::Uint8
                | FormatAtom::Flag
                | FormatAtom::ImplicitFlag => 1,
                FormatAtom::Enumeration(name) => match enum_width(name) {
                    Some(width) => width,
                    None => {
                        error!("unknown enumeration {} in format {}", name, self.text);
                        return MinLength::Unbounded;
                    }
                },
                FormatAtom::Optional => {
                    return MinLength::Bounded(total.saturating_sub(last));
                }
                FormatAtom::EncapsulationHint
                | FormatAtom::Encapsulate(_)
                | FormatAtom::DomainName
                | FormatAtom::DomainList { .. }
                | FormatAtom::Text
                | FormatAtom::TextOrHex
                | FormatAtom::Hex
                | FormatAtom::ArrayAll
                | FormatAtom::ArrayLast
                | FormatAtom::Zero => {
                    return MinLength::Bounded(total);
                }
                FormatAtom::Invalid('c') => {
                    error!("'c' atom is illegal except after 'D' atom: {}", self.text);
                    return MinLength::Unbounded;
                }
                FormatAtom::SpaceName | FormatAtom::Invalid(_) => {
                    error!("no safe length for format symbols in {}", self.text);
                    return MinLength::Unbounded;
                }
            };
            total += width;
            last = width;
        }

        MinLength::Bounded(total)
    }

    /// Offset of the encapsulated space inside the value.  Zero for 'E'
    /// formats; for 'e' formats the fixed fields before the 'E' must
    /// all have a known width.
    pub fn encapsulation_offset<F>(&self, enum_width: F) -> Option<usize>
    where
        F: Fn(&str) -> Option<usize>,
    {
        match self.encapsulation_mode()? {
            EncapsulationMode::Full => Some(0),
            EncapsulationMode::Partial => {
                let mut offset = 0;
                for atom in &self.atoms[1..] {
                    offset += match atom {
                        FormatAtom::Encapsulate(_) => return Some(offset),
                        FormatAtom::Ipv6 => 16,
                        FormatAtom::Ipv4
                        | FormatAtom::Int32
                        | FormatAtom::Uint32
                        | FormatAtom::LeaseTime => 4,
                        FormatAtom::Int16 | FormatAtom::Uint16 => 2,
                        FormatAtom::Int8
                        | FormatAtom::Uint8
                        | FormatAtom::Flag
                        | FormatAtom::ImplicitFlag => 1,
                        FormatAtom::Enumeration(name) => enum_width(name)?,
                        _ => return None,
                    };
                }
                None
            }
        }
    }

    /// Whether the value is NUL-terminatable text.
    pub fn is_text_like(&self) -> bool {
        for atom in &self.atoms {
            match atom {
                FormatAtom::DomainName | FormatAtom::Text => return true,
                FormatAtom::ArrayAll
                | FormatAtom::ArrayLast
                | FormatAtom::TextOrHex
                | FormatAtom::Hex
                | FormatAtom::DomainList { .. } => return false,
                FormatAtom::Invalid('c') => {
                    error!("'c' atoms are illegal except after 'D' atoms: {}", self.text);
                }
                _ => {}
            }
        }
        false
    }
}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.text)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

///
/// Unit tests.
///
#[cfg(test)]
mod tests {
    use super::*;

    fn no_enum(_: &str) -> Option<usize> {
        None
    }

    #[test]
    pub fn test_parse() {
        let f = Format::parse("IA");
        assert_eq!(f.atoms(), &[FormatAtom::Ipv4, FormatAtom::ArrayAll]);

        let f = Format::parse("Evendor-class.");
        assert_eq!(f.atoms(), &[FormatAtom::Encapsulate(Some("vendor-class".to_string()))]);
        assert_eq!(f.encapsulation(), Some(Some("vendor-class")));
        assert_eq!(f.encapsulation_mode(), Some(EncapsulationMode::Full));

        let f = Format::parse("E.");
        assert_eq!(f.encapsulation(), Some(None));

        let f = Format::parse("Dc");
        assert_eq!(f.atoms(), &[FormatAtom::DomainList { compressed: true }]);

        let f = Format::parse("Nstatus-codes.to");
        assert_eq!(f.atoms(), &[FormatAtom::Enumeration("status-codes".to_string()),
                                FormatAtom::Text, FormatAtom::Optional]);

        let f = Format::parse("Ebroken");
        assert_eq!(f.atoms(), &[FormatAtom::Invalid('E')]);
        assert_eq!(f.encapsulation(), None);

        let f = Format::parse("eBEsub.");
        assert_eq!(f.encapsulation_mode(), Some(EncapsulationMode::Partial));
        assert_eq!(f.encapsulation(), Some(Some("sub")));
    }

    #[test]
    pub fn test_encapsulation_offset() {
        assert_eq!(Format::parse("Eagent.").encapsulation_offset(no_enum), Some(0));
        assert_eq!(Format::parse("eBSEsub.").encapsulation_offset(no_enum), Some(3));
        assert_eq!(Format::parse("etEsub.").encapsulation_offset(no_enum), None);
        assert_eq!(Format::parse("IA").encapsulation_offset(no_enum), None);
    }

    #[test]
    pub fn test_min_length() {
        assert_eq!(Format::parse("I").min_length(no_enum), MinLength::Bounded(4));
        assert_eq!(Format::parse("IA").min_length(no_enum), MinLength::Bounded(4));
        assert_eq!(Format::parse("BB6Ia").min_length(no_enum), MinLength::Bounded(22));
        assert_eq!(Format::parse("t").min_length(no_enum), MinLength::Bounded(0));
        assert_eq!(Format::parse("fto").min_length(no_enum), MinLength::Bounded(1));
        assert_eq!(Format::parse("SSo").min_length(no_enum), MinLength::Bounded(2));
        assert_eq!(Format::parse("LE.").min_length(no_enum), MinLength::Bounded(4));
        assert_eq!(Format::parse("").min_length(no_enum), MinLength::Bounded(0));
        assert_eq!(Format::parse("c").min_length(no_enum), MinLength::Unbounded);
        assert_eq!(Format::parse("Bq").min_length(no_enum), MinLength::Unbounded);
        assert_eq!(Format::parse("Ncolors.").min_length(no_enum), MinLength::Unbounded);
        assert_eq!(Format::parse("Ncolors.S").min_length(|n| if n == "colors" { Some(2) } else { None }),
                   MinLength::Bounded(4));
    }

    #[test]
    pub fn test_is_text_like() {
        assert!(Format::parse("t").is_text_like());
        assert!(Format::parse("d").is_text_like());
        assert!(Format::parse("fto").is_text_like());
        assert!(Format::parse("ct").is_text_like());
        assert!(!Format::parse("X").is_text_like());
        assert!(!Format::parse("IA").is_text_like());
        assert!(!Format::parse("Dc").is_text_like());
        assert!(!Format::parse("Etext.").is_text_like());
        assert!(!Format::parse("Ntdt.B").is_text_like());
        assert!(!Format::parse("At").is_text_like());
    }

    #[test]
    pub fn test_validate() {
        assert_eq!(Format::parse("IA").validate(), Ok(()));
        assert_eq!(Format::parse("Dc").validate(), Ok(()));
        assert_eq!(Format::parse("eBEsite.").validate(), Ok(()));
        assert!(matches!(Format::parse("Bq").validate(), Err(DhcpError::InvalidFormat(_))));
        assert!(matches!(Format::parse("ct").validate(), Err(DhcpError::InvalidFormat(_))));
        assert!(matches!(Format::parse("Evendor.B").validate(), Err(DhcpError::InvalidFormat(_))));
    }
}
