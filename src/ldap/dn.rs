//! Distinguished names.

use std::{fmt, str};
use thiserror::Error;


//------------ Dn ------------------------------------------------------------

/// A distinguished name.
///
/// The name is parsed from its string representation as described in
/// [RFC 4514]: a sequence of relative distinguished names separated by
/// commas, each of which consists of one or more attribute type and value
/// pairs separated by plus signs. Special characters in values can be
/// escaped with a backslash, either directly or as two hex digits.
///
/// The original string is kept for encoding, so a name is always encoded
/// exactly as it was received.
///
/// [RFC 4514]: https://tools.ietf.org/html/rfc4514
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Dn {
    /// The string representation.
    raw: String,

    /// The relative distinguished names, leftmost first.
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parses a distinguished name from its string representation.
    pub fn new(raw: String) -> Result<Self, DnError> {
        let rdns = Parser::new(&raw).parse()?;
        Ok(Dn { raw, rdns })
    }

    /// Returns the empty name.
    ///
    /// This is the name of the root DSE.
    pub fn root() -> Self {
        Dn::default()
    }

    /// Returns whether this is the empty name.
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the relative distinguished names, leftmost first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Returns the value of the first attribute of the given type.
    ///
    /// Attribute types are compared ignoring ASCII case.
    pub fn get(&self, attr_type: &str) -> Option<&str> {
        self.rdns.iter().flat_map(Rdn::iter).find(|ava| {
            ava.attr_type.eq_ignore_ascii_case(attr_type)
        }).map(|ava| ava.value.as_str())
    }
}

impl str::FromStr for Dn {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::new(s.into())
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.raw)
    }
}


//------------ Rdn -----------------------------------------------------------

/// A relative distinguished name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rdn(Vec<Ava>);

impl Rdn {
    /// Returns an iterator over the attribute type and value pairs.
    pub fn iter(&self) -> impl Iterator<Item = &Ava> {
        self.0.iter()
    }

    /// Returns the number of pairs.
    ///
    /// This is always at least one.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the RDN is empty, which it never is.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}


//------------ Ava -----------------------------------------------------------

/// An attribute type and value pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ava {
    /// The attribute type.
    pub attr_type: String,

    /// The unescaped attribute value.
    pub value: String,
}


//------------ Parser --------------------------------------------------------

/// The parser for the string representation.
struct Parser<'a> {
    chars: std::iter::Peekable<str::CharIndices<'a>>,
    len: usize,
}

/// What ended a value.
enum End {
    Rdn,
    Ava,
    Name,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Parser { chars: s.char_indices().peekable(), len: s.len() }
    }

    fn parse(mut self) -> Result<Vec<Rdn>, DnError> {
        let mut rdns = Vec::new();
        self.skip_spaces();
        if self.chars.peek().is_none() {
            return Ok(rdns)
        }
        let mut avas = Vec::new();
        loop {
            let attr_type = self.attr_type()?;
            let (value, end) = self.value()?;
            avas.push(Ava { attr_type, value });
            match end {
                End::Ava => { }
                End::Rdn => rdns.push(Rdn(std::mem::take(&mut avas))),
                End::Name => {
                    rdns.push(Rdn(avas));
                    return Ok(rdns)
                }
            }
        }
    }

    fn skip_spaces(&mut self) {
        while self.chars.next_if(|&(_, ch)| ch == ' ').is_some() { }
    }

    fn attr_type(&mut self) -> Result<String, DnError> {
        self.skip_spaces();
        let mut res = String::new();
        let start = self.chars.peek().map_or(self.len, |&(pos, _)| pos);
        loop {
            match self.chars.next() {
                None => return Err(DnError::MissingEquals { pos: start }),
                Some((_, '=')) => break,
                Some((pos, ch @ (',' | ';' | '+' | '\\' | '"'))) => {
                    return Err(DnError::UnexpectedChar { pos, ch })
                }
                Some((_, ch)) => res.push(ch),
            }
        }
        let trimmed = res.trim_end();
        if trimmed.is_empty() {
            return Err(DnError::EmptyType { pos: start })
        }
        Ok(trimmed.into())
    }

    fn value(&mut self) -> Result<(String, End), DnError> {
        self.skip_spaces();
        let mut res = Vec::new();
        // Unescaped trailing spaces aren’t part of the value.
        let mut trailing = 0;
        let end = loop {
            match self.chars.next() {
                None => break End::Name,
                Some((_, ',' | ';')) => break End::Rdn,
                Some((_, '+')) => break End::Ava,
                Some((pos, '\\')) => {
                    res.push(self.escaped(pos)?);
                    trailing = 0;
                }
                Some((_, ' ')) => {
                    res.push(b' ');
                    trailing += 1;
                }
                Some((_, ch)) => {
                    let mut buf = [0u8; 4];
                    res.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    trailing = 0;
                }
            }
        };
        res.truncate(res.len() - trailing);
        let value = String::from_utf8(res).map_err(|_| DnError::InvalidUtf8)?;
        Ok((value, end))
    }

    /// Parses an escape sequence after the backslash at `pos`.
    fn escaped(&mut self, pos: usize) -> Result<u8, DnError> {
        match self.chars.next() {
            Some((_, ch @ (
                ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' | '#' | ' '
            ))) => Ok(ch as u8),
            Some((_, high)) if high.is_ascii_hexdigit() => {
                match self.chars.next() {
                    Some((_, low)) if low.is_ascii_hexdigit() => {
                        Ok((hex(high) << 4) | hex(low))
                    }
                    _ => Err(DnError::InvalidEscape { pos })
                }
            }
            _ => Err(DnError::InvalidEscape { pos })
        }
    }
}

/// Returns the value of an ASCII hex digit.
fn hex(ch: char) -> u8 {
    ch.to_digit(16).unwrap_or(0) as u8
}


//------------ DnError -------------------------------------------------------

/// A string is not a valid distinguished name.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum DnError {
    #[error("missing '=' after attribute type at {pos}")]
    MissingEquals { pos: usize },

    #[error("empty attribute type at {pos}")]
    EmptyType { pos: usize },

    #[error("unexpected '{ch}' in attribute type at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("invalid escape sequence at {pos}")]
    InvalidEscape { pos: usize },

    #[error("attribute value is not valid UTF-8")]
    InvalidUtf8,
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn avas(dn: &Dn) -> Vec<Vec<(&str, &str)>> {
        dn.rdns().iter().map(|rdn| {
            rdn.iter().map(|ava| {
                (ava.attr_type.as_str(), ava.value.as_str())
            }).collect()
        }).collect()
    }

    #[test]
    fn empty() {
        let dn: Dn = "".parse().unwrap();
        assert!(dn.is_empty());
        assert_eq!(dn, Dn::root());
        assert!("  ".parse::<Dn>().unwrap().is_empty());
    }

    #[test]
    fn simple() {
        let dn: Dn = "uid=admin, ou=system".parse().unwrap();
        assert_eq!(
            avas(&dn),
            vec![vec![("uid", "admin")], vec![("ou", "system")]]
        );
        assert_eq!(dn.get("OU"), Some("system"));
        assert_eq!(dn.get("cn"), None);
        assert_eq!(dn.to_string(), "uid=admin, ou=system");
    }

    #[test]
    fn multi_valued() {
        let dn: Dn = "cn=Jo+sn=Doe,dc=example".parse().unwrap();
        assert_eq!(
            avas(&dn),
            vec![vec![("cn", "Jo"), ("sn", "Doe")], vec![("dc", "example")]]
        );
    }

    #[test]
    fn escapes() {
        let dn: Dn = r"cn=Doe\, John,cn=a\2Bb,cn=\c3\a4 ,cn=x\ ".parse().unwrap();
        assert_eq!(
            avas(&dn),
            vec![
                vec![("cn", "Doe, John")],
                vec![("cn", "a+b")],
                vec![("cn", "\u{e4}")],
                vec![("cn", "x ")],
            ]
        );
    }

    #[test]
    fn errors() {
        assert_eq!(
            "uid".parse::<Dn>(), Err(DnError::MissingEquals { pos: 0 })
        );
        assert_eq!("=x".parse::<Dn>(), Err(DnError::EmptyType { pos: 0 }));
        assert_eq!(
            "u,id=x".parse::<Dn>(),
            Err(DnError::UnexpectedChar { pos: 1, ch: ',' })
        );
        assert_eq!(
            r"cn=a\zb".parse::<Dn>(), Err(DnError::InvalidEscape { pos: 4 })
        );
        assert_eq!(
            r"cn=a\".parse::<Dn>(), Err(DnError::InvalidEscape { pos: 4 })
        );
        assert_eq!(r"cn=\ff".parse::<Dn>(), Err(DnError::InvalidUtf8));
        assert_eq!(
            "cn=a,".parse::<Dn>(), Err(DnError::MissingEquals { pos: 5 })
        );
    }
}
