//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag (the bytes between the element
//! name and `>` / `/>`).

use super::entities::{decode_text, decode_text_strict};
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: Cow<'a, [u8]>,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, [u8]>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a [u8], value: Cow<'a, [u8]>) -> Self {
        Attribute {
            name: Cow::Borrowed(name),
            value,
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name.as_ref()).ok()
    }

    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(self.value.as_ref()).ok()
    }

    /// Local part of the name (after the colon)
    pub fn local_name(&self) -> &[u8] {
        let name = self.name.as_ref();
        match memchr(b':', name) {
            Some(pos) => &name[pos + 1..],
            None => name,
        }
    }

    /// Namespace declaration this attribute carries, as `(prefix, uri)`.
    /// The default namespace has an empty prefix.
    pub fn namespace_declaration(&self) -> Option<(&[u8], &[u8])> {
        let name = self.name.as_ref();
        if name == b"xmlns" {
            Some((&b""[..], self.value.as_ref()))
        } else {
            name.strip_prefix(b"xmlns:").map(|p| (p, self.value.as_ref()))
        }
    }
}

/// Parse attributes leniently: malformed pieces are skipped
pub fn parse_attributes(input: &[u8]) -> Vec<Attribute<'_>> {
    match parse_attributes_impl(input, false) {
        Ok(attrs) => attrs,
        Err((attrs, _)) => attrs,
    }
}

/// Parse attributes, failing on the first well-formedness violation
pub fn parse_attributes_strict(input: &[u8]) -> Result<Vec<Attribute<'_>>, String> {
    parse_attributes_impl(input, true).map_err(|(_, msg)| msg)
}

type Partial<'a> = (Vec<Attribute<'a>>, String);

fn parse_attributes_impl(input: &[u8], strict: bool) -> Result<Vec<Attribute<'_>>, Partial<'_>> {
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            break;
        }

        if !is_name_start_char(input[pos]) {
            if strict {
                return Err((attrs, "Attribute name must start with letter, underscore, or colon".to_string()));
            }
            pos += 1;
            continue;
        }

        let name_start = pos;
        while pos < input.len() && is_name_char(input[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }

        if pos >= input.len() || input[pos] != b'=' {
            if strict {
                return Err((attrs, format!("Attribute '{}' has no value", String::from_utf8_lossy(name))));
            }
            attrs.push(Attribute::new(name, Cow::Borrowed(b"")));
            continue;
        }
        pos += 1;

        while pos < input.len() && is_whitespace(input[pos]) {
            pos += 1;
        }
        if pos >= input.len() {
            if strict {
                return Err((attrs, "Attribute value missing".to_string()));
            }
            break;
        }

        let quote = input[pos];
        if quote != b'"' && quote != b'\'' {
            if strict {
                return Err((attrs, "Attribute value must be quoted".to_string()));
            }
            let value_start = pos;
            while pos < input.len() && !is_whitespace(input[pos]) {
                pos += 1;
            }
            attrs.push(Attribute::new(name, decode_text(&input[value_start..pos])));
            continue;
        }

        let value_start = pos + 1;
        let value_end = match memchr(quote, &input[value_start..]) {
            Some(rel) => value_start + rel,
            None if strict => return Err((attrs, "Attribute value has mismatched quotes".to_string())),
            None => input.len(),
        };
        let raw = &input[value_start..value_end];
        pos = (value_end + 1).min(input.len());

        if strict {
            if memchr(b'<', raw).is_some() {
                return Err((attrs, "Attribute value cannot contain '<'".to_string()));
            }
            if attrs.iter().any(|a| a.name.as_ref() == name) {
                return Err((attrs, format!("Duplicate attribute: {}", String::from_utf8_lossy(name))));
            }
            match decode_text_strict(raw) {
                Ok(value) => attrs.push(Attribute::new(name, value)),
                Err(msg) => return Err((attrs, msg)),
            }
        } else {
            attrs.push(Attribute::new(name, decode_text(raw)));
        }
    }

    Ok(attrs)
}
