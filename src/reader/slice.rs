//! Zero-Copy Slice Reader
//!
//! Pull parser over a byte slice. In lenient mode malformed markup is
//! skipped or surfaced as text; in strict mode the first violation stops
//! the reader and is reported through [`SliceReader::error`].

use super::events::{StartElement, XmlEvent};
use crate::core::attributes::{parse_attributes, parse_attributes_strict};
use crate::core::entities::{decode_text, decode_text_strict};
use crate::core::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;

/// Zero-copy XML reader from a byte slice
pub struct SliceReader<'a> {
    scanner: Scanner<'a>,
    strict: bool,
    error: Option<String>,
}

impl<'a> SliceReader<'a> {
    /// Create a new slice reader (lenient mode)
    pub fn new(input: &'a [u8]) -> Self {
        SliceReader {
            scanner: Scanner::new(input),
            strict: false,
            error: None,
        }
    }

    /// Create a new slice reader in strict mode
    pub fn new_strict(input: &'a [u8]) -> Self {
        SliceReader {
            strict: true,
            ..Self::new(input)
        }
    }

    /// First well-formedness error seen (strict mode only)
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn fail(&mut self, msg: impl Into<String>, at: usize) -> Option<XmlEvent<'a>> {
        if self.strict {
            self.error = Some(format!("{} at byte {}", msg.into(), at));
            self.scanner.set_position(self.scanner.input().len());
        }
        None
    }

    /// Get the next XML event, or `None` at end of input (or after a strict error)
    pub fn next_event(&mut self) -> Option<XmlEvent<'a>> {
        while !self.scanner.is_eof() && self.error.is_none() {
            let start = self.scanner.position();

            if !self.scanner.starts_with(b"<") {
                let end = self.scanner.find_tag_start().unwrap_or(self.scanner.input().len());
                let raw = self.scanner.slice(start, end);
                self.scanner.set_position(end);
                let text = if self.strict {
                    match decode_text_strict(raw) {
                        Ok(t) => t,
                        Err(msg) => return self.fail(msg, start),
                    }
                } else {
                    decode_text(raw)
                };
                return Some(XmlEvent::Text(text));
            }

            let event = if self.scanner.starts_with(b"<!--") {
                self.read_delimited(4, b"-->", "Unterminated comment").map(XmlEvent::Comment)
            } else if self.scanner.starts_with(b"<![CDATA[") {
                self.read_delimited(9, b"]]>", "Unterminated CDATA section").map(XmlEvent::CData)
            } else if self.scanner.starts_with(b"<!DOCTYPE") {
                self.read_doctype()
            } else if self.scanner.starts_with(b"<?") {
                self.read_processing_instruction()
            } else if self.scanner.starts_with(b"</") {
                self.read_end_tag()
            } else {
                self.read_start_tag()
            };

            if event.is_some() {
                return event;
            }
            // Lenient readers skip what they could not make sense of
            if !self.strict && self.scanner.position() == start {
                self.scanner.set_position(start + 1);
            }
        }
        None
    }

    /// Read markup of the form `<open ... close>`, returning the body
    fn read_delimited(&mut self, open: usize, close: &[u8], msg: &str) -> Option<&'a [u8]> {
        let start = self.scanner.position();
        self.scanner.set_position(start + open);
        match self.scanner.find_sequence(close) {
            Some(end) => {
                self.scanner.set_position(end + close.len());
                Some(self.scanner.slice(start + open, end))
            }
            None => {
                self.fail(msg, start);
                let len = self.scanner.input().len();
                self.scanner.set_position(len);
                None
            }
        }
    }

    fn read_doctype(&mut self) -> Option<XmlEvent<'a>> {
        let start = self.scanner.position();
        let input = self.scanner.input();
        let mut depth = 0usize;
        let mut pos = start + 2;
        while pos < input.len() {
            match input[pos] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.scanner.set_position(pos + 1);
                    return Some(XmlEvent::DocType);
                }
                _ => {}
            }
            pos += 1;
        }
        self.fail("Unterminated DOCTYPE", start);
        self.scanner.set_position(input.len());
        None
    }

    fn read_processing_instruction(&mut self) -> Option<XmlEvent<'a>> {
        let start = self.scanner.position();
        let body = self.read_delimited(2, b"?>", "Unterminated processing instruction")?;
        let name_len = body.iter().position(|&b| is_whitespace(b)).unwrap_or(body.len());
        let (target, data) = body.split_at(name_len);
        if target.is_empty() {
            return self.fail("Processing instruction without target", start);
        }
        if target == b"xml" {
            return Some(XmlEvent::XmlDeclaration);
        }
        Some(XmlEvent::ProcessingInstruction {
            target,
            data: data.trim_ascii_start(),
        })
    }

    fn read_end_tag(&mut self) -> Option<XmlEvent<'a>> {
        let start = self.scanner.position();
        self.scanner.set_position(start + 2);
        let Some(name) = self.scanner.read_name() else {
            return self.fail("Invalid end tag", start);
        };
        let Some(end) = self.scanner.find_byte(b'>') else {
            return self.fail("Unterminated end tag", start);
        };
        let trailing = self.scanner.slice(self.scanner.position(), end);
        if self.strict && !trailing.iter().all(|&b| is_whitespace(b)) {
            return self.fail("Unexpected content in end tag", start);
        }
        self.scanner.set_position(end + 1);
        Some(XmlEvent::EndElement(name))
    }

    fn read_start_tag(&mut self) -> Option<XmlEvent<'a>> {
        let start = self.scanner.position();
        self.scanner.set_position(start + 1);
        let Some(name) = self.scanner.read_name() else {
            if self.strict {
                return self.fail("Invalid start tag", start);
            }
            // A stray '<' in lenient mode is character data
            return Some(XmlEvent::Text(Cow::Borrowed(self.scanner.slice(start, start + 1))));
        };
        let attr_start = self.scanner.position();
        let Some(end) = self.scanner.find_tag_end_quoted() else {
            return self.fail("Unterminated start tag", start);
        };
        self.scanner.set_position(end + 1);

        let is_empty = end > attr_start && self.scanner.input()[end - 1] == b'/';
        let attr_end = if is_empty { end - 1 } else { end };
        let attr_bytes = self.scanner.slice(attr_start, attr_end);

        if self.strict && !attr_bytes.is_empty() && !is_whitespace(attr_bytes[0]) {
            return self.fail("Invalid character in element name", attr_start);
        }
        let attributes = if self.strict {
            match parse_attributes_strict(attr_bytes) {
                Ok(attrs) => attrs,
                Err(msg) => return self.fail(msg, attr_start),
            }
        } else {
            parse_attributes(attr_bytes)
        };

        let elem = StartElement::new(name, attributes);
        Some(if is_empty {
            XmlEvent::EmptyElement(elem)
        } else {
            XmlEvent::StartElement(elem)
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let events: Vec<_> = SliceReader::new(b"<root>hello</root>").collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name_str() == Some("root")));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.as_ref() == b"hello"));
        assert!(matches!(&events[2], XmlEvent::EndElement(n) if *n == b"root"));
    }

    #[test]
    fn test_empty_element() {
        let events: Vec<_> = SliceReader::new(b"<up/>").collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], XmlEvent::EmptyElement(e) if e.name_str() == Some("up")));
    }

    #[test]
    fn test_attributes() {
        let events: Vec<_> = SliceReader::new(b"<rpc-reply xmlns:junos=\"http://xml.juniper.net/junos/\" attr='a>b'/>").collect();
        assert_eq!(events.len(), 1);
        let e = events[0].as_start_element().unwrap();
        assert_eq!(e.get_attribute_value("attr"), Some("a>b"));
    }

    #[test]
    fn test_cdata_and_comment() {
        let events: Vec<_> = SliceReader::new(b"<a><![CDATA[x<y]]><!-- note --></a>").collect();
        assert!(matches!(&events[1], XmlEvent::CData(c) if *c == b"x<y"));
        assert!(matches!(&events[2], XmlEvent::Comment(c) if *c == b" note "));
    }

    #[test]
    fn test_declaration_and_pi() {
        let events: Vec<_> = SliceReader::new(b"<?xml version=\"1.0\"?><?junos-cli show?><a/>").collect();
        assert!(matches!(events[0], XmlEvent::XmlDeclaration));
        assert!(matches!(&events[1], XmlEvent::ProcessingInstruction { target, data } if *target == b"junos-cli" && *data == b"show"));
    }

    #[test]
    fn test_doctype_with_subset() {
        let events: Vec<_> = SliceReader::new(b"<!DOCTYPE a [<!ENTITY e \"v\">]><a/>").collect();
        assert!(matches!(events[0], XmlEvent::DocType));
        assert!(events[1].is_start_element());
    }

    #[test]
    fn test_strict_reports_error() {
        let mut reader = SliceReader::new_strict(b"<a x=1></a>");
        while reader.next_event().is_some() {}
        assert!(reader.error().is_some());
    }

    #[test]
    fn test_lenient_stray_lt() {
        let events: Vec<_> = SliceReader::new(b"<a>1 < 2</a>").collect();
        let text: Vec<u8> = events.iter().filter_map(|e| e.as_text()).flatten().copied().collect();
        assert_eq!(text, b"1 < 2");
    }
}
