//! XML Event Types
//!
//! Pull-parser events produced by [`SliceReader`](super::slice::SliceReader).
//! Names and unescaped content borrow from the input; decoded text is owned.

use crate::core::attributes::Attribute;
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement(&'a [u8]),
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    /// Text content between tags (entities decoded)
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(&'a [u8]),
    /// Comment content
    Comment(&'a [u8]),
    /// `<?target data?>`
    ProcessingInstruction { target: &'a [u8], data: &'a [u8] },
    /// `<?xml ...?>`
    XmlDeclaration,
    /// `<!DOCTYPE ...>`
    DocType,
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Full element name (may include prefix)
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    /// Namespace prefix (before colon), if any
    pub fn prefix(&self) -> Option<&'a [u8]> {
        memchr::memchr(b':', self.name).map(|pos| &self.name[..pos])
    }

    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name_str() == Some(name))
            .and_then(|a| a.value_str())
    }
}

impl<'a> XmlEvent<'a> {
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    pub fn as_start_element(&self) -> Option<&StartElement<'a>> {
        match self {
            XmlEvent::StartElement(e) | XmlEvent::EmptyElement(e) => Some(e),
            _ => None,
        }
    }

    /// Character data carried by text or CDATA events
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            XmlEvent::Text(t) => Some(t.as_ref()),
            XmlEvent::CData(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_element() {
        let elem = StartElement::new(b"physical-interface", vec![]);
        assert_eq!(elem.name_str(), Some("physical-interface"));
        assert!(elem.prefix().is_none());
    }

    #[test]
    fn test_namespaced_element() {
        let elem = StartElement::new(b"junos:comment", vec![]);
        assert_eq!(elem.prefix(), Some(b"junos" as &[u8]));
    }

    #[test]
    fn test_as_text() {
        let ev = XmlEvent::CData(b"raw");
        assert_eq!(ev.as_text(), Some(b"raw" as &[u8]));
        assert!(!ev.is_start_element());
    }
}
