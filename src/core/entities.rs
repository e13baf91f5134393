//! XML Entity Decoding
//!
//! Handles the five predefined entities and numeric character references.
//! Text without a `&` is returned borrowed.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references, leaving unknown ones untouched
#[inline]
pub fn decode_text(input: &[u8]) -> Cow<'_, [u8]> {
    if memchr(b'&', input).is_none() {
        return Cow::Borrowed(input);
    }
    match decode_entities(input, false) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(_) => Cow::Borrowed(input),
    }
}

/// Decode entity references, rejecting unknown or malformed ones
pub fn decode_text_strict(input: &[u8]) -> Result<Cow<'_, [u8]>, String> {
    if memchr(b'&', input).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode_entities(input, true).map(Cow::Owned)
}

fn decode_entities(input: &[u8], strict: bool) -> Result<Vec<u8>, String> {
    let mut result = Vec::with_capacity(input.len());
    let mut pos = 0;

    while let Some(amp) = memchr(b'&', &input[pos..]) {
        result.extend_from_slice(&input[pos..pos + amp]);
        pos += amp;

        let decoded = memchr(b';', &input[pos..]).and_then(|semi| {
            decode_entity(&input[pos + 1..pos + semi]).map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                let mut buf = [0u8; 4];
                result.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                pos += semi + 1;
            }
            None if strict => {
                let end = memchr(b';', &input[pos..]).map_or(input.len(), |s| pos + s + 1);
                return Err(format!(
                    "Undefined entity reference: {}",
                    String::from_utf8_lossy(&input[pos..end])
                ));
            }
            None => {
                result.push(b'&');
                pos += 1;
            }
        }
    }

    result.extend_from_slice(&input[pos..]);
    Ok(result)
}

/// Decode a single entity body (without `&` and `;`)
fn decode_entity(entity: &[u8]) -> Option<char> {
    match entity {
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"amp" => Some('&'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        [b'#', b'x' | b'X', hex @ ..] => {
            let hex = std::str::from_utf8(hex).ok()?;
            char::from_u32(u32::from_str_radix(hex, 16).ok()?)
        }
        [b'#', dec @ ..] => {
            let dec = std::str::from_utf8(dec).ok()?;
            char::from_u32(dec.parse().ok()?)
        }
        _ => None,
    }
}
