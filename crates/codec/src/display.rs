//! Display form: percent-escaped text for editing binary patterns.
//!
//! Every byte in the allow-list (printable ASCII except `%`) renders as
//! itself; everything else renders as a two-digit lowercase hex escape such
//! as `%0a`. The parser is the exact inverse, and additionally accepts the
//! one-digit escapes (`%a`) an older renderer produced for bytes below 0x10.

use crate::{
    error::{Error, Result},
    transport,
};

/// Whether a byte renders as itself in display form.
///
/// The allow-list is every printable ASCII byte except `%`, which is
/// reserved as the escape introducer.
pub fn is_display_literal(byte: u8) -> bool {
    (byte == b' ' || byte.is_ascii_graphic()) && byte != b'%'
}

/// Render raw pattern bytes as editable text.
pub fn to_display(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    for &byte in raw {
        if is_display_literal(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02x}"));
        }
    }
    out
}

/// Render a transport-form pattern directly, decoding it first.
pub fn transport_to_display(pattern: &str) -> Result<String> {
    Ok(to_display(&transport::decode(pattern)?))
}

/// Recover raw pattern bytes from display text.
///
/// Escapes are read greedily: `%` followed by two hex digits is one byte and
/// `%` followed by a single hex digit (the legacy form) is one byte, so a
/// non-hex character ends a short escape. A `%` with no hex digit after it
/// is an error. Literal text passes through as its UTF-8 bytes.
pub fn parse_display(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let Some(hi) = bytes.get(i + 1).copied().and_then(hex_value) else {
            return Err(Error::BadEscape { position: i });
        };
        match bytes.get(i + 2).copied().and_then(hex_value) {
            Some(lo) => {
                out.push(hi * 16 + lo);
                i += 3;
            },
            None => {
                out.push(hi);
                i += 2;
            },
        }
    }
    Ok(out)
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|value| value as u8)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn literal_set_is_printable_ascii_without_percent() {
        for byte in 0u8..=255 {
            let expected = (0x20..=0x7e).contains(&byte) && byte != b'%';
            assert_eq!(is_display_literal(byte), expected, "byte {byte:#04x}");
        }
    }

    #[test]
    fn renders_literals_verbatim() {
        assert_eq!(to_display(b"GET /flag.*"), "GET /flag.*");
    }

    #[test]
    fn escapes_are_two_lowercase_hex_digits() {
        assert_eq!(to_display(&[0x01, 0x02]), "%01%02");
        assert_eq!(to_display(&[0x0a, 0xff, b'%']), "%0a%ff%25");
    }

    #[test]
    fn display_round_trips_every_byte_value() {
        let raw: Vec<u8> = (0u8..=255).collect();
        assert_eq!(parse_display(&to_display(&raw)).unwrap(), raw);
    }

    #[test]
    fn accepts_legacy_single_digit_escapes() {
        assert_eq!(parse_display("%1%2").unwrap(), vec![0x01, 0x02]);
        // A non-hex character ends a short escape.
        assert_eq!(parse_display("%1x").unwrap(), vec![0x01, b'x']);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        assert_eq!(parse_display("%FF").unwrap(), vec![0xff]);
    }

    #[test]
    fn rejects_dangling_escapes() {
        assert!(matches!(
            parse_display("abc%"),
            Err(Error::BadEscape { position: 3 })
        ));
        assert!(matches!(
            parse_display("%zz"),
            Err(Error::BadEscape { position: 0 })
        ));
    }

    #[test]
    fn non_ascii_literals_pass_through_as_utf8() {
        let text = "héllo";
        assert_eq!(parse_display(text).unwrap(), text.as_bytes());
    }

    #[test]
    fn renders_transport_form_directly() {
        assert_eq!(transport_to_display("LipBPS4q").unwrap(), ".*A=.*");
        assert!(transport_to_display("!!").is_err());
    }
}
