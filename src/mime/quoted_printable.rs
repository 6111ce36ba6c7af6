//-
// Copyright (c) 2026, the mimeguard developers
//
// This file is part of mimeguard.
//
// Mimeguard is free software: you can redistribute it and/or modify it under
// the terms of  the GNU General Public License as  published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mimeguard is distributed in the hope  that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with mimeguard. If not, see <http://www.gnu.org/licenses/>.

//! The RFC 2045 6.7 quoted-printable decoder, also covering the RFC 2047
//! 4.2 "Q" variant used inside encoded words.

use std::borrow::Cow;

use crate::support::error::Error;

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Decodes quoted-printable content.
///
/// With `body` set, soft line breaks (`=` at end of line) are removed,
/// hard CRLFs pass through, and transport padding (WSP before a line
/// break) is deleted as RFC 2045 requires. With `body` clear the "Q"
/// encoded-word rules apply instead: `_` decodes to space and line breaks
/// are forbidden.
///
/// A malformed `=` escape is passed through literally, per the RFC's
/// robustness advice. Control characters other than TAB (and CRLF in a
/// body), and octets above 126, are rejected: they cannot legally appear
/// in quoted-printable data and usually indicate smuggled raw content.
pub fn qp_decode(source: &[u8], body: bool) -> Result<Cow<'_, [u8]>, Error> {
    let illegal = if body {
        Error::QuotedPrintableBodyIllegal
    } else {
        Error::QuotedPrintableWordIllegal
    };
    let mut target: Option<Vec<u8>> = None;
    let mut index = 0;
    while index < source.len() {
        let byte = source[index];
        match byte {
            b'=' => {
                let target = target.get_or_insert_with(|| {
                    let mut target = Vec::with_capacity(source.len());
                    target.extend_from_slice(&source[..index]);
                    target
                });
                // Probe for two hex digits after the '='.
                let escape = match (source.get(index + 1), source.get(index + 2))
                {
                    (Some(&hi), Some(&lo)) => match (hex(hi), hex(lo)) {
                        (Some(hi), Some(lo)) => Some((hi << 4) + lo),
                        _ => None,
                    },
                    _ => None,
                };
                if let Some(escape) = escape {
                    target.push(escape);
                    index += 3;
                } else if body
                    && source.get(index + 1) == Some(&b'\r')
                    && source.get(index + 2) == Some(&b'\n')
                {
                    // Soft line break.
                    index += 3;
                } else if body && source.get(index + 1) == Some(&b'\n') {
                    index += 2;
                } else {
                    target.push(b'=');
                    index += 1;
                }
            },
            b'\r' | b'\n' if body => {
                // Delete transport padding before the break.
                match target.as_mut() {
                    Some(target) => {
                        while target.last() == Some(&b' ')
                            || target.last() == Some(&b'\t')
                        {
                            target.pop();
                        }
                        target.push(byte);
                    },
                    None => {
                        let mut end = index;
                        while end > 0
                            && (source[end - 1] == b' '
                                || source[end - 1] == b'\t')
                        {
                            end -= 1;
                        }
                        if end < index {
                            let mut rewrite =
                                Vec::with_capacity(source.len());
                            rewrite.extend_from_slice(&source[..end]);
                            rewrite.push(byte);
                            target = Some(rewrite);
                        }
                    },
                }
                index += 1;
            },
            b'_' if !body => {
                let target = target.get_or_insert_with(|| {
                    let mut target = Vec::with_capacity(source.len());
                    target.extend_from_slice(&source[..index]);
                    target
                });
                target.push(b' ');
                index += 1;
            },
            b'\t' | b' '..=b'~' => {
                if let Some(target) = target.as_mut() {
                    target.push(byte);
                }
                index += 1;
            },
            _ => return Err(illegal),
        }
    }
    match target {
        Some(target) => Ok(Cow::Owned(target)),
        None => Ok(Cow::Borrowed(source)),
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn decodes_escapes_and_soft_breaks() {
        assert_eq!(
            b"hello world" as &[u8],
            qp_decode(b"hello=20world", true).unwrap().as_ref()
        );
        assert_eq!(
            b"hello world" as &[u8],
            qp_decode(b"hello wor=\r\nld", true).unwrap().as_ref()
        );
        assert_eq!(
            b"caf\xe9" as &[u8],
            qp_decode(b"caf=E9", true).unwrap().as_ref()
        );
        // Lowercase hex is tolerated.
        assert_eq!(
            b"caf\xe9" as &[u8],
            qp_decode(b"caf=e9", true).unwrap().as_ref()
        );
    }

    #[test]
    fn untouched_input_is_borrowed() {
        assert!(matches!(
            qp_decode(b"plain text\r\n", true).unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn malformed_escapes_pass_through() {
        assert_eq!(
            b"100% =sure" as &[u8],
            qp_decode(b"100% =sure", true).unwrap().as_ref()
        );
        assert_eq!(b"=" as &[u8], qp_decode(b"=", true).unwrap().as_ref());
    }

    #[test]
    fn transport_padding_is_deleted() {
        assert_eq!(
            b"line\r\nnext" as &[u8],
            qp_decode(b"line \t \r\nnext", true).unwrap().as_ref()
        );
    }

    #[test]
    fn q_encoding_maps_underscore_to_space() {
        assert_eq!(
            b"a b" as &[u8],
            qp_decode(b"a_b", false).unwrap().as_ref()
        );
        // Line breaks cannot appear within an encoded word.
        assert_matches!(
            Err(Error::QuotedPrintableWordIllegal),
            qp_decode(b"a\r\nb", false)
        );
    }

    #[test]
    fn raw_control_and_high_octets_are_rejected() {
        assert_matches!(
            Err(Error::QuotedPrintableBodyIllegal),
            qp_decode(b"a\x00b", true)
        );
        assert_matches!(
            Err(Error::QuotedPrintableBodyIllegal),
            qp_decode(b"a\xffb", true)
        );
        assert_matches!(
            Err(Error::QuotedPrintableWordIllegal),
            qp_decode(b"a\x7fb", false)
        );
    }

    fn qp_encode(data: &[u8]) -> Vec<u8> {
        let mut encoded = Vec::new();
        for &byte in data {
            match byte {
                b'=' | 0..=8 | 10..=31 | 127..=255 => {
                    encoded.extend_from_slice(
                        format!("={:02X}", byte).as_bytes(),
                    );
                },
                _ => encoded.push(byte),
            }
        }
        encoded
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(data in proptest::collection::vec(
            any::<u8>(), 0..256,
        )) {
            // The encoder escapes CR and LF, so no transport padding is
            // ever deleted and body decoding is an exact inverse.
            let encoded = qp_encode(&data);
            let decoded = qp_decode(&encoded, true).unwrap();
            prop_assert_eq!(&data[..], decoded.as_ref());
        }
    }
}
