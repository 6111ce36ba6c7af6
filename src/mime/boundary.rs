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

//! Multipart body splitting (RFC 2046 5.1.1).

use memchr::memmem;

use crate::support::buffer::RawMessage;
use crate::support::error::Error;

// A part costs the client memory and render time, so the count is capped.
const PART_LIMIT: usize = 10_000;

// A pattern match that turns out not to be a boundary delimiter line costs
// another search, so an adversarial body full of near-boundaries is capped
// separately from the part count.
const FALSE_POSITIVE_LIMIT: usize = 10_000;

const BOUNDARY_LENGTH_LIMIT: usize = 70;

// bchars, per RFC 2046 5.1.1.
fn boundary_character(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || b"'()+_,-./:=?@ ".contains(&b)
}

/// Validates a `boundary` parameter value before it is used as a search
/// pattern. Boundaries are case sensitive and at most 70 characters, may
/// not end in whitespace, and draw from the `bchars` alphabet only.
pub fn validate_boundary(boundary: &str) -> Result<(), Error> {
    if boundary.is_empty() {
        return Err(Error::PartBoundaryEmpty);
    }
    if boundary.trim().is_empty() {
        return Err(Error::PartBoundaryWsp);
    }
    if boundary.len() > BOUNDARY_LENGTH_LIMIT {
        return Err(Error::PartBoundaryLimit);
    }
    if !boundary.bytes().all(boundary_character) {
        return Err(Error::PartBoundaryCharactersForbidden);
    }
    if boundary.ends_with(' ') {
        return Err(Error::PartBoundaryWsp);
    }
    Ok(())
}

struct Delimiter {
    begin: usize,
    end: usize,
    closing: bool,
}

/// Splits a multipart body into its parts.
///
/// The preamble and epilogue are discarded, as are zero-length parts. A
/// body whose closing delimiter arrives before any opening delimiter, or
/// that never closes at all, is rejected rather than rendered
/// differently by the gateway and the client.
pub fn decode_parts(
    buffer: &RawMessage,
    boundary: Option<&str>,
) -> Result<Vec<RawMessage>, Error> {
    let boundary = boundary.ok_or(Error::PartBoundaryMissing)?;
    validate_boundary(boundary)?;
    let mut pattern = Vec::with_capacity(2 + boundary.len());
    pattern.extend_from_slice(b"--");
    pattern.extend_from_slice(boundary.as_bytes());
    let finder = memmem::Finder::new(&pattern);
    let source = buffer.as_bytes();
    let mut parts = Vec::new();
    let mut preamble = true;
    let mut index = 0;
    // An opening delimiter, N - 1 separating delimiters, and a closing
    // delimiter bound N parts at N + 1 iterations.
    for _ in 0..PART_LIMIT + 1 {
        let delimiter = find_delimiter(source, &finder, pattern.len(), index)?
            .ok_or(Error::PartMissing)?;
        if preamble {
            preamble = false;
        } else if delimiter.begin > index {
            parts.push(buffer.slice(index..delimiter.begin));
        }
        if delimiter.closing {
            log::debug!(
                "multipart body split into {} part(s)",
                parts.len()
            );
            return Ok(parts);
        }
        index = delimiter.end;
    }
    Err(Error::PartLimit)
}

fn byte_at(source: &[u8], index: usize) -> Option<u8> {
    source.get(index).copied()
}

// Finds the next boundary delimiter line at or after `from`. The pattern
// must start a line; the line break before it belongs to the delimiter,
// not the preceding part. The delimiter's own line break is consumed only
// when followed by part headers (not another break), so a part that
// starts with a blank line keeps it.
fn find_delimiter(
    source: &[u8],
    finder: &memmem::Finder<'_>,
    pattern_length: usize,
    mut from: usize,
) -> Result<Option<Delimiter>, Error> {
    for _ in 0..FALSE_POSITIVE_LIMIT {
        let at = match finder.find(&source[from..]) {
            Some(offset) => from + offset,
            None => return Ok(None),
        };
        let after_lf = at >= 1 && source[at - 1] == b'\n';
        if at == 0 || after_lf {
            let mut delimiter = Delimiter {
                begin: at,
                end: at + pattern_length,
                closing: false,
            };
            if after_lf {
                delimiter.begin -= 1;
                if at >= 2 && source[at - 2] == b'\r' {
                    delimiter.begin -= 1;
                }
            }
            if byte_at(source, delimiter.end) == Some(b'-')
                && byte_at(source, delimiter.end + 1) == Some(b'-')
            {
                delimiter.end += 2;
                delimiter.closing = true;
            }
            while matches!(
                byte_at(source, delimiter.end),
                Some(b'\t') | Some(b' ')
            ) {
                delimiter.end += 1;
            }
            let crlf = byte_at(source, delimiter.end) == Some(b'\r')
                && byte_at(source, delimiter.end + 1) == Some(b'\n');
            if crlf {
                let blank = byte_at(source, delimiter.end + 2) == Some(b'\r')
                    && byte_at(source, delimiter.end + 3) == Some(b'\n');
                if !blank {
                    delimiter.end += 2;
                }
                return Ok(Some(delimiter));
            } else if byte_at(source, delimiter.end) == Some(b'\n') {
                if byte_at(source, delimiter.end + 1) != Some(b'\n') {
                    delimiter.end += 1;
                }
                return Ok(Some(delimiter));
            } else if delimiter.closing && delimiter.end == source.len() {
                // Transports strip the final CRLF often enough that a
                // closing delimiter at the end of the body is accepted
                // without one.
                return Ok(Some(delimiter));
            }
        }
        from = at + 1;
    }
    Err(Error::PartBoundaryFalsePositiveLimit)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn raw(data: &[u8]) -> RawMessage {
        RawMessage::new(data.to_vec())
    }

    fn multipart(boundary: &str, parts: usize) -> Vec<u8> {
        let mut body = Vec::new();
        for index in 0..parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!("X-Part: {}\r\n\r\ncontent\r\n", index).as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }

    #[test]
    fn boundary_validation() {
        assert_matches!(Ok(()), validate_boundary("simple boundary"));
        assert_matches!(
            Err(Error::PartBoundaryEmpty),
            validate_boundary("")
        );
        assert_matches!(
            Err(Error::PartBoundaryWsp),
            validate_boundary("   ")
        );
        assert_matches!(
            Err(Error::PartBoundaryWsp),
            validate_boundary("boundary ")
        );
        assert_matches!(
            Err(Error::PartBoundaryLimit),
            validate_boundary(&"b".repeat(71))
        );
        assert_matches!(
            Err(Error::PartBoundaryCharactersForbidden),
            validate_boundary("bound*ary")
        );
        assert_matches!(
            Err(Error::PartBoundaryMissing),
            decode_parts(&raw(b""), None)
        );
    }

    #[test]
    fn splits_the_rfc_2046_example() {
        // RFC 2046 5.1.1, preamble and epilogue included.
        let body = b"This is the preamble.\r\n\
            --simple boundary\r\n\
            \r\n\
            First part.\r\n\
            --simple boundary\r\n\
            Content-type: text/plain; charset=us-ascii\r\n\
            \r\n\
            Second part.\r\n\
            --simple boundary--\r\n\
            This is the epilogue.\r\n";
        let parts = decode_parts(&raw(body), Some("simple boundary")).unwrap();
        assert_eq!(2, parts.len());
        // The delimiter's CRLF is only consumed when explicit headers
        // follow, so a headerless part keeps its empty header block.
        assert_eq!(b"\r\n\r\nFirst part.", parts[0].as_bytes());
        assert_eq!(
            b"Content-type: text/plain; charset=us-ascii\r\n\r\nSecond part.",
            parts[1].as_bytes()
        );
    }

    #[test]
    fn lf_only_bodies_split() {
        let body = b"--b\nA: 1\n\nfirst\n--b\nA: 2\n\nsecond\n--b--\n";
        let parts = decode_parts(&raw(body), Some("b")).unwrap();
        assert_eq!(2, parts.len());
        assert_eq!(b"A: 1\n\nfirst", parts[0].as_bytes());
        assert_eq!(b"A: 2\n\nsecond", parts[1].as_bytes());
    }

    #[test]
    fn delimiter_line_tolerates_trailing_wsp() {
        let body = b"--b \t\r\nA: 1\r\n\r\nx\r\n--b-- \r\n";
        let parts = decode_parts(&raw(body), Some("b")).unwrap();
        assert_eq!(1, parts.len());
        assert_eq!(b"A: 1\r\n\r\nx", parts[0].as_bytes());
    }

    #[test]
    fn closing_delimiter_at_end_of_body_needs_no_crlf() {
        let parts =
            decode_parts(&raw(b"--b\r\nA: 1\r\n\r\nx\r\n--b--"), Some("b"))
                .unwrap();
        assert_eq!(1, parts.len());
    }

    #[test]
    fn near_boundaries_in_content_are_not_delimiters() {
        // The pattern mid-line is part content, not a delimiter.
        let body = b"--b\r\nA: 1\r\n\r\nsee --b for details\r\n--b--\r\n";
        let parts = decode_parts(&raw(body), Some("b")).unwrap();
        assert_eq!(1, parts.len());
        assert_eq!(b"A: 1\r\n\r\nsee --b for details", parts[0].as_bytes());
    }

    #[test]
    fn unterminated_multipart_is_rejected() {
        assert_matches!(
            Err(Error::PartMissing),
            decode_parts(&raw(b"--b\r\nA: 1\r\n\r\nx\r\n"), Some("b"))
        );
        assert_matches!(
            Err(Error::PartMissing),
            decode_parts(&raw(b"no delimiters at all"), Some("b"))
        );
    }

    #[test]
    fn part_count_is_capped() {
        let parts =
            decode_parts(&raw(&multipart("b", PART_LIMIT)), Some("b")).unwrap();
        assert_eq!(PART_LIMIT, parts.len());
        assert_matches!(
            Err(Error::PartLimit),
            decode_parts(&raw(&multipart("b", PART_LIMIT + 1)), Some("b"))
        );
    }

    #[test]
    fn false_positives_are_capped() {
        // Every line starts with the pattern but none terminates as a
        // delimiter line.
        let mut body = Vec::new();
        for _ in 0..FALSE_POSITIVE_LIMIT + 1 {
            body.extend_from_slice(b"--bx\r\n");
        }
        assert_matches!(
            Err(Error::PartBoundaryFalsePositiveLimit),
            decode_parts(&raw(&body), Some("b"))
        );
    }

    #[test]
    fn empty_parts_are_dropped() {
        let body = b"--b\r\n--b\r\nA: 1\r\n\r\nx\r\n--b--\r\n";
        let parts = decode_parts(&raw(body), Some("b")).unwrap();
        assert_eq!(1, parts.len());
    }

    proptest! {
        #[test]
        fn build_then_split_reproduces_parts(
            boundary in "[a-zA-Z0-9]{1,10}",
            contents in proptest::collection::vec("[a-z ]{1,20}", 1..8),
        ) {
            let mut body = Vec::new();
            for content in &contents {
                body.extend_from_slice(
                    format!("--{}\r\n", boundary).as_bytes(),
                );
                body.extend_from_slice(content.as_bytes());
                body.extend_from_slice(b"\r\n");
            }
            body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
            let parts = decode_parts(&raw(&body), Some(&boundary)).unwrap();
            prop_assert_eq!(contents.len(), parts.len());
            for (content, part) in contents.iter().zip(parts.iter()) {
                prop_assert_eq!(content.as_bytes(), part.as_bytes());
            }
        }
    }
}
