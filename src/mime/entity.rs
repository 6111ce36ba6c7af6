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

//! Splitting an entity into its header block and body, and splitting the
//! header block into fields.

use std::collections::HashMap;

use crate::mime::structured::trimmed_ascii_lowercase;
use crate::support::buffer::RawMessage;
use crate::support::error::Error;

// An adversary can submit megabytes of data without any headers, so the
// search for the blank line is bounded. Exchange caps headers at 64 KB and
// Sendmail at 32 KB; 256 KB leaves room for heavily folded address lists.
const HEADERS_LIMIT: usize = 262_144;

/// Splits an entity into `(headers, body)` at the first blank line.
///
/// Both CRLF and bare LF line endings are understood. A message that is
/// all headers and ends with a single line break gets an empty body. A
/// missing blank line is an error rather than an implicit empty body:
/// clients disagree about such messages, and disagreement between a
/// gateway and the client it protects is exactly what an attacker wants.
pub fn decode_entity(
    buffer: &RawMessage,
) -> Result<(RawMessage, RawMessage), Error> {
    let source = buffer.as_bytes();
    let length = HEADERS_LIMIT.min(source.len());
    let mut index = 0;
    while index < length {
        if source[index] == b'\r' {
            if index + 3 < length
                && source[index + 1] == b'\n'
                && source[index + 2] == b'\r'
                && source[index + 3] == b'\n'
            {
                return Ok((
                    buffer.slice(0..index),
                    buffer.slice(index + 4..buffer.len()),
                ));
            }
        } else if source[index] == b'\n'
            && index + 1 < length
            && source[index + 1] == b'\n'
        {
            return Ok((
                buffer.slice(0..index),
                buffer.slice(index + 2..buffer.len()),
            ));
        }
        index += 1;
    }
    if index >= HEADERS_LIMIT {
        return Err(Error::HeadersLimit);
    }
    if length >= 2 && source[length - 2] == b'\r' && source[length - 1] == b'\n'
    {
        return Ok((buffer.slice(0..length - 2), buffer.slice(length..length)));
    }
    if length >= 1 && source[length - 1] == b'\n' {
        return Ok((buffer.slice(0..length - 1), buffer.slice(length..length)));
    }
    Err(Error::HeadersCrlf)
}

/// The raw header fields of one entity, keyed by lowercased field name.
/// Bodies stay raw (still folded, still encoded); the field decoders in
/// [`crate::mime::header`] interpret them on demand.
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    headers: HashMap<String, Vec<RawMessage>>,
}

impl HeaderMap {
    /// The body of the first instance of `name`.
    pub fn first(&self, name: &str) -> Option<&RawMessage> {
        self.headers.get(name).and_then(|bodies| bodies.first())
    }

    /// All instances of `name`, joined with a comma.
    ///
    /// RFC 5322 4.5.3 treats repeated address fields (To, Cc, Bcc) as the
    /// concatenation of their address lists, which a comma expresses.
    pub fn joined(&self, name: &str) -> Option<RawMessage> {
        let bodies = self.headers.get(name)?;
        match bodies.len() {
            0 => None,
            1 => Some(bodies[0].clone()),
            _ => {
                let mut joined = Vec::new();
                for (index, body) in bodies.iter().enumerate() {
                    if index > 0 {
                        joined.extend_from_slice(b", ");
                    }
                    joined.extend_from_slice(body.as_bytes());
                }
                Some(RawMessage::new(joined))
            },
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    fn insert(&mut self, name: String, body: RawMessage) -> Result<(), Error> {
        if self.headers.contains_key(&name) {
            assert_unique(&name)?;
        }
        self.headers.entry(name).or_insert_with(Vec::new).push(body);
        Ok(())
    }
}

// Printable US-ASCII plus WSP, CR, and LF. RFC 2046 5.1.1 allows nothing
// else in headers, message or part alike.
const HEADER_CHARACTERS: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 33usize;
    while i < 127 {
        table[i] = true;
        i += 1;
    }
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table[b' ' as usize] = true;
    table
};

// Conflicting copies of these fields are a known trick for showing a
// scanner one thing and the client another, so a second copy is fatal.
// Multiple Received, Comments, and similar fields are legitimate.
fn assert_unique(name: &str) -> Result<(), Error> {
    match name {
        "content-disposition" => Err(Error::MultipleContentDisposition),
        "content-id" => Err(Error::MultipleContentId),
        "content-transfer-encoding" => {
            Err(Error::MultipleContentTransferEncoding)
        },
        "content-type" => Err(Error::MultipleContentType),
        "date" => Err(Error::MultipleDate),
        "from" => Err(Error::MultipleFrom),
        "in-reply-to" => Err(Error::MultipleInReplyTo),
        "references" => Err(Error::MultipleReferences),
        "reply-to" => Err(Error::MultipleReplyTo),
        "sender" => Err(Error::MultipleSender),
        "subject" => Err(Error::MultipleSubject),
        _ => Ok(()),
    }
}

/// Splits a header block into raw fields.
///
/// A line continued by WSP belongs to the preceding field (the fold stays
/// in the body for [`crate::mime::structured::unfold`] to validate). Field
/// names are lowercased; one WSP after the colon is consumed.
pub fn decode_headers(block: &RawMessage) -> Result<HeaderMap, Error> {
    let source = block.as_bytes();
    let mut headers = HeaderMap::default();
    let mut start = 0;
    let mut index = 0;
    while index < source.len() {
        if source[index] == b'\r' {
            index += 1;
            if index < source.len() && source[index] == b'\n' {
                index += 1;
                if index < source.len()
                    && (source[index] == b'\t' || source[index] == b' ')
                {
                    index += 1;
                } else {
                    decode_header(block, start, index - 2, &mut headers)?;
                    start = index;
                }
            }
        } else if source[index] == b'\n' {
            index += 1;
            if index < source.len()
                && (source[index] == b'\t' || source[index] == b' ')
            {
                index += 1;
            } else {
                decode_header(block, start, index - 1, &mut headers)?;
                start = index;
            }
        } else {
            index += 1;
        }
    }
    if start < source.len() {
        decode_header(block, start, source.len(), &mut headers)?;
    }
    Ok(headers)
}

fn decode_header(
    block: &RawMessage,
    start: usize,
    end: usize,
    headers: &mut HeaderMap,
) -> Result<(), Error> {
    let source = block.as_bytes();
    let line = &source[start..end];
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(Error::HeaderColonMissing)?;
    if !line.iter().all(|&b| HEADER_CHARACTERS[b as usize]) {
        return Err(Error::HeaderCharactersForbidden);
    }
    let name = trimmed_ascii_lowercase(&line[..colon]);
    let mut body = colon + 1;
    if body < line.len() && (line[body] == b'\t' || line[body] == b' ') {
        body += 1;
    }
    headers.insert(name, block.slice(start + body..end))
}

#[cfg(test)]
mod test {
    use super::*;

    fn raw(data: &[u8]) -> RawMessage {
        RawMessage::new(data.to_vec())
    }

    #[test]
    fn entity_splits_at_the_first_blank_line() {
        let buffer = raw(b"A: 1\r\nB: 2\r\n\r\nbody\r\n");
        let (headers, body) = decode_entity(&buffer).unwrap();
        assert_eq!(b"A: 1\r\nB: 2", headers.as_bytes());
        assert_eq!(b"body\r\n", body.as_bytes());
        let buffer = raw(b"A: 1\nB: 2\n\nbody");
        let (headers, body) = decode_entity(&buffer).unwrap();
        assert_eq!(b"A: 1\nB: 2", headers.as_bytes());
        assert_eq!(b"body", body.as_bytes());
    }

    #[test]
    fn entity_with_only_headers_gets_an_empty_body() {
        let (headers, body) = decode_entity(&raw(b"A: 1\r\n")).unwrap();
        assert_eq!(b"A: 1", headers.as_bytes());
        assert!(body.is_empty());
        let (headers, body) = decode_entity(&raw(b"A: 1\n")).unwrap();
        assert_eq!(b"A: 1", headers.as_bytes());
        assert!(body.is_empty());
    }

    #[test]
    fn entity_without_a_blank_line_is_rejected() {
        assert_matches!(Err(Error::HeadersCrlf), decode_entity(&raw(b"A: 1")));
    }

    #[test]
    fn entity_header_search_is_bounded() {
        let unterminated = vec![b'x'; HEADERS_LIMIT + 1];
        assert_matches!(
            Err(Error::HeadersLimit),
            decode_entity(&raw(&unterminated))
        );
        // A blank line within the bound is found even in a large message.
        let mut buffer = b"A: 1\r\n\r\n".to_vec();
        buffer.extend_from_slice(&vec![b'x'; HEADERS_LIMIT]);
        assert!(decode_entity(&raw(&buffer)).is_ok());
    }

    #[test]
    fn headers_split_on_lines_and_keep_folds_in_bodies() {
        let headers =
            decode_headers(&raw(b"Subject: a\r\n b\r\nTo: x@y.z")).unwrap();
        assert_eq!(
            b"a\r\n b",
            headers.first("subject").unwrap().as_bytes()
        );
        assert_eq!(b"x@y.z", headers.first("to").unwrap().as_bytes());
    }

    #[test]
    fn header_names_are_normalized() {
        let headers = decode_headers(&raw(b"SUBJECT: hi")).unwrap();
        assert!(headers.contains("subject"));
        assert_eq!(b"hi", headers.first("subject").unwrap().as_bytes());
    }

    #[test]
    fn header_without_a_colon_is_rejected() {
        assert_matches!(
            Err(Error::HeaderColonMissing),
            decode_headers(&raw(b"no colon here"))
        );
    }

    #[test]
    fn header_with_forbidden_characters_is_rejected() {
        assert_matches!(
            Err(Error::HeaderCharactersForbidden),
            decode_headers(&raw(b"Subject: caf\xe9"))
        );
        assert_matches!(
            Err(Error::HeaderCharactersForbidden),
            decode_headers(&raw(b"Subject: a\x00b"))
        );
    }

    #[test]
    fn duplicated_unique_headers_are_rejected() {
        assert_matches!(
            Err(Error::MultipleSubject),
            decode_headers(&raw(b"Subject: a\r\nSubject: b"))
        );
        assert_matches!(
            Err(Error::MultipleContentType),
            decode_headers(&raw(
                b"Content-Type: text/plain\r\nContent-Type: text/html"
            ))
        );
    }

    #[test]
    fn repeatable_headers_accumulate_and_join() {
        let headers =
            decode_headers(&raw(b"To: a@b.c\r\nTo: d@e.f\r\nReceived: x: y"))
                .unwrap();
        assert_eq!(b"a@b.c", headers.first("to").unwrap().as_bytes());
        assert_eq!(
            b"a@b.c, d@e.f",
            headers.joined("to").unwrap().as_bytes()
        );
    }
}
