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

//! Primitives shared by every structured header field: unfolding, comment
//! stripping, quoted-string removal, quote-aware searching and splitting,
//! percent decoding, and the `value; attribute=value` parameter form with
//! RFC 2231 continuations.
//!
//! All of these are copy-on-write. A well-formed input that needs no
//! rewriting is returned borrowed.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::mime::charset::decode_charset;
use crate::mime::encoded_word::decode_encoded_words;
use crate::mime::grammar::FWS;
use crate::support::error::Error;

// RFC 5322 2.1.1 limits a line to 998 characters excluding the CRLF. We add
// a 100 character grace for Outlook.com, which excludes the field name and
// separator from its own count and folds too late.
const LINE_LIMIT: usize = 998 + 100;

/// Removes any CRLF (or bare LF) immediately followed by WSP, per RFC 5322
/// 2.2.3. A CR not followed by LF, or a line break not followed by WSP,
/// is rejected rather than repaired since it can hide a header from
/// filtering software that splits on lines.
pub fn unfold(source: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    let mut target: Option<Vec<u8>> = None;
    let mut start = 0;
    let mut index = 0;
    while index < source.len() {
        match source[index] {
            b'\r' => {
                if index + 1 >= source.len() || source[index + 1] != b'\n' {
                    return Err(Error::HeaderCr);
                }
                unfold_copy(source, &mut target, &mut start, index, 2)?;
                index += 2;
            },
            b'\n' => {
                unfold_copy(source, &mut target, &mut start, index, 1)?;
                index += 1;
            },
            _ => index += 1,
        }
    }
    match target {
        Some(mut target) => {
            if start < source.len() {
                if source.len() - start > LINE_LIMIT {
                    return Err(Error::LineLimit);
                }
                target.extend_from_slice(&source[start..]);
            }
            Ok(Cow::Owned(target))
        },
        None => {
            if source.len() > LINE_LIMIT {
                return Err(Error::LineLimit);
            }
            Ok(Cow::Borrowed(source))
        },
    }
}

// `index` points at the CR (or bare LF) and `crlf` is the break length.
// The byte after the break must be WSP for the fold to be legal.
fn unfold_copy(
    source: &[u8],
    target: &mut Option<Vec<u8>>,
    start: &mut usize,
    index: usize,
    crlf: usize,
) -> Result<(), Error> {
    let after = index + crlf;
    if after >= source.len()
        || (source[after] != b'\t' && source[after] != b' ')
    {
        return Err(Error::HeaderCrlf);
    }
    if index - *start > LINE_LIMIT {
        return Err(Error::LineLimit);
    }
    let target = target.get_or_insert_with(|| Vec::with_capacity(source.len()));
    target.extend_from_slice(&source[*start..index]);
    *start = after;
    Ok(())
}

/// Strips RFC 5322 3.2.2 comments, honoring nesting, quoted strings, and
/// quoted pairs. Unterminated constructs are rejected.
pub fn remove_comments(source: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    let mut quote = false;
    let mut depth = 0usize;
    let mut target: Option<Vec<u8>> = None;
    let mut start = 0;
    let mut index = 0;
    while index < source.len() {
        match source[index] {
            b'"' => {
                if quote {
                    quote = false;
                } else if depth == 0 {
                    quote = true;
                }
            },
            b'(' => {
                if !quote {
                    if depth == 0 {
                        let target = target
                            .get_or_insert_with(|| Vec::with_capacity(source.len()));
                        target.extend_from_slice(&source[start..index]);
                        start = index;
                    }
                    depth += 1;
                }
            },
            b')' => {
                if !quote && depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        start = index + 1;
                    }
                }
            },
            b'\\' => {
                // A quoted-pair exists only within qcontent or ccontent, and
                // only the four structural codes need the escape honored.
                if (quote || depth > 0) && index + 1 < source.len() {
                    match source[index + 1] {
                        b'"' | b'(' | b')' | b'\\' => index += 1,
                        _ => (),
                    }
                }
            },
            _ => (),
        }
        index += 1;
    }
    if quote {
        return Err(Error::QuotedStringUnterminated);
    }
    if depth > 0 {
        return Err(Error::CommentUnterminated);
    }
    match target {
        Some(mut target) => {
            target.extend_from_slice(&source[start..]);
            Ok(Cow::Owned(target))
        },
        None => Ok(Cow::Borrowed(source)),
    }
}

/// Removes the DQUOTEs around RFC 5322 3.2.4 quoted strings and resolves
/// quoted pairs within them, leaving the content bytes.
pub fn decode_quoted_strings(source: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    let mut quote = false;
    let mut target: Option<Vec<u8>> = None;
    let mut index = 0;
    while index < source.len() {
        if source[index] == b'"' {
            if target.is_none() {
                target = Some(source[..index].to_vec());
            }
            quote = !quote;
            index += 1;
        } else {
            if quote && source[index] == b'\\' {
                index += 1;
                if index == source.len() {
                    break;
                }
            }
            if let Some(target) = target.as_mut() {
                target.push(source[index]);
            }
            index += 1;
        }
    }
    if quote {
        return Err(Error::QuotedStringUnterminated);
    }
    match target {
        Some(target) => Ok(Cow::Owned(target)),
        None => Ok(Cow::Borrowed(source)),
    }
}

/// Returns the index of the first `code` byte that is not within a quoted
/// string. Quoted pairs for DQUOTE and backslash are honored.
pub fn index_outside_quotes(source: &[u8], code: u8) -> Option<usize> {
    index_outside_quotes_from(source, 0, code)
}

pub fn index_outside_quotes_from(
    source: &[u8],
    mut index: usize,
    code: u8,
) -> Option<usize> {
    let mut quote = false;
    while index < source.len() {
        if source[index] == b'"' {
            quote = !quote;
        } else if source[index] == b'\\' {
            if quote
                && index + 1 < source.len()
                && (source[index + 1] == b'"' || source[index + 1] == b'\\')
            {
                index += 1;
            }
        } else if !quote && source[index] == code {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// A separator classification table for [`split_outside_quotes`]: 0 is an
/// ordinary byte, 1 splits, and [`SEPARATOR_DISCARD`] splits without
/// emitting the preceding run (used to swallow RFC 5322 group names up to
/// their colon).
pub type Separators = [u8; 256];

pub const SEPARATOR_DISCARD: u8 = 255;

pub const fn separators(split: &[u8], discard: &[u8]) -> Separators {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < split.len() {
        table[split[i] as usize] = 1;
        i += 1;
    }
    let mut i = 0;
    while i < discard.len() {
        table[discard[i] as usize] = SEPARATOR_DISCARD;
        i += 1;
    }
    table
}

/// Splits `source` on separator bytes that are not within quoted strings,
/// dropping empty runs.
pub fn split_outside_quotes<'a>(
    source: &'a [u8],
    separators: &Separators,
) -> Result<Vec<&'a [u8]>, Error> {
    let mut array = Vec::new();
    let mut quote = false;
    let mut start = 0;
    let mut index = 0;
    while index < source.len() {
        if source[index] == b'"' {
            quote = !quote;
        } else if source[index] == b'\\' {
            if quote
                && index + 1 < source.len()
                && (source[index + 1] == b'"' || source[index + 1] == b'\\')
            {
                index += 1;
            }
        } else if separators[source[index] as usize] > 0 && !quote {
            if separators[source[index] as usize] != SEPARATOR_DISCARD
                && start < index
            {
                array.push(&source[start..index]);
            }
            start = index + 1;
        }
        index += 1;
    }
    if quote {
        return Err(Error::QuotedStringUnterminated);
    }
    if start < source.len() {
        array.push(&source[start..]);
    }
    Ok(array)
}

/// Resolves RFC 2231 4 percent encoding. Sequences that are not a valid
/// `%XX` escape pass through untouched.
pub fn percent_decode(source: &[u8]) -> Cow<'_, [u8]> {
    fn hex(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'A'..=b'F' => Some(b - b'A' + 10),
            b'a'..=b'f' => Some(b - b'a' + 10),
            _ => None,
        }
    }
    let mut target: Option<Vec<u8>> = None;
    let mut index = 0;
    while index < source.len() {
        let escape = if source[index] == b'%' && index + 2 < source.len() {
            match (hex(source[index + 1]), hex(source[index + 2])) {
                (Some(hi), Some(lo)) => Some((hi << 4) + lo),
                _ => None,
            }
        } else {
            None
        };
        match escape {
            Some(byte) => {
                let target = target.get_or_insert_with(|| source[..index].to_vec());
                target.push(byte);
                index += 3;
            },
            None => {
                if let Some(target) = target.as_mut() {
                    target.push(source[index]);
                }
                index += 1;
            },
        }
    }
    match target {
        Some(target) => Cow::Owned(target),
        None => Cow::Borrowed(source),
    }
}

// The bytes allowed between angle brackets: atext, dot, '@', and the WSP
// that normalization removes.
const ANGLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0usize;
    while i < 256 {
        table[i] = (i as u8).is_ascii_alphanumeric();
        i += 1;
    }
    let symbols = b"!#$%&'*+-/=?^_`{|}~.@\t ";
    let mut i = 0;
    while i < symbols.len() {
        table[symbols[i] as usize] = true;
        i += 1;
    }
    table
};

// Finds the next `<...>` span containing only ANGLE bytes. A nested '<'
// restarts the span; an excluded byte abandons the candidate entirely.
fn angle_match(source: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut opening = index_outside_quotes_from(source, from, b'<')?;
    let mut index = opening + 1;
    while index < source.len() {
        match source[index] {
            b'>' => return Some((opening, index + 1)),
            b'<' => opening = index,
            byte if !ANGLE[byte as usize] => return None,
            _ => (),
        }
        index += 1;
    }
    None
}

/// Removes WSP inside angle-bracketed tokens, so that `< a @ b >` becomes
/// `<a@b>` before address or identifier parsing. Angle brackets within
/// quoted strings are ignored.
pub fn normalize_angle_brackets(source: &[u8]) -> Cow<'_, [u8]> {
    let mut target: Option<Vec<u8>> = None;
    let mut index = 0;
    while index < source.len() {
        let (open, end) = match angle_match(source, index) {
            Some(range) => range,
            None => break,
        };
        if let Some(target) = target.as_mut() {
            target.extend_from_slice(&source[index..open]);
        }
        for inner in open..end {
            match source[inner] {
                b'\t' | b' ' => {
                    if target.is_none() {
                        target = Some(source[..inner].to_vec());
                    }
                },
                byte => {
                    if let Some(target) = target.as_mut() {
                        target.push(byte);
                    }
                },
            }
        }
        index = end;
    }
    match target {
        Some(mut target) => {
            target.extend_from_slice(&source[index..]);
            Cow::Owned(target)
        },
        None => Cow::Borrowed(source),
    }
}

pub fn trim(source: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = source.len();
    while start < end && FWS[source[start] as usize] {
        start += 1;
    }
    while end > start && FWS[source[end - 1] as usize] {
        end -= 1;
    }
    &source[start..end]
}

/// Trims, masks each byte to 7 bits, and lowercases. This is the
/// normalization applied to every token compared case-insensitively
/// (field names, media types, parameter attributes, charset labels).
pub fn trimmed_ascii_lowercase(source: &[u8]) -> String {
    trim(source)
        .iter()
        .map(|&b| ((b & 0x7f) as char).to_ascii_lowercase())
        .collect()
}

/// The decoded form of a `value; attribute=value; ...` header body, shared
/// by Content-Type and Content-Disposition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderValueParameters {
    pub value: String,
    pub parameters: HashMap<String, String>,
}

impl HeaderValueParameters {
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(|value| value.as_str())
    }
}

struct Segment {
    encoded: bool,
    charset: Option<String>,
    value: Vec<u8>,
}

const PARAMETER_SEPARATORS: Separators = separators(b";", b"");

// RFC 2231 3 allows neither leading zeroes nor gaps in the continuation
// sequence; gaps are tolerated here, but the segment count is bounded.
const CONTINUATION_LIMIT: u32 = 1000;

lazy_static! {
    static ref CONTINUATION: Regex =
        Regex::new(r"^([^*]+)(\*\d+)?(\*)?$").unwrap();
}

/// Decodes a parameterized header body. The leading value and every
/// attribute name are normalized to lowercase; values have quoted strings
/// removed, RFC 2231 continuations reassembled and converted from their
/// declared charset, and any RFC 2047 encoded words decoded.
///
/// Encoded words are forbidden in parameters by RFC 2047 5, but Outlook
/// and Gmail both emit them in `name` and `filename`, so they are decoded
/// in any parameter not using the RFC 2231 form.
///
/// Duplicates of the security-sensitive parameters (`boundary`, `charset`,
/// `filename`, `name`) are rejected: conflicting copies are a known vector
/// for desynchronizing a gateway scanner from the client.
pub fn decode_value_parameters(
    source: &[u8],
) -> Result<HeaderValueParameters, Error> {
    let semicolon = source
        .iter()
        .position(|&b| b == b';')
        .unwrap_or_else(|| source.len());
    let mut header = HeaderValueParameters {
        value: trimmed_ascii_lowercase(&source[..semicolon]),
        parameters: HashMap::new(),
    };
    let parts = if semicolon < source.len() {
        split_outside_quotes(&source[semicolon + 1..], &PARAMETER_SEPARATORS)?
    } else {
        Vec::new()
    };
    let mut continuations: Vec<(String, BTreeMap<u32, Segment>)> = Vec::new();
    for part in parts {
        let equal = part.iter().position(|&b| b == b'=');
        let name =
            trimmed_ascii_lowercase(&part[..equal.unwrap_or_else(|| part.len())]);
        let equal = match equal {
            Some(equal) => equal,
            None if name.is_empty() => continue,
            None => return Err(Error::ParameterValueMissing),
        };
        if name.is_empty() {
            return Err(Error::ParameterAttributeMissing);
        }
        let value = decode_quoted_strings(trim(&part[equal + 1..]))?;
        if !push_continuation_segment(&name, &value, &mut continuations)? {
            assert_parameter_unique(&header.parameters, &name)?;
            let value = decode_encoded_words(&value)?;
            header
                .parameters
                .insert(name, String::from_utf8_lossy(&value).into_owned());
        }
    }
    for (name, segments) in continuations {
        assert_parameter_unique(&header.parameters, &name)?;
        let value = assemble_continuation_segments(segments)?;
        header
            .parameters
            .insert(name, String::from_utf8_lossy(&value).into_owned());
    }
    Ok(header)
}

fn assert_parameter_unique(
    parameters: &HashMap<String, String>,
    name: &str,
) -> Result<(), Error> {
    if !parameters.contains_key(name) {
        return Ok(());
    }
    match name {
        "boundary" => Err(Error::ParameterMultipleBoundary),
        "charset" => Err(Error::ParameterMultipleCharset),
        "filename" => Err(Error::ParameterMultipleFilename),
        "name" => Err(Error::ParameterMultipleName),
        _ => Ok(()),
    }
}

// Recognizes the RFC 2231 forms `name*0=`, `name*0*=`, and `name*=`,
// recording the segment for later reassembly. Returns false when the
// attribute is an ordinary parameter.
fn push_continuation_segment(
    name: &str,
    value: &[u8],
    continuations: &mut Vec<(String, BTreeMap<u32, Segment>)>,
) -> Result<bool, Error> {
    let captures = match CONTINUATION.captures(name) {
        Some(captures) => captures,
        None => return Ok(false),
    };
    if captures.get(2).is_none() && captures.get(3).is_none() {
        return Ok(false);
    }
    let name = captures.get(1).unwrap().as_str();
    let index: u32 = captures
        .get(2)
        .map(|star_index| star_index.as_str()[1..].parse().unwrap_or(u32::MAX))
        .unwrap_or(0);
    if index > CONTINUATION_LIMIT {
        return Err(Error::ContinuationLimit);
    }
    let encoded = captures.get(3).is_some();
    let mut charset = None;
    let mut value = value;
    if encoded {
        // An encoded segment may open with a charset'language' prefix.
        if let Some(quote) = value.iter().position(|&b| b == b'\'') {
            if let Some(language) =
                value[quote + 1..].iter().position(|&b| b == b'\'')
            {
                charset = Some(trimmed_ascii_lowercase(&value[..quote]));
                value = &value[quote + 1 + language + 1..];
            }
        }
    }
    let position = match continuations
        .iter()
        .position(|(existing, _)| existing == name)
    {
        Some(position) => position,
        None => {
            continuations.push((name.to_string(), BTreeMap::new()));
            continuations.len() - 1
        },
    };
    let segments = &mut continuations[position].1;
    if segments.contains_key(&index) {
        return Err(Error::ContinuationDuplicate);
    }
    segments.insert(
        index,
        Segment {
            encoded,
            charset,
            value: value.to_vec(),
        },
    );
    Ok(true)
}

// The charset declared by the first labeled segment carries forward to
// later encoded segments that lack their own label.
fn assemble_continuation_segments(
    segments: BTreeMap<u32, Segment>,
) -> Result<Vec<u8>, Error> {
    let mut target = Vec::new();
    let mut carried: Option<String> = None;
    for (_, segment) in segments {
        if segment.encoded {
            if carried.is_none() && segment.charset.is_some() {
                carried = segment.charset.clone();
            }
            let charset = segment.charset.as_ref().or_else(|| carried.as_ref());
            let decoded = percent_decode(&segment.value);
            match charset {
                Some(charset) => {
                    target.extend_from_slice(&decode_charset(&decoded, charset)?)
                },
                None => target.extend_from_slice(&decoded),
            }
        } else {
            target.extend_from_slice(&segment.value);
        }
    }
    Ok(target)
}
