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

//! RFC 2047 encoded words: `=?charset?encoding?encoded-text?=`.
//!
//! Anything that does not scan as a well-formed encoded word stays in the
//! output verbatim; a well-formed word whose payload fails to decode is an
//! error. Several deliberate deviations from the RFC match what clients
//! emit in practice: TAB and SPACE are tolerated inside tokens and text,
//! adjacent encoded words need not be separated by whitespace, and an
//! RFC 2231 `*language` suffix on the charset is ignored.

use std::borrow::Cow;

use crate::mime::charset::decode_charset;
use crate::mime::content_encoding::decode_base64;
use crate::mime::grammar::FWS;
use crate::mime::quoted_printable::qp_decode;
use crate::mime::structured::{trim, trimmed_ascii_lowercase};
use crate::support::error::Error;

// token = 1*<Any CHAR except SPACE, CTLs, and especials>, with TAB and
// SPACE additionally allowed.
const TOKEN: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 32usize;
    while i <= 126 {
        table[i] = true;
        i += 1;
    }
    table[b'\t' as usize] = true;
    let especials = b"()<>@,;:\\\"/[]?.=";
    let mut i = 0;
    while i < especials.len() {
        table[especials[i] as usize] = false;
        i += 1;
    }
    table
};

fn is_token(source: &[u8]) -> bool {
    source.iter().all(|&b| TOKEN[b as usize])
}

// encoded-text = printable ASCII other than '?', with TAB and SPACE
// additionally allowed.
fn is_text(source: &[u8]) -> bool {
    source
        .iter()
        .all(|&b| b == b'\t' || (32..=126).contains(&b) && b != b'?')
}

fn index_of(source: &[u8], from: usize, code: u8) -> Option<usize> {
    source[from..]
        .iter()
        .position(|&b| b == code)
        .map(|index| from + index)
}

// Scans forward from `from` for the next span that parses as an encoded
// word with a known encoding. A false start ("=?" with a malformed tail)
// resumes scanning one byte later so overlapping candidates are tried.
fn match_word(source: &[u8], mut from: usize) -> Option<(usize, usize)> {
    while from < source.len() {
        let index0 = index_of(source, from, b'=')?;
        if index0 + 1 >= source.len() {
            return None;
        }
        if source[index0 + 1] != b'?' {
            from = index0 + 1;
            continue;
        }
        let index1 = index_of(source, index0 + 2, b'?')?;
        let index2 = index_of(source, index1 + 1, b'?')?;
        let index3 = index_of(source, index2 + 1, b'?')?;
        if index3 + 1 >= source.len() {
            return None;
        }
        if source[index3 + 1] != b'=' {
            from = index0 + 1;
            continue;
        }
        if !is_token(&source[index0 + 2..index1])
            || !is_token(&source[index1 + 1..index2])
            || !is_text(&source[index2 + 1..index3])
        {
            from = index0 + 1;
            continue;
        }
        let encoding = trimmed_ascii_lowercase(&source[index1 + 1..index2]);
        if encoding != "b" && encoding != "q" {
            from = index0 + 1;
            continue;
        }
        return Some((index0, index3 + 2));
    }
    None
}

// Decodes one matched word. The span is known to be well-formed, so any
// failure from here on is a real payload error.
fn decode_word(source: &[u8]) -> Result<Vec<u8>, Error> {
    let index1 = index_of(source, 2, b'?').unwrap();
    let index2 = index_of(source, index1 + 1, b'?').unwrap();
    let index3 = index_of(source, index2 + 1, b'?').unwrap();
    let mut charset = trimmed_ascii_lowercase(&source[2..index1]);
    if let Some(asterisk) = charset.find('*') {
        charset.truncate(asterisk);
    }
    let encoding = trimmed_ascii_lowercase(&source[index1 + 1..index2]);
    let text = trim(&source[index2 + 1..index3]);
    let decoded = if encoding == "b" {
        Cow::Owned(decode_base64(text, false)?)
    } else {
        qp_decode(text, false)?
    };
    Ok(decode_charset(&decoded, &charset)?.into_owned())
}

fn is_wsp_only(source: &[u8]) -> bool {
    !source.is_empty() && source.iter().all(|&b| FWS[b as usize])
}

/// Replaces every encoded word in `source` with its decoded bytes.
///
/// Whitespace separating two adjacent encoded words is dropped, per
/// RFC 2047 6.2, but whitespace before the first word is kept.
pub fn decode_encoded_words(source: &[u8]) -> Result<Cow<'_, [u8]>, Error> {
    let mut target: Option<Vec<u8>> = None;
    let mut start = 0;
    let mut index = 0;
    while index < source.len() {
        let (word_start, word_end) = match match_word(source, index) {
            Some(range) => range,
            None => break,
        };
        let target = target.get_or_insert_with(Vec::new);
        if start < word_start
            && (start == 0 || !is_wsp_only(&source[start..word_start]))
        {
            target.extend_from_slice(&source[start..word_start]);
        }
        target.extend_from_slice(&decode_word(&source[word_start..word_end])?);
        start = word_end;
        index = word_end;
    }
    match target {
        Some(mut target) => {
            if start < source.len() {
                target.extend_from_slice(&source[start..]);
            }
            Ok(Cow::Owned(target))
        },
        None => Ok(Cow::Borrowed(source)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_b_and_q_words() {
        assert_eq!(
            "caf\u{e9}".as_bytes(),
            decode_encoded_words(b"=?ISO-8859-1?Q?caf=E9?=")
                .unwrap()
                .as_ref()
        );
        assert_eq!(
            "caf\u{e9}".as_bytes(),
            decode_encoded_words(b"=?ISO-8859-1?B?Y2Fm6Q==?=")
                .unwrap()
                .as_ref()
        );
    }

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(
            decode_encoded_words(b"no words here").unwrap(),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn wsp_between_adjacent_words_is_dropped() {
        assert_eq!(
            b"ab" as &[u8],
            decode_encoded_words(b"=?UTF-8?Q?a?= =?UTF-8?Q?b?=")
                .unwrap()
                .as_ref()
        );
        // Leading whitespace is not between words.
        assert_eq!(
            b" a" as &[u8],
            decode_encoded_words(b" =?UTF-8?Q?a?=").unwrap().as_ref()
        );
        // Non-whitespace text between words is kept.
        assert_eq!(
            b"a and b" as &[u8],
            decode_encoded_words(b"=?UTF-8?Q?a?= and =?UTF-8?Q?b?=")
                .unwrap()
                .as_ref()
        );
    }

    #[test]
    fn malformed_words_stay_verbatim() {
        for raw in [
            b"=?UTF-8?X?abc?=" as &[u8],
            b"=?UTF-8?Q?abc",
            b"=?UTF(8)?Q?abc?=",
        ]
        .iter()
        {
            assert_eq!(*raw, decode_encoded_words(raw).unwrap().as_ref());
        }
    }

    #[test]
    fn empty_charset_means_no_conversion() {
        assert_eq!(
            b"abc" as &[u8],
            decode_encoded_words(b"=??Q?abc?=").unwrap().as_ref()
        );
    }

    #[test]
    fn payload_errors_are_raised() {
        assert_matches!(
            Err(Error::Base64WordIllegal),
            decode_encoded_words(b"=?UTF-8?B?a%b?=")
        );
        assert_matches!(
            Err(Error::CharsetUnsupported),
            decode_encoded_words(b"=?no-such-charset?Q?abc?=")
        );
        assert_matches!(
            Err(Error::CharsetTruncated),
            decode_encoded_words(b"=?euc-jp?Q?=A1?=")
        );
    }

    #[test]
    fn language_suffix_on_charset_is_ignored() {
        assert_eq!(
            b"abc" as &[u8],
            decode_encoded_words(b"=?UTF-8*en?Q?abc?=").unwrap().as_ref()
        );
    }

    #[test]
    fn q_word_underscore_is_space() {
        assert_eq!(
            b"a b" as &[u8],
            decode_encoded_words(b"=?UTF-8?Q?a_b?=").unwrap().as_ref()
        );
    }
}
