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

//! Conversion of declared character sets to UTF-8.
//!
//! Charset labels arrive from untrusted headers, so they are length-bounded
//! and character-checked before being looked up, then folded through a
//! canonicalization table that absorbs the label misspellings seen in the
//! wild (`utf8`, `iso_8859-1`, `win-1252`, and so on).

use std::borrow::Cow;

use encoding_rs::DecoderResult;
use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

use crate::support::error::Error;

// Guard against malicious labels: whitespace and printable US-ASCII only.
const LABEL_LIMIT: usize = 24;

/// Uppercases a label and strips everything but letters and digits, so that
/// `UTF-8`, `utf8`, and `utf_8` all share one key.
pub fn canonical_key(charset: &str) -> String {
    charset
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

// Labels that already denote US-ASCII or UTF-8 (or declare none at all, as
// `binary` does) pass the source through unconverted. Invalid UTF-8 under
// such a label is surfaced to the caller as raw bytes, matching the most
// common client behavior.
fn identity(key: &str) -> bool {
    matches!(key, "ASCII" | "BINARY" | "USASCII" | "UTF8")
}

// Canonical key to a WHATWG encoding label. Names with no supported
// encoding are kept verbatim so the lookup below rejects them.
fn canon(key: &str) -> Option<&'static str> {
    Some(match key {
        "ANSIX31101983" => "iso-8859-1",
        "ARMSCII8" => "ARMSCII-8",
        "ASCII" => "ascii",
        "ATARIST" => "ATARIST",
        "BIG5" => "big5",
        "BIG5HKSCS" => "big5-hkscs",
        "BIG5HKSCS1999" => "big5-hkscs",
        "BIG5HKSCS2001" => "big5-hkscs",
        "BIG5HKSCS2004" => "big5-hkscs",
        "BKSC56011987" => "windows-949",
        "C99" => "C99",
        "CP1125" => "CP1125",
        "CP1133" => "CP1133",
        "CP1250" => "windows-1250",
        "CP1251" => "windows-1251",
        "CP1252" => "windows-1252",
        "CP1253" => "windows-1253",
        "CP1254" => "windows-1254",
        "CP1255" => "windows-1255",
        "CP1256" => "windows-1256",
        "CP1257" => "windows-1257",
        "CP1258" => "windows-1258",
        "CP437" => "CP437",
        "CP737" => "CP737",
        "CP775" => "CP775",
        "CP850" => "CP850",
        "CP852" => "CP852",
        "CP853" => "CP853",
        "CP855" => "CP855",
        "CP857" => "CP857",
        "CP858" => "CP858",
        "CP860" => "CP860",
        "CP861" => "CP861",
        "CP862" => "CP862",
        "CP863" => "CP863",
        "CP864" => "CP864",
        "CP865" => "CP865",
        "CP866" => "ibm866",
        "CP869" => "CP869",
        "CP874" => "windows-874",
        "CP932" => "windows-31j",
        "CP936" => "gbk",
        "CP949" => "windows-949",
        "CP950" => "big5",
        "EUCCN" => "gbk",
        "EUCJISX0213" => "EUC-JISX0213",
        "EUCJP" => "euc-jp",
        "EUCKR" => "euc-kr",
        "EUCTW" => "EUC-TW",
        "GB18030" => "gb18030",
        "GBK" => "gbk",
        "GEORGIANACADEMY" => "Georgian-Academy",
        "GEORGIANPS" => "Georgian-PS",
        "HPROMAN8" => "HP-ROMAN8",
        "HZ" => "HZ",
        "ISO2022CN" => "ISO-2022-CN",
        "ISO2022CNEXT" => "ISO-2022-CN-EXT",
        "ISO2022JP" => "iso-2022-jp",
        "ISO2022JP1" => "ISO-2022-JP-1",
        "ISO2022JP2" => "ISO-2022-JP-2",
        "ISO2022JP3" => "ISO-2022-JP-3",
        "ISO2022KR" => "ISO-2022-KR",
        "ISO88591" => "iso-8859-1",
        "ISO885910" => "iso-8859-10",
        "ISO885911" => "iso-8859-11",
        "ISO885913" => "iso-8859-13",
        "ISO885914" => "iso-8859-14",
        "ISO885915" => "iso-8859-15",
        "ISO885916" => "iso-8859-16",
        "ISO88592" => "iso-8859-2",
        "ISO88593" => "iso-8859-3",
        "ISO88594" => "iso-8859-4",
        "ISO88595" => "iso-8859-5",
        "ISO88596" => "iso-8859-6",
        "ISO88597" => "iso-8859-7",
        "ISO88598" => "iso-8859-8",
        "ISO88599" => "iso-8859-9",
        "JAVA" => "JAVA",
        "JOHAB" => "JOHAB",
        "KOI8R" => "koi8-r",
        "KOI8RU" => "koi8-ru",
        "KOI8T" => "KOI8-T",
        "KOI8U" => "koi8-u",
        "KSC56011987" => "windows-949",
        "MACARABIC" => "MacArabic",
        "MACCENTRALEUROPE" => "MacCentralEurope",
        "MACCROATIAN" => "MacCroatian",
        "MACCYRILLIC" => "x-mac-cyrillic",
        "MACGREEK" => "MacGreek",
        "MACHEBREW" => "MacHebrew",
        "MACICELAND" => "MacIceland",
        "MACINTOSH" => "macintosh",
        "MACROMAN" => "macintosh",
        "MACROMANIA" => "MacRomania",
        "MACTHAI" => "MacThai",
        "MACTURKISH" => "MacTurkish",
        "MACUKRAINE" => "x-mac-ukrainian",
        "MULELAO1" => "MuleLao-1",
        "NEXTSTEP" => "NEXTSTEP",
        "PT154" => "PT154",
        "RISCOSLATIN1" => "RISCOS-LATIN1",
        "RK1048" => "RK1048",
        "SHIFTJIS" => "shift_jis",
        "SHIFTJISX0213" => "Shift_JISX0213",
        "TCVN" => "TCVN",
        "TDS565" => "TDS565",
        "TIS620" => "tis-620",
        "UCS2" => "utf-16",
        "UCS2BE" => "utf-16be",
        "UCS2LE" => "utf-16le",
        "UCS4" => "UCS-4",
        "UCS4BE" => "UCS-4BE",
        "UCS4LE" => "UCS-4LE",
        "UHC" => "windows-949",
        "UTF16" => "utf-16",
        "UTF16BE" => "utf-16be",
        "UTF16LE" => "utf-16le",
        "UTF32" => "UTF-32",
        "UTF32BE" => "UTF-32BE",
        "UTF32LE" => "UTF-32LE",
        "UTF7" => "UTF-7",
        "UTF8" => "utf-8",
        "VISCII" => "VISCII",
        "WIN949" => "windows-949",
        "WINDOWS949" => "windows-949",
        "XUHC" => "windows-949",
        "XWIN949" => "windows-949",
        "XWINDOWS949" => "windows-949",
        _ => return None,
    })
}

lazy_static! {
    static ref WINDOWS: Regex = Regex::new(r"^X?WIN(DOWS)?(\d+)$").unwrap();
}

/// Converts `source` from the declared `charset` to UTF-8.
///
/// An empty label, or a label denoting US-ASCII or UTF-8, returns the
/// source unchanged. Conversion is strict: an illegal sequence raises
/// [`Error::CharsetIllegal`], a sequence cut short at the end of input
/// raises [`Error::CharsetTruncated`], and an unknown or unsafe label
/// raises [`Error::CharsetUnsupported`].
pub fn decode_charset<'a>(
    source: &'a [u8],
    charset: &str,
) -> Result<Cow<'a, [u8]>, Error> {
    if charset.is_empty() {
        return Ok(Cow::Borrowed(source));
    }
    if charset.len() > LABEL_LIMIT
        || !charset
            .bytes()
            .all(|b| b == b'\t' || b == b' ' || (0x21..=0x7e).contains(&b))
    {
        return Err(Error::CharsetUnsupported);
    }
    let key = canonical_key(charset);
    if identity(&key) {
        return Ok(Cow::Borrowed(source));
    }
    let label = match canon(&key) {
        Some(label) => Cow::Borrowed(label),
        None => match WINDOWS.captures(&key) {
            Some(captures) => {
                Cow::Owned(format!("windows-{}", &captures[2]))
            },
            None => Cow::Borrowed(key.as_str()),
        },
    };
    let encoding = match Encoding::for_label_no_replacement(label.as_bytes()) {
        Some(encoding) => encoding,
        None => {
            log::warn!("no encoding for charset label {:?}", charset);
            return Err(Error::CharsetUnsupported);
        },
    };
    Ok(Cow::Owned(convert(encoding, source)?))
}

// Strict decode: no replacement characters, and truncation at end of input
// is reported distinctly from an interior illegal sequence.
fn convert(encoding: &'static Encoding, source: &[u8]) -> Result<Vec<u8>, Error> {
    let mut decoder = encoding.new_decoder();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(source.len())
        .unwrap_or(source.len());
    let mut target = String::with_capacity(capacity);
    let mut read = 0;
    loop {
        let (result, consumed) = decoder.decode_to_string_without_replacement(
            &source[read..],
            &mut target,
            false,
        );
        read += consumed;
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => {
                target.reserve((source.len() - read).max(16))
            },
            DecoderResult::Malformed(..) => return Err(Error::CharsetIllegal),
        }
    }
    loop {
        let (result, _) =
            decoder.decode_to_string_without_replacement(b"", &mut target, true);
        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::OutputFull => target.reserve(16),
            DecoderResult::Malformed(..) => return Err(Error::CharsetTruncated),
        }
    }
    Ok(target.into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_labels_pass_bytes_through() {
        // Not valid UTF-8, but an identity label never converts.
        let raw = b"\xff\xfe";
        assert!(matches!(
            decode_charset(raw, "us-ascii").unwrap(),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            decode_charset(raw, "UTF-8").unwrap(),
            Cow::Borrowed(_)
        ));
        assert!(matches!(decode_charset(raw, "").unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn conversion_to_utf8_twice_is_identity() {
        let latin1 = b"caf\xe9";
        let once = decode_charset(latin1, "ISO-8859-1").unwrap().into_owned();
        assert_eq!("caf\u{e9}".as_bytes(), once.as_slice());
        let twice = decode_charset(&once, "UTF-8").unwrap().into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn label_misspellings_are_canonicalized() {
        assert_eq!("UTF8", canonical_key("utf_8"));
        assert_eq!("ISO88591", canonical_key("iso_8859-1"));
        // "latin1" bypasses the canon table but is a known label.
        assert_eq!(
            "caf\u{e9}".as_bytes(),
            decode_charset(b"caf\xe9", "latin1").unwrap().as_ref()
        );
        assert_eq!(
            "caf\u{e9}".as_bytes(),
            decode_charset(b"caf\xe9", "iso_8859-1").unwrap().as_ref()
        );
    }

    #[test]
    fn windows_aliases_collapse_to_windows() {
        for label in &["win-1252", "windows1252", "x-windows-1252", "WIN1252"] {
            assert_eq!(
                "caf\u{e9}".as_bytes(),
                decode_charset(b"caf\xe9", label).unwrap().as_ref()
            );
        }
    }

    #[test]
    fn illegal_and_truncated_sequences_are_distinguished() {
        // In euc-jp, 0xa1 opens a two-byte sequence.
        assert_matches!(
            Err(Error::CharsetTruncated),
            decode_charset(b"\xa1", "euc-jp")
        );
        assert_matches!(
            Err(Error::CharsetIllegal),
            decode_charset(b"\xa1\x20", "euc-jp")
        );
    }

    #[test]
    fn unsafe_labels_are_rejected() {
        assert_matches!(
            Err(Error::CharsetUnsupported),
            decode_charset(b"x", "a-label-way-over-the-length-limit")
        );
        assert_matches!(
            Err(Error::CharsetUnsupported),
            decode_charset(b"x", "bad\x01label")
        );
        assert_matches!(
            Err(Error::CharsetUnsupported),
            decode_charset(b"x", "no-such-charset")
        );
        // Stateful or replacement-mapped encodings stay unsupported.
        assert_matches!(
            Err(Error::CharsetUnsupported),
            decode_charset(b"x", "utf-7")
        );
    }
}
