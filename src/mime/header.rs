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

//! Decoders for individual header fields. Each takes the raw (still
//! folded) field body, or `None` when the field is absent, and produces a
//! typed value with the field's documented default.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::mime::encoded_word::decode_encoded_words;
use crate::mime::structured::{
    decode_value_parameters, normalize_angle_brackets, remove_comments,
    separators, split_outside_quotes, trim, trimmed_ascii_lowercase, unfold,
    HeaderValueParameters, Separators,
};
use crate::support::error::Error;

/// The RFC 2045 6.1 transfer mechanisms this decoder recognizes. An
/// `ietf-token` or `x-token` mechanism is rejected rather than treated as
/// `application/octet-stream`, since a gateway cannot scan what it cannot
/// decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentTransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
}

impl Default for ContentTransferEncoding {
    fn default() -> Self {
        ContentTransferEncoding::SevenBit
    }
}

/// Decodes Content-Type. An absent field means `text/plain` in US-ASCII,
/// per RFC 2045 5.2.
///
/// `message/external-body` and `message/partial` are rejected outright:
/// the former fetches content from elsewhere after scanning, the latter
/// reassembles an attachment after scanning, and both exist primarily to
/// defeat gateways. A multipart type without a `boundary` parameter is
/// also rejected.
pub fn decode_content_type(
    source: Option<&[u8]>,
) -> Result<HeaderValueParameters, Error> {
    let source = source.unwrap_or(b"text/plain;charset=us-ascii");
    let header =
        decode_value_parameters(&remove_comments(&unfold(source)?)?)?;
    if !media_type_shape(&header.value) {
        return Err(Error::ContentType);
    }
    if header.value == "message/external-body" {
        return Err(Error::ContentTypeExternalBody);
    }
    if header.value == "message/partial" {
        return Err(Error::ContentTypePartial);
    }
    if header.value.starts_with("multipart/")
        && header.parameter("boundary").is_none()
    {
        return Err(Error::ContentTypeBoundaryMissing);
    }
    Ok(header)
}

// type "/" subtype, both non-empty and free of whitespace.
fn media_type_shape(value: &str) -> bool {
    let mut halves = value.splitn(2, '/');
    let media = halves.next().unwrap_or("");
    let subtype = halves.next().unwrap_or("");
    !media.is_empty()
        && !subtype.is_empty()
        && !value.contains(char::is_whitespace)
}

/// Decodes Content-Disposition. An absent field decodes to an empty
/// disposition with no parameters.
pub fn decode_content_disposition(
    source: Option<&[u8]>,
) -> Result<HeaderValueParameters, Error> {
    let source = match source {
        Some(source) => source,
        None => {
            return Ok(HeaderValueParameters {
                value: String::new(),
                parameters: Default::default(),
            })
        },
    };
    decode_value_parameters(&remove_comments(&unfold(source)?)?)
}

/// Decodes Content-Transfer-Encoding. An absent or empty field means
/// `7bit`. The common misspellings `7-bit`, `8-bit`, `base-64`, and
/// `quotedprintable` are accepted, as is a quoted mechanism.
pub fn decode_content_transfer_encoding(
    source: Option<&[u8]>,
) -> Result<ContentTransferEncoding, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(ContentTransferEncoding::SevenBit),
    };
    let unfolded = unfold(source)?;
    let stripped = remove_comments(&unfolded)?;
    let mut mechanism = trimmed_ascii_lowercase(&stripped);
    if mechanism.len() >= 2
        && mechanism.starts_with('"')
        && mechanism.ends_with('"')
    {
        mechanism = mechanism[1..mechanism.len() - 1].trim().to_string();
    }
    match mechanism.as_str() {
        "" | "7bit" | "7-bit" => Ok(ContentTransferEncoding::SevenBit),
        "8bit" | "8-bit" => Ok(ContentTransferEncoding::EightBit),
        "binary" => Ok(ContentTransferEncoding::Binary),
        "base64" | "base-64" => Ok(ContentTransferEncoding::Base64),
        "quoted-printable" | "quotedprintable" => {
            Ok(ContentTransferEncoding::QuotedPrintable)
        },
        _ => Err(Error::ContentTransferEncodingUnrecognized),
    }
}

/// Decodes an unstructured field (Subject and friends): unfold, decode
/// encoded words, and interpret as UTF-8 with replacement.
pub fn decode_unstructured(source: Option<&[u8]>) -> Result<String, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(String::new()),
    };
    let unfolded = unfold(source)?;
    let decoded = decode_encoded_words(&unfolded)?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Decodes a single-identifier field (Message-ID, Content-ID): the
/// identifier is the content of the angle brackets, with interior WSP in
/// the brackets removed.
pub fn decode_identifier(source: Option<&[u8]>) -> Result<Option<String>, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    let normalized =
        normalize_angle_brackets(&remove_comments(&unfold(source)?)?)
            .into_owned();
    let mut identifier = trim(&normalized);
    if let Some(stripped) = identifier.strip_prefix(b"<") {
        identifier = trim(stripped);
    }
    if let Some(stripped) = identifier.strip_suffix(b">") {
        identifier = trim(stripped);
    }
    Ok(Some(
        identifier.iter().map(|&b| (b & 0x7f) as char).collect(),
    ))
}

const IDENTIFIER_SEPARATORS: Separators = separators(b"\t ,<>", b"");

/// Decodes a multi-identifier field (References, In-Reply-To).
///
/// Identifiers are split on CFWS and angle brackets; a token without an
/// interior `@` is discarded rather than treated as an error, since these
/// fields commonly carry phrases in obsolete syntax.
pub fn decode_identifiers(source: Option<&[u8]>) -> Result<Vec<String>, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(Vec::new()),
    };
    let normalized =
        normalize_angle_brackets(&remove_comments(&unfold(source)?)?)
            .into_owned();
    let tokens = split_outside_quotes(&normalized, &IDENTIFIER_SEPARATORS)?;
    Ok(tokens
        .into_iter()
        .filter_map(|token| {
            let identifier: String =
                token.iter().map(|&b| (b & 0x7f) as char).collect();
            match identifier.find('@') {
                Some(at) if at > 0 && at < identifier.len() - 1 => {
                    Some(identifier)
                },
                _ => None,
            }
        })
        .collect())
}

fn month_number(name: &str) -> Option<u32> {
    Some(match name {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    })
}

// Named zones seen in the wild, resolved to their UTC offsets. RFC 5322
// 4.3 only defines the North American zones and makes every other
// alphabetic zone -0000; in practice clients expect the named offset.
fn zone_offset(name: &str) -> Option<&'static str> {
    Some(match name {
        "ACDT" => "+1030",
        "ACST" => "+0930",
        "ACT" => "+0800",
        "ADT" => "-0300",
        "AEDT" => "+1100",
        "AEST" => "+1000",
        "AFT" => "+0430",
        "AKDT" => "-0800",
        "AKST" => "-0900",
        "AMST" => "-0300",
        "AMT" => "+0400",
        "ART" => "-0300",
        "AST" => "+0300",
        "AWDT" => "+0900",
        "AWST" => "+0800",
        "AZOST" => "-0100",
        "AZT" => "+0400",
        "BDT" => "+0800",
        "BIOT" => "+0600",
        "BIT" => "-1200",
        "BOT" => "-0400",
        "BRT" => "-0300",
        "BST" => "+0600",
        "BTT" => "+0600",
        "CAT" => "+0200",
        "CCT" => "+0630",
        "CDT" => "-0500",
        "CEDT" => "+0200",
        "CEST" => "+0200",
        "CET" => "+0100",
        "CHADT" => "+1345",
        "CHAST" => "+1245",
        "CHOT" => "+0800",
        "CHST" => "+1000",
        "CHUT" => "+1000",
        "CIST" => "-0800",
        "CIT" => "+0800",
        "CKT" => "-1000",
        "CLST" => "-0300",
        "CLT" => "-0400",
        "COST" => "-0400",
        "COT" => "-0500",
        "CST" => "-0600",
        "CT" => "+0800",
        "CVT" => "-0100",
        "CWST" => "+0845",
        "CXT" => "+0700",
        "DAVT" => "+0700",
        "DDUT" => "+1000",
        "DFT" => "+0100",
        "EASST" => "-0500",
        "EAST" => "-0600",
        "EAT" => "+0300",
        "ECT" => "-0500",
        "EDT" => "-0400",
        "EEDT" => "+0300",
        "EEST" => "+0300",
        "EET" => "+0200",
        "EGST" => "+0000",
        "EGT" => "-0100",
        "EIT" => "+0900",
        "EST" => "-0500",
        "FET" => "+0300",
        "FJT" => "+1200",
        "FKST" => "-0300",
        "FKT" => "-0400",
        "FNT" => "-0200",
        "GALT" => "-0600",
        "GAMT" => "-0900",
        "GET" => "+0400",
        "GFT" => "-0300",
        "GILT" => "+1200",
        "GIT" => "-0900",
        "GMT" => "+0000",
        "GST" => "+0400",
        "GYT" => "-0400",
        "HADT" => "-0900",
        "HAEC" => "+0200",
        "HAST" => "-1000",
        "HKT" => "+0800",
        "HMT" => "+0500",
        "HOVT" => "+0700",
        "HST" => "-1000",
        "ICT" => "+0700",
        "IDT" => "+0300",
        "IOT" => "+0300",
        "IRDT" => "+0430",
        "IRKT" => "+0900",
        "IRST" => "+0330",
        "IST" => "+0530",
        "JST" => "+0900",
        "KGT" => "+0600",
        "KOST" => "+1100",
        "KRAT" => "+0700",
        "KST" => "+0900",
        "LHST" => "+1030",
        "LINT" => "+1400",
        "MAGT" => "+1200",
        "MART" => "-0930",
        "MAWT" => "+0500",
        "MDT" => "-0600",
        "MET" => "+0100",
        "MEST" => "+0200",
        "MHT" => "+1200",
        "MIST" => "+1100",
        "MIT" => "-0930",
        "MMT" => "+0630",
        "MSK" => "+0400",
        "MST" => "-0700",
        "MUT" => "+0400",
        "MVT" => "+0500",
        "MYT" => "+0800",
        "NCT" => "+1100",
        "NDT" => "-0230",
        "NFT" => "+1130",
        "NPT" => "+0545",
        "NST" => "-0330",
        "NT" => "-0330",
        "NUT" => "-1100",
        "NZDT" => "+1300",
        "NZST" => "+1200",
        "OMST" => "+0700",
        "ORAT" => "+0500",
        "PDT" => "-0700",
        "PET" => "-0500",
        "PETT" => "+1200",
        "PGT" => "+1000",
        "PHOT" => "+1300",
        "PHT" => "+0800",
        "PKT" => "+0500",
        "PMDT" => "-0200",
        "PMST" => "-0300",
        "PONT" => "+1100",
        "PST" => "-0800",
        "PYST" => "-0300",
        "PYT" => "-0400",
        "RET" => "+0400",
        "ROTT" => "-0300",
        "SAKT" => "+1100",
        "SAMT" => "+0400",
        "SAST" => "+0200",
        "SBT" => "+1100",
        "SCT" => "+0400",
        "SGT" => "+0800",
        "SLST" => "+0530",
        "SRT" => "-0300",
        "SST" => "+0800",
        "SYOT" => "+0300",
        "TAHT" => "-1000",
        "THA" => "+0700",
        "TFT" => "+0500",
        "TJT" => "+0500",
        "TKT" => "+1300",
        "TLT" => "+0900",
        "TMT" => "+0500",
        "TOT" => "+1300",
        "TVT" => "+1200",
        "UCT" => "+0000",
        "ULAT" => "+0800",
        "UT" => "+0000",
        "UTC" => "+0000",
        "UYST" => "-0200",
        "UYT" => "-0300",
        "UZT" => "+0500",
        "VET" => "-0430",
        "VLAT" => "+1000",
        "VOLT" => "+0400",
        "VOST" => "+0600",
        "VUT" => "+1100",
        "WAKT" => "+1200",
        "WAST" => "+0200",
        "WAT" => "+0100",
        "WEDT" => "+0100",
        "WEST" => "+0100",
        "WET" => "+0000",
        "WST" => "+0800",
        "YAKT" => "+1000",
        "YEKT" => "+0600",
        _ => return None,
    })
}

lazy_static! {
    static ref DATE: Regex = Regex::new(
        r"(?x)
        ^(MON|TUE|WED|THU|FRI|SAT|SUN)?
        \s*,?\s*
        (\d{1,2})
        \s*
        (JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)
        \s*
        (\d{2,4})
        \s+
        (\d{1,2}):(\d{1,2})(:\d{1,2})?
        \s*
        ([+-]\s*\d{2,4}|[A-Z]{1,5})?
        \s*$"
    )
    .unwrap();
}

/// Decodes the Date field into a timestamp with its declared offset.
///
/// The grammar is the RFC 5322 3.3 date-time, loosened to what clients
/// send: the day name and seconds are optional, two and three digit years
/// are windowed per RFC 5322 4.3, a named zone resolves through the zone
/// table, and a missing zone (some BlackBerry clients) means UTC. Each
/// numeric field is range-checked; a day valid for some month but not
/// this one (say 31 April) rolls over, as most clients compute it.
pub fn decode_date(
    source: Option<&[u8]>,
) -> Result<Option<DateTime<FixedOffset>>, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    let unfolded = unfold(source)?;
    let stripped = remove_comments(&unfolded)?;
    let string: String = trim(&stripped)
        .iter()
        .map(|&b| ((b & 0x7f) as char).to_ascii_uppercase())
        .collect();
    let captures = DATE.captures(&string).ok_or(Error::Date)?;
    let day: i64 = captures[2].parse().map_err(|_| Error::Date)?;
    let month = month_number(&captures[3]).ok_or(Error::DateMonth)?;
    let year_digits = &captures[4];
    let mut year: i32 = year_digits.parse().map_err(|_| Error::Date)?;
    if year_digits.len() == 2 {
        year += if year < 50 { 2000 } else { 1900 };
    } else if year_digits.len() == 3 {
        year += 1900;
    }
    let hour: i64 = captures[5].parse().map_err(|_| Error::Date)?;
    let minute: i64 = captures[6].parse().map_err(|_| Error::Date)?;
    let second: i64 = captures
        .get(7)
        .map(|colon_second| colon_second.as_str()[1..].parse())
        .unwrap_or(Ok(0))
        .map_err(|_| Error::Date)?;
    let mut zone: String = captures
        .get(8)
        .map(|zone| zone.as_str())
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if zone.is_empty() {
        zone = "+0000".to_string();
    }
    if zone.bytes().all(|b| b.is_ascii_uppercase()) {
        zone = zone_offset(&zone).ok_or(Error::DateZone)?.to_string();
    }
    while zone.len() < 5 {
        zone.push('0');
    }
    let zone_hour: i32 = zone[1..3].parse().map_err(|_| Error::DateZone)?;
    let zone_minute: i32 =
        zone[zone.len() - 2..].parse().map_err(|_| Error::DateZone)?;
    if day == 0 || day > 31 {
        return Err(Error::DateDay);
    }
    if hour > 23 {
        return Err(Error::DateHour);
    }
    if minute > 59 {
        return Err(Error::DateMinute);
    }
    if second > 60 {
        return Err(Error::DateSecond);
    }
    if zone_hour > 23 || zone_minute > 59 {
        return Err(Error::DateZone);
    }
    let mut offset_seconds = (zone_hour * 60 + zone_minute) * 60;
    if zone.starts_with('-') {
        offset_seconds = -offset_seconds;
    }
    let offset =
        FixedOffset::east_opt(offset_seconds).ok_or(Error::DateZone)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::Date)?;
    let local = first.and_hms(0, 0, 0)
        + Duration::days(day - 1)
        + Duration::hours(hour)
        + Duration::minutes(minute)
        + Duration::seconds(second);
    let utc = local - Duration::seconds(i64::from(offset_seconds));
    Ok(Some(DateTime::from_utc(utc, offset)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn content_type_default_and_normalization() {
        let header = decode_content_type(None).unwrap();
        assert_eq!("text/plain", header.value);
        assert_eq!(Some("us-ascii"), header.parameter("charset"));
        let header = decode_content_type(Some(
            b"text/plain; CHARSET=US-ascii (Plain Text)",
        ))
        .unwrap();
        assert_eq!("text/plain", header.value);
        assert_eq!(Some("US-ascii"), header.parameter("charset"));
    }

    #[test]
    fn content_type_shape_is_enforced() {
        assert_matches!(
            Err(Error::ContentType),
            decode_content_type(Some(b"textplain"))
        );
        assert_matches!(
            Err(Error::ContentType),
            decode_content_type(Some(b"text/"))
        );
        assert_matches!(
            Err(Error::ContentType),
            decode_content_type(Some(b"/plain"))
        );
    }

    #[test]
    fn content_type_dangerous_types_are_rejected() {
        assert_matches!(
            Err(Error::ContentTypeExternalBody),
            decode_content_type(Some(b"Message/External-Body"))
        );
        assert_matches!(
            Err(Error::ContentTypePartial),
            decode_content_type(Some(b"message/partial; number=1; total=2"))
        );
        assert_matches!(
            Err(Error::ContentTypeBoundaryMissing),
            decode_content_type(Some(b"multipart/mixed"))
        );
    }

    #[test]
    fn content_transfer_encoding_defaults_and_aliases() {
        use ContentTransferEncoding::*;
        assert_eq!(SevenBit, decode_content_transfer_encoding(None).unwrap());
        assert_eq!(
            SevenBit,
            decode_content_transfer_encoding(Some(b" ")).unwrap()
        );
        assert_eq!(
            SevenBit,
            decode_content_transfer_encoding(Some(b"7-BIT")).unwrap()
        );
        assert_eq!(
            Base64,
            decode_content_transfer_encoding(Some(b"Base-64")).unwrap()
        );
        assert_eq!(
            Base64,
            decode_content_transfer_encoding(Some(b"\"base64\"")).unwrap()
        );
        assert_eq!(
            QuotedPrintable,
            decode_content_transfer_encoding(Some(b"QuotedPrintable")).unwrap()
        );
        assert_matches!(
            Err(Error::ContentTransferEncodingUnrecognized),
            decode_content_transfer_encoding(Some(b"uuencode"))
        );
    }

    #[test]
    fn unstructured_unfolds_and_decodes_words() {
        assert_eq!(
            "hello world",
            decode_unstructured(Some(b"hello\r\n world")).unwrap()
        );
        assert_eq!(
            "caf\u{e9}",
            decode_unstructured(Some(b"=?ISO-8859-1?Q?caf=E9?=")).unwrap()
        );
        assert_eq!("", decode_unstructured(None).unwrap());
    }

    #[test]
    fn identifier_strips_brackets_and_wsp() {
        assert_eq!(
            Some("a@b.c".to_string()),
            decode_identifier(Some(b"<a@b.c>")).unwrap()
        );
        assert_eq!(
            Some("a@b.c".to_string()),
            decode_identifier(Some(b" < a @ b.c > ")).unwrap()
        );
        assert_eq!(None, decode_identifier(None).unwrap());
    }

    #[test]
    fn identifiers_keep_only_plausible_msg_ids() {
        assert_eq!(
            vec!["a@b.c".to_string(), "d@e.f".to_string()],
            decode_identifiers(Some(b"<a@b.c> (comment) <d@e.f>")).unwrap()
        );
        assert_eq!(
            vec!["a@b.c".to_string()],
            decode_identifiers(Some(b"phrase without at <a@b.c>")).unwrap()
        );
        assert!(decode_identifiers(None).unwrap().is_empty());
    }

    #[test]
    fn date_full_form() {
        let date =
            decode_date(Some(b"Fri, 13 Oct 2017 09:08:14 -0400")).unwrap();
        let date = date.unwrap();
        assert_eq!("2017-10-13 13:08:14", format!("{}", date.naive_utc()));
        assert_eq!(-4 * 3600, date.offset().local_minus_utc());
    }

    #[test]
    fn date_days_past_the_end_of_the_month_roll_over() {
        let date = decode_date(Some(b"31 Apr 2017 00:00:00 +0000"))
            .unwrap()
            .unwrap();
        assert_eq!("2017-05-01 00:00:00", format!("{}", date.naive_utc()));
    }

    #[test]
    fn date_leap_second_rolls_over() {
        let date = decode_date(Some(b"31 Dec 2016 23:59:60 +0000"))
            .unwrap()
            .unwrap();
        assert_eq!("2017-01-01 00:00:00", format!("{}", date.naive_utc()));
    }

    #[test]
    fn date_loose_forms() {
        use chrono::Datelike;

        // No day name, no seconds, named zone.
        let date = decode_date(Some(b"13 Oct 2017 09:08 GMT")).unwrap().unwrap();
        assert_eq!(0, date.offset().local_minus_utc());
        // Missing zone means UTC.
        assert!(decode_date(Some(b"13 Oct 2017 09:08:14"))
            .unwrap()
            .is_some());
        // Two digit years are windowed.
        let date = decode_date(Some(b"13 Oct 17 09:08:14 +0000"))
            .unwrap()
            .unwrap();
        assert_eq!(2017, date.naive_utc().year());
        let date = decode_date(Some(b"13 Oct 99 09:08:14 +0000"))
            .unwrap()
            .unwrap();
        assert_eq!(1999, date.naive_utc().year());
        assert_eq!(None, decode_date(None).unwrap());
    }

    #[test]
    fn date_fields_are_range_checked() {
        assert_matches!(
            Err(Error::DateDay),
            decode_date(Some(b"37 Oct 2017 09:08:14 +0000"))
        );
        assert_matches!(
            Err(Error::DateHour),
            decode_date(Some(b"13 Oct 2017 24:08:14 +0000"))
        );
        assert_matches!(
            Err(Error::DateMinute),
            decode_date(Some(b"13 Oct 2017 09:60:14 +0000"))
        );
        assert_matches!(
            Err(Error::DateSecond),
            decode_date(Some(b"13 Oct 2017 09:08:61 +0000"))
        );
        assert_matches!(
            Err(Error::DateZone),
            decode_date(Some(b"13 Oct 2017 09:08:14 +2500"))
        );
        assert_matches!(
            Err(Error::DateZone),
            decode_date(Some(b"13 Oct 2017 09:08:14 XYZZY"))
        );
        assert_matches!(
            Err(Error::Date),
            decode_date(Some(b"not a date"))
        );
    }
}
