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

//! Content-Transfer-Encoding handling: base64 decoding and the combined
//! body pipeline (transfer decoding followed by charset conversion).

use std::borrow::Cow;

use crate::mime::charset::decode_charset;
use crate::mime::header::ContentTransferEncoding;
use crate::mime::quoted_printable::qp_decode;
use crate::mime::structured::HeaderValueParameters;
use crate::support::error::Error;

/// Decodes base64 content.
///
/// RFC 2045 6.8 asks decoders to ignore line breaks, and RFC 4648 3.3
/// warns that other non-alphabet characters are a covert channel. So
/// whitespace is ignored, and anything else outside the alphabet is
/// rejected rather than skipped. A final quantum of a single character
/// cannot encode any data and is reported as truncation.
///
/// `body` selects the error kinds, so a caller can distinguish a bad body
/// from a bad encoded word in a header.
pub fn decode_base64(source: &[u8], body: bool) -> Result<Vec<u8>, Error> {
    let stripped: Cow<[u8]> = if source.iter().any(|b| is_wsp(*b)) {
        Cow::Owned(
            source
                .iter()
                .copied()
                .filter(|b| !is_wsp(*b))
                .collect::<Vec<u8>>(),
        )
    } else {
        Cow::Borrowed(source)
    };
    // Classify embedded junk before length: a byte outside the alphabet
    // is illegal content even when it also breaks the quantum length.
    if stripped.iter().any(|&b| !in_alphabet(b)) {
        return Err(if body {
            Error::Base64BodyIllegal
        } else {
            Error::Base64WordIllegal
        });
    }
    base64::decode(stripped.as_ref()).map_err(|error| match error {
        base64::DecodeError::InvalidLength => {
            if body {
                Error::Base64BodyTruncated
            } else {
                Error::Base64WordTruncated
            }
        },
        base64::DecodeError::InvalidByte(..)
        | base64::DecodeError::InvalidLastSymbol(..) => {
            if body {
                Error::Base64BodyIllegal
            } else {
                Error::Base64WordIllegal
            }
        },
    })
}

fn is_wsp(b: u8) -> bool {
    b == b'\t' || b == b'\n' || b == b'\r' || b == b' '
}

fn in_alphabet(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

/// Decodes a body: the transfer encoding is undone first, then the
/// `charset` parameter of the Content-Type (if any) is converted to UTF-8.
///
/// The identity encodings `7bit`, `8bit`, and `binary` leave the bytes
/// untouched. RFC 2046 4.1.2 scopes `charset` to text types, but other
/// types (e.g. `application/json`) use it in practice, so it is honored
/// wherever it appears.
pub fn decode_body<'a>(
    source: &'a [u8],
    content_type: &HeaderValueParameters,
    encoding: ContentTransferEncoding,
) -> Result<Cow<'a, [u8]>, Error> {
    let decoded = match encoding {
        ContentTransferEncoding::Base64 => {
            Cow::Owned(decode_base64(source, true)?)
        },
        ContentTransferEncoding::QuotedPrintable => qp_decode(source, true)?,
        ContentTransferEncoding::SevenBit
        | ContentTransferEncoding::EightBit
        | ContentTransferEncoding::Binary => Cow::Borrowed(source),
    };
    match content_type.parameter("charset") {
        Some(charset) => match decoded {
            Cow::Borrowed(decoded) => decode_charset(decoded, charset),
            Cow::Owned(decoded) => {
                Ok(Cow::Owned(decode_charset(&decoded, charset)?.into_owned()))
            },
        },
        None => Ok(decoded),
    }
}
