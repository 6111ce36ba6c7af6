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

//! The closed set of decode failures.
//!
//! Decoding an entity fails atomically on the first detected violation, and
//! every violation is one of these kinds. Each kind carries a stable
//! identifier (for machine consumption, e.g. SMTP reply text or metrics
//! labels) and the citation of the RFC clause that governs it, as structured
//! metadata rather than embedded in the display text.

use thiserror::Error;

macro_rules! decode_errors {
    ($( $name:ident => ($rfc:expr, $msg:expr), )*) => {
        /// A violation detected while decoding an untrusted message.
        #[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Error {
            $( #[error($msg)] $name, )*
        }

        impl Error {
            /// The stable symbolic identifier of this error kind.
            pub fn id(self) -> &'static str {
                match self {
                    $( Error::$name => stringify!($name), )*
                }
            }

            /// The RFC clause governing this error kind.
            pub fn rfc(self) -> &'static str {
                match self {
                    $( Error::$name => $rfc, )*
                }
            }
        }
    };
}

decode_errors! {
    // Entity framing and size limits.
    HeadersLimit =>
        ("RFC 5322 2.2", "headers exceed the 256 KB search limit"),
    HeadersCrlf =>
        ("RFC 5322 3.5", "no blank line between headers and body"),

    // Folding and line length.
    LineLimit =>
        ("RFC 5322 2.1.1", "unfolded header line exceeds the length limit"),
    HeaderCr =>
        ("RFC 5322 2.2", "header contains a CR not followed by a LF"),
    HeaderCrlf =>
        ("RFC 5322 2.2", "header contains a CRLF not followed by WSP"),

    // Header field syntax.
    HeaderColonMissing =>
        ("RFC 5322 2.2", "header line has no colon after the field name"),
    HeaderCharactersForbidden =>
        ("RFC 5322 2.2", "header contains forbidden characters"),

    // Duplicated security-sensitive fields.
    MultipleContentDisposition =>
        ("RFC 5322 3.6", "multiple 'Content-Disposition' headers"),
    MultipleContentId =>
        ("RFC 5322 3.6", "multiple 'Content-ID' headers"),
    MultipleContentTransferEncoding =>
        ("RFC 5322 3.6", "multiple 'Content-Transfer-Encoding' headers"),
    MultipleContentType =>
        ("RFC 5322 3.6", "multiple 'Content-Type' headers"),
    MultipleDate =>
        ("RFC 5322 3.6", "multiple 'Date' headers"),
    MultipleFrom =>
        ("RFC 5322 3.6", "multiple 'From' headers"),
    MultipleInReplyTo =>
        ("RFC 5322 3.6", "multiple 'In-Reply-To' headers"),
    MultipleReferences =>
        ("RFC 5322 3.6", "multiple 'References' headers"),
    MultipleReplyTo =>
        ("RFC 5322 3.6", "multiple 'Reply-To' headers"),
    MultipleSender =>
        ("RFC 5322 3.6", "multiple 'Sender' headers"),
    MultipleSubject =>
        ("RFC 5322 3.6", "multiple 'Subject' headers"),

    // Structured header primitives.
    CommentUnterminated =>
        ("RFC 5322 3.2.2", "header comment is unterminated"),
    QuotedStringUnterminated =>
        ("RFC 5322 3.2.4", "header quoted-string is unterminated"),
    ParameterAttributeMissing =>
        ("RFC 2045 5.1", "header parameter has no attribute name"),
    ParameterValueMissing =>
        ("RFC 2045 5.1", "header parameter has no value"),
    ParameterMultipleBoundary =>
        ("RFC 2046 5.1.1", "multiple boundary parameters"),
    ParameterMultipleCharset =>
        ("RFC 2046 4.1.2", "multiple charset parameters"),
    ParameterMultipleFilename =>
        ("RFC 2183 2.3", "multiple filename parameters"),
    ParameterMultipleName =>
        ("RFC 2046 4.5.1", "multiple name parameters"),
    ContinuationDuplicate =>
        ("RFC 2231 3", "duplicate parameter continuation segment"),
    ContinuationLimit =>
        ("RFC 2231 3", "too many parameter continuation segments"),

    // Content-Type structure.
    ContentType =>
        ("RFC 2045 5.1", "invalid 'Content-Type' header syntax"),
    ContentTypeExternalBody =>
        ("RFC 2046 5.2.3", "'message/external-body' is not supported"),
    ContentTypePartial =>
        ("RFC 2046 5.2.2", "'message/partial' is not supported"),
    ContentTypeBoundaryMissing =>
        ("RFC 2045 5", "multipart media type without a boundary parameter"),

    // Content-Transfer-Encoding.
    ContentTransferEncodingUnrecognized =>
        ("RFC 2045 6.1", "unrecognized 'Content-Transfer-Encoding' mechanism"),

    // Charsets.
    CharsetIllegal =>
        ("RFC 2045 2.2", "illegal character sequence for the declared charset"),
    CharsetTruncated =>
        ("RFC 2045 2.2", "incomplete character sequence for the declared charset"),
    CharsetUnsupported =>
        ("RFC 2045 2.2", "unsupported character set"),

    // Base64, by context.
    Base64BodyIllegal =>
        ("RFC 2045 6.8", "base64 body contains illegal characters"),
    Base64BodyTruncated =>
        ("RFC 2045 6.8", "base64 body is truncated"),
    Base64WordIllegal =>
        ("RFC 2045 6.8", "base64 encoded-word contains illegal characters"),
    Base64WordTruncated =>
        ("RFC 2045 6.8", "base64 encoded-word is truncated"),

    // Quoted-printable, by context.
    QuotedPrintableBodyIllegal =>
        ("RFC 2045 6.7", "quoted-printable body contains illegal characters"),
    QuotedPrintableWordIllegal =>
        ("RFC 2045 6.7", "quoted-printable encoded-word contains illegal characters"),

    // Date.
    Date =>
        ("RFC 5322 3.3", "invalid 'Date' header syntax"),
    DateDay =>
        ("RFC 5322 3.3", "invalid 'Date' header day"),
    DateMonth =>
        ("RFC 5322 3.3", "invalid 'Date' header month"),
    DateHour =>
        ("RFC 5322 3.3", "invalid 'Date' header hour"),
    DateMinute =>
        ("RFC 5322 3.3", "invalid 'Date' header minute"),
    DateSecond =>
        ("RFC 5322 3.3", "invalid 'Date' header second"),
    DateZone =>
        ("RFC 5322 3.3", "invalid 'Date' header zone"),

    // Multipart.
    PartBoundaryMissing =>
        ("RFC 2046 5.1.1", "required multipart boundary parameter missing"),
    PartBoundaryEmpty =>
        ("RFC 2046 5.1.1", "empty multipart boundary parameter"),
    PartBoundaryWsp =>
        ("RFC 2046 5.1.1", "multipart boundary parameter ends with whitespace"),
    PartBoundaryLimit =>
        ("RFC 2046 5.1.1", "multipart boundary parameter exceeds 70 characters"),
    PartBoundaryCharactersForbidden =>
        ("RFC 2046 5.1.1", "multipart boundary parameter contains forbidden characters"),
    PartBoundaryFalsePositiveLimit =>
        ("RFC 2046", "too many false positive multipart boundaries"),
    PartLimit =>
        ("RFC 2046", "too many multipart parts"),
    PartMissing =>
        ("RFC 2046 5.1", "missing multipart boundary delimiter"),

    // Whole-message requirements.
    FromMissing =>
        ("RFC 5322 3.6", "required 'From' header missing"),
    SenderMissing =>
        ("RFC 5322 3.6.2", "multiple 'From' addresses without a 'Sender' header"),
    SenderMultipleAddresses =>
        ("RFC 5322 3.6.2", "multiple 'Sender' addresses"),
}
