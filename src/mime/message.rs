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

//! The lazily decoding message facade.
//!
//! A [`Message`] wraps a raw byte buffer and decodes nothing until asked.
//! Each accessor decodes its field on first use, caches the result, and
//! returns it by reference thereafter, so inspecting one header of a
//! large message never touches the body.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};
use once_cell::unsync::OnceCell;

use crate::mime::address::{decode_header_addresses, Address};
use crate::mime::boundary::decode_parts;
use crate::mime::content_encoding::decode_body;
use crate::mime::entity::{decode_entity, decode_headers, HeaderMap};
use crate::mime::header::{
    decode_content_disposition, decode_content_transfer_encoding,
    decode_content_type, decode_date, decode_identifier, decode_identifiers,
    decode_unstructured, ContentTransferEncoding,
};
use crate::mime::structured::HeaderValueParameters;
use crate::support::buffer::RawMessage;
use crate::support::error::Error;

/// One MIME entity: a whole message, or one part of a multipart body.
pub struct Message {
    buffer: RawMessage,
    entity: OnceCell<(RawMessage, RawMessage)>,
    headers: OnceCell<HeaderMap>,
    content_disposition: OnceCell<HeaderValueParameters>,
    content_id: OnceCell<Option<String>>,
    content_transfer_encoding: OnceCell<ContentTransferEncoding>,
    content_type: OnceCell<HeaderValueParameters>,
    date: OnceCell<Option<DateTime<FixedOffset>>>,
    filename: OnceCell<Option<String>>,
    from: OnceCell<Vec<Address>>,
    in_reply_to: OnceCell<Vec<String>>,
    message_id: OnceCell<Option<String>>,
    references: OnceCell<Vec<String>>,
    reply_to: OnceCell<Vec<Address>>,
    sender: OnceCell<Vec<Address>>,
    subject: OnceCell<String>,
    to: OnceCell<Vec<Address>>,
    cc: OnceCell<Vec<Address>>,
    bcc: OnceCell<Vec<Address>>,
    body: OnceCell<RawMessage>,
    parts: OnceCell<Vec<Message>>,
}

impl Message {
    pub fn new(buffer: RawMessage) -> Self {
        Message {
            buffer,
            entity: OnceCell::new(),
            headers: OnceCell::new(),
            content_disposition: OnceCell::new(),
            content_id: OnceCell::new(),
            content_transfer_encoding: OnceCell::new(),
            content_type: OnceCell::new(),
            date: OnceCell::new(),
            filename: OnceCell::new(),
            from: OnceCell::new(),
            in_reply_to: OnceCell::new(),
            message_id: OnceCell::new(),
            references: OnceCell::new(),
            reply_to: OnceCell::new(),
            sender: OnceCell::new(),
            subject: OnceCell::new(),
            to: OnceCell::new(),
            cc: OnceCell::new(),
            bcc: OnceCell::new(),
            body: OnceCell::new(),
            parts: OnceCell::new(),
        }
    }

    /// The raw bytes this entity was constructed from.
    pub fn buffer(&self) -> &RawMessage {
        &self.buffer
    }

    /// The `(headers, body)` halves of the entity, both still raw.
    pub fn entity(&self) -> Result<&(RawMessage, RawMessage), Error> {
        self.entity.get_or_try_init(|| decode_entity(&self.buffer))
    }

    /// The raw header fields, keyed by lowercased name.
    pub fn headers(&self) -> Result<&HeaderMap, Error> {
        self.headers
            .get_or_try_init(|| decode_headers(&self.entity()?.0))
    }

    pub fn content_disposition(
        &self,
    ) -> Result<&HeaderValueParameters, Error> {
        self.content_disposition.get_or_try_init(|| {
            decode_content_disposition(self.first("content-disposition")?)
        })
    }

    pub fn content_id(&self) -> Result<Option<&str>, Error> {
        self.content_id
            .get_or_try_init(|| decode_identifier(self.first("content-id")?))
            .map(|id| id.as_deref())
    }

    pub fn content_transfer_encoding(
        &self,
    ) -> Result<ContentTransferEncoding, Error> {
        self.content_transfer_encoding
            .get_or_try_init(|| {
                decode_content_transfer_encoding(
                    self.first("content-transfer-encoding")?,
                )
            })
            .map(|&encoding| encoding)
    }

    pub fn content_type(&self) -> Result<&HeaderValueParameters, Error> {
        self.content_type.get_or_try_init(|| {
            decode_content_type(self.first("content-type")?)
        })
    }

    pub fn date(&self) -> Result<Option<DateTime<FixedOffset>>, Error> {
        self.date
            .get_or_try_init(|| decode_date(self.first("date")?))
            .map(|&date| date)
    }

    /// The suggested attachment filename: the Content-Disposition
    /// `filename` parameter, or failing that the deprecated Content-Type
    /// `name` parameter. Any directory path is stripped (RFC 2183 2.3
    /// forbids respecting one).
    pub fn filename(&self) -> Result<Option<&str>, Error> {
        let filename = self.filename.get_or_try_init(|| {
            let filename = match self.content_disposition()?.parameter("filename")
            {
                Some(filename) => Some(filename),
                None => self.content_type()?.parameter("name"),
            };
            Ok::<_, Error>(filename.map(|filename| {
                let terminal = match filename.rfind(|c| c == '/' || c == '\\')
                {
                    Some(slash) => &filename[slash + 1..],
                    None => filename,
                };
                terminal.trim().to_string()
            }))
        })?;
        Ok(filename.as_deref())
    }

    /// The originator addresses. From is the one required address field:
    /// an empty or absent From is an error, and more than one From
    /// address without a Sender is an error (RFC 5322 3.6.2).
    pub fn from(&self) -> Result<&[Address], Error> {
        let from = self.from.get_or_try_init(|| {
            let joined = self.joined("from")?;
            let from = decode_header_addresses(joined.as_deref())?;
            if from.is_empty() {
                return Err(Error::FromMissing);
            }
            Ok(from)
        })?;
        if from.len() > 1 && self.sender()?.is_none() {
            return Err(Error::SenderMissing);
        }
        Ok(from)
    }

    pub fn in_reply_to(&self) -> Result<&[String], Error> {
        self.in_reply_to
            .get_or_try_init(|| {
                decode_identifiers(self.first("in-reply-to")?)
            })
            .map(Vec::as_slice)
    }

    pub fn message_id(&self) -> Result<Option<&str>, Error> {
        self.message_id
            .get_or_try_init(|| decode_identifier(self.first("message-id")?))
            .map(|id| id.as_deref())
    }

    pub fn references(&self) -> Result<&[String], Error> {
        self.references
            .get_or_try_init(|| decode_identifiers(self.first("references")?))
            .map(Vec::as_slice)
    }

    pub fn reply_to(&self) -> Result<&[Address], Error> {
        self.reply_to
            .get_or_try_init(|| {
                let joined = self.joined("reply-to")?;
                decode_header_addresses(joined.as_deref())
            })
            .map(Vec::as_slice)
    }

    /// The Sender address, which must be a single mailbox when present.
    pub fn sender(&self) -> Result<Option<&Address>, Error> {
        let sender = self.sender.get_or_try_init(|| {
            let joined = self.joined("sender")?;
            let sender = decode_header_addresses(joined.as_deref())?;
            if sender.len() > 1 {
                return Err(Error::SenderMultipleAddresses);
            }
            Ok(sender)
        })?;
        Ok(sender.first())
    }

    pub fn subject(&self) -> Result<&str, Error> {
        self.subject
            .get_or_try_init(|| decode_unstructured(self.first("subject")?))
            .map(String::as_str)
    }

    pub fn to(&self) -> Result<&[Address], Error> {
        self.to
            .get_or_try_init(|| {
                let joined = self.joined("to")?;
                decode_header_addresses(joined.as_deref())
            })
            .map(Vec::as_slice)
    }

    pub fn cc(&self) -> Result<&[Address], Error> {
        self.cc
            .get_or_try_init(|| {
                let joined = self.joined("cc")?;
                decode_header_addresses(joined.as_deref())
            })
            .map(Vec::as_slice)
    }

    pub fn bcc(&self) -> Result<&[Address], Error> {
        self.bcc
            .get_or_try_init(|| {
                let joined = self.joined("bcc")?;
                decode_header_addresses(joined.as_deref())
            })
            .map(Vec::as_slice)
    }

    /// The body, transfer decoded and charset converted.
    pub fn body(&self) -> Result<&RawMessage, Error> {
        self.body.get_or_try_init(|| {
            let raw = &self.entity()?.1;
            let content_type = self.content_type()?;
            let encoding = self.content_transfer_encoding()?;
            match decode_body(raw.as_bytes(), content_type, encoding)? {
                // Untouched by both stages, so the entity slice itself is
                // the decoded body.
                Cow::Borrowed(_) => Ok(raw.clone()),
                Cow::Owned(decoded) => Ok(RawMessage::new(decoded)),
            }
        })
    }

    /// The child entities of a multipart body, each a [`Message`] in its
    /// own right. Any other media type has no parts.
    pub fn parts(&self) -> Result<&[Message], Error> {
        self.parts
            .get_or_try_init(|| {
                let content_type = self.content_type()?;
                if !content_type.value.starts_with("multipart/") {
                    return Ok(Vec::new());
                }
                let body = self.body()?;
                let parts =
                    decode_parts(body, content_type.parameter("boundary"))?;
                Ok(parts.into_iter().map(Message::new).collect())
            })
            .map(Vec::as_slice)
    }

    fn first(&self, name: &str) -> Result<Option<&[u8]>, Error> {
        Ok(self
            .headers()?
            .first(name)
            .map(|header| header.as_bytes()))
    }

    // Repeated address fields concatenate their address lists
    // (RFC 5322 4.5.3), so they decode from the joined instances.
    fn joined(&self, name: &str) -> Result<Option<RawMessage>, Error> {
        Ok(self.headers()?.joined(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Not `From<Vec<u8>>`: the inherent `from` accessor would shadow a
    // `Message::from` constructor at every call site.
    fn decode(data: &[u8]) -> Message {
        Message::new(RawMessage::new(data.to_vec()))
    }

    const SIMPLE: &[u8] = b"From: Alice <a@b.c>\r\n\
        To: d@e.f\r\n\
        Subject: =?UTF-8?Q?greetings?=\r\n\
        Message-ID: <id-1@b.c>\r\n\
        Date: Fri, 13 Oct 2017 09:08:14 -0400\r\n\
        Content-Type: text/plain; charset=ISO-8859-1\r\n\
        Content-Transfer-Encoding: quoted-printable\r\n\
        \r\n\
        caf=E9\r\n";

    #[test]
    fn decodes_headers_on_demand() {
        let message = decode(SIMPLE);
        assert_eq!("greetings", message.subject().unwrap());
        assert_eq!(Some("id-1@b.c"), message.message_id().unwrap());
        assert_eq!("a@b.c", message.from().unwrap()[0].email);
        assert_eq!("Alice", message.from().unwrap()[0].name);
        assert_eq!("d@e.f", message.to().unwrap()[0].email);
        assert!(message.date().unwrap().is_some());
        assert_eq!(
            ContentTransferEncoding::QuotedPrintable,
            message.content_transfer_encoding().unwrap()
        );
    }

    #[test]
    fn body_is_transfer_decoded_and_converted() {
        let message = decode(SIMPLE);
        assert_eq!(
            "caf\u{e9}\r\n".as_bytes(),
            message.body().unwrap().as_bytes()
        );
    }

    #[test]
    fn identity_body_shares_the_buffer() {
        let message = decode(b"From: a@b.c\r\n\r\nplain body\r\n");
        assert_eq!(b"plain body\r\n", message.body().unwrap().as_bytes());
    }

    #[test]
    fn from_is_required() {
        let message = decode(b"To: d@e.f\r\n\r\nbody\r\n");
        assert_matches!(Err(Error::FromMissing), message.from());
    }

    #[test]
    fn multiple_from_requires_sender() {
        let message = decode(b"From: a@b.c, d@e.f\r\n\r\nbody\r\n");
        assert_matches!(Err(Error::SenderMissing), message.from());
        let message =
            decode(b"From: a@b.c, d@e.f\r\nSender: a@b.c\r\n\r\nbody\r\n");
        assert_eq!(2, message.from().unwrap().len());
    }

    #[test]
    fn sender_must_be_a_single_mailbox() {
        let message =
            decode(b"From: a@b.c\r\nSender: a@b.c, d@e.f\r\n\r\nbody\r\n");
        assert_matches!(
            Err(Error::SenderMultipleAddresses),
            message.sender()
        );
    }

    #[test]
    fn filename_prefers_disposition_and_strips_paths() {
        let message = decode(
            b"From: a@b.c\r\n\
            Content-Type: application/pdf; name=fallback.pdf\r\n\
            Content-Disposition: attachment; filename=\"..\\\\evil\\\\x.pdf\"\r\n\
            \r\n\
            body\r\n",
        );
        assert_eq!(Some("x.pdf"), message.filename().unwrap());
        let message = decode(
            b"From: a@b.c\r\n\
            Content-Type: application/pdf; name=report.pdf\r\n\
            \r\n\
            body\r\n",
        );
        assert_eq!(Some("report.pdf"), message.filename().unwrap());
        let message = decode(b"From: a@b.c\r\n\r\nbody\r\n");
        assert_eq!(None, message.filename().unwrap());
    }

    #[test]
    fn multipart_parts_are_messages() {
        let message = decode(
            b"From: a@b.c\r\n\
            Content-Type: multipart/mixed; boundary=b\r\n\
            \r\n\
            --b\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            first\r\n\
            --b\r\n\
            Content-Type: text/html\r\n\
            \r\n\
            <p>second</p>\r\n\
            --b--\r\n",
        );
        let parts = message.parts().unwrap();
        assert_eq!(2, parts.len());
        assert_eq!(b"first", parts[0].body().unwrap().as_bytes());
        assert_eq!("text/html", parts[1].content_type().unwrap().value);
    }

    #[test]
    fn non_multipart_has_no_parts() {
        let message = decode(b"From: a@b.c\r\n\r\nbody\r\n");
        assert!(message.parts().unwrap().is_empty());
    }

    #[test]
    fn repeated_to_fields_concatenate() {
        let message =
            decode(b"From: a@b.c\r\nTo: d@e.f\r\nTo: g@h.i\r\n\r\nbody\r\n");
        let to = message.to().unwrap();
        assert_eq!(2, to.len());
        assert_eq!("g@h.i", to[1].email);
    }

    #[test]
    fn errors_are_sticky_only_per_accessor() {
        // A bad Date does not stop address decoding.
        let message = decode(
            b"From: a@b.c\r\nDate: not a date\r\n\r\nbody\r\n",
        );
        assert_matches!(Err(Error::Date), message.date());
        assert_eq!("a@b.c", message.from().unwrap()[0].email);
    }
}
