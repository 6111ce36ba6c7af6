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

//! Encoding the Received trace field a relay prepends when it accepts a
//! message (RFC 5321 4.4). This is the one header a gateway writes
//! rather than reads, so the clause grammar is enforced strictly on the
//! way out.

use std::net::IpAddr;

use chrono::{DateTime, FixedOffset};
use thiserror::Error as ThisError;

use crate::mime::grammar::{is_atom, is_domain, is_mailbox, is_msg_id, is_path};

/// The RFC 3848 transmission types, plus the base SMTP and LMTP types
/// from the IANA "WITH protocol types" registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Esmtp,
    Esmtps,
    Esmtpsa,
    Http,
    Lmtp,
    Lmtpa,
    Lmtps,
    Lmtpsa,
    Smtp,
}

impl Protocol {
    fn name(self) -> &'static str {
        match self {
            Protocol::Esmtp => "ESMTP",
            Protocol::Esmtps => "ESMTPS",
            Protocol::Esmtpsa => "ESMTPSA",
            Protocol::Http => "HTTP",
            Protocol::Lmtp => "LMTP",
            Protocol::Lmtpa => "LMTPA",
            Protocol::Lmtps => "LMTPS",
            Protocol::Lmtpsa => "LMTPSA",
            Protocol::Smtp => "SMTP",
        }
    }

    // The SMTP family requires the From-domain clause; the submission
    // protocols do not.
    fn smtp(self) -> bool {
        matches!(
            self,
            Protocol::Esmtp
                | Protocol::Esmtps
                | Protocol::Esmtpsa
                | Protocol::Smtp
        )
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ReceivedError {
    #[error("From-domain must be a valid domain")]
    FromDomain,
    #[error("By-domain must be a valid domain")]
    ByDomain,
    #[error("Via must be a valid atom")]
    Via,
    #[error("ID must be a valid atom or msg-id")]
    Id,
    #[error("For recipient must be a valid path or mailbox")]
    Recipient,
    #[error("From-domain must be provided with TCP-info or over SMTP")]
    FromMissing,
}

/// One relay hop. `by` and `timestamp` are the only required pieces;
/// `from` becomes required when `ip` is given or the protocol is in the
/// SMTP family.
#[derive(Clone, Debug)]
pub struct Received {
    pub from: Option<String>,
    pub ip: Option<IpAddr>,
    pub by: String,
    pub via: Option<String>,
    pub protocol: Option<Protocol>,
    pub id: Option<String>,
    pub recipient: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}

impl Received {
    pub fn new(by: String, timestamp: DateTime<FixedOffset>) -> Self {
        Received {
            from: None,
            ip: None,
            by,
            via: None,
            protocol: None,
            id: None,
            recipient: None,
            timestamp,
        }
    }

    fn validate(&self) -> Result<(), ReceivedError> {
        if let Some(from) = &self.from {
            if !is_domain(from.as_bytes()) {
                return Err(ReceivedError::FromDomain);
            }
        }
        if !is_domain(self.by.as_bytes()) {
            return Err(ReceivedError::ByDomain);
        }
        if let Some(via) = &self.via {
            if !is_atom(via.as_bytes()) {
                return Err(ReceivedError::Via);
            }
        }
        if let Some(id) = &self.id {
            // RFC 5322 allows word / angle-addr / addr-spec / domain here
            // but defers to the stricter RFC 5321 grammar, so encoding
            // follows RFC 5321.
            if !is_atom(id.as_bytes()) && !is_msg_id(id.as_bytes()) {
                return Err(ReceivedError::Id);
            }
        }
        if self.from.is_none()
            && (self.ip.is_some()
                || self.protocol.map(Protocol::smtp).unwrap_or(false))
        {
            return Err(ReceivedError::FromMissing);
        }
        if let Some(recipient) = &self.recipient {
            if !is_path(recipient.as_bytes())
                && !is_mailbox(recipient.as_bytes())
            {
                return Err(ReceivedError::Recipient);
            }
        }
        Ok(())
    }

    /// Encodes the complete header, folded at 78 columns, with the
    /// terminating CRLF.
    pub fn encode(&self) -> Result<Vec<u8>, ReceivedError> {
        self.validate()?;
        let mut stamp: Vec<String> = Vec::new();
        if let Some(from) = &self.from {
            stamp.push("from".to_string());
            stamp.push(from.clone());
            if let Some(ip) = self.ip {
                stamp.push(format!("({} [{}])", from, ip));
            }
        }
        stamp.push("by".to_string());
        stamp.push(self.by.clone());
        if let Some(via) = &self.via {
            stamp.push("via".to_string());
            stamp.push(via.clone());
        }
        if let Some(protocol) = self.protocol {
            stamp.push("with".to_string());
            stamp.push(protocol.name().to_string());
        }
        if let Some(id) = &self.id {
            stamp.push("id".to_string());
            stamp.push(id.clone());
        }
        if let Some(recipient) = &self.recipient {
            stamp.push("for".to_string());
            stamp.push(recipient.clone());
        }
        // The date-time is set off from the clauses by a ';' on the last
        // clause (RFC 5322 3.6.7).
        if let Some(last) = stamp.last_mut() {
            last.push(';');
        }
        stamp.push(
            self.timestamp
                .format("%a, %d %b %Y %H:%M:%S %z")
                .to_string(),
        );
        let mut lines = String::from("Received:");
        let mut line_length = lines.len();
        for clause in &stamp {
            if line_length + 1 + clause.len() > 78 {
                lines.push_str("\r\n");
                line_length = 0;
            }
            lines.push(' ');
            lines.push_str(clause);
            line_length += 1 + clause.len();
        }
        lines.push_str("\r\n");
        Ok(lines.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    fn timestamp() -> DateTime<FixedOffset> {
        FixedOffset::west(4 * 3600)
            .ymd(2017, 10, 13)
            .and_hms(9, 8, 14)
    }

    #[test]
    fn encodes_a_full_stamp() {
        let mut received =
            Received::new("mx.example.com".to_string(), timestamp());
        received.from = Some("mail.sender.com".to_string());
        received.ip = Some("192.0.2.1".parse().unwrap());
        received.protocol = Some(Protocol::Esmtps);
        received.id = Some("ABC123".to_string());
        received.recipient = Some("user@example.com".to_string());
        let encoded = String::from_utf8(received.encode().unwrap()).unwrap();
        assert_eq!(
            "Received: from mail.sender.com (mail.sender.com [192.0.2.1]) \
             by mx.example.com\r\n with ESMTPS id ABC123 for \
             user@example.com; Fri, 13 Oct 2017 09:08:14 -0400\r\n",
            encoded
        );
    }

    #[test]
    fn encodes_a_minimal_stamp() {
        let received = Received::new("mx.example.com".to_string(), timestamp());
        let encoded = String::from_utf8(received.encode().unwrap()).unwrap();
        assert_eq!(
            "Received: by mx.example.com; Fri, 13 Oct 2017 09:08:14 -0400\r\n",
            encoded
        );
    }

    #[test]
    fn clauses_are_validated() {
        let mut received = Received::new("not a domain".to_string(), timestamp());
        assert_eq!(Err(ReceivedError::ByDomain), received.encode());
        received.by = "mx.example.com".to_string();
        received.from = Some("bad domain".to_string());
        assert_eq!(Err(ReceivedError::FromDomain), received.encode());
        received.from = None;
        received.via = Some("a b".to_string());
        assert_eq!(Err(ReceivedError::Via), received.encode());
        received.via = None;
        received.id = Some("a b".to_string());
        assert_eq!(Err(ReceivedError::Id), received.encode());
        received.id = None;
        received.recipient = Some("not a mailbox".to_string());
        assert_eq!(Err(ReceivedError::Recipient), received.encode());
    }

    #[test]
    fn smtp_and_tcp_info_require_a_from_domain() {
        let mut received = Received::new("mx.example.com".to_string(), timestamp());
        received.ip = Some("192.0.2.1".parse().unwrap());
        assert_eq!(Err(ReceivedError::FromMissing), received.encode());
        received.ip = None;
        received.protocol = Some(Protocol::Smtp);
        assert_eq!(Err(ReceivedError::FromMissing), received.encode());
        // LMTP is local delivery; no From-domain required.
        received.protocol = Some(Protocol::Lmtp);
        assert!(received.encode().is_ok());
    }

    #[test]
    fn long_stamps_fold_below_the_line_limit() {
        let mut received = Received::new(
            "a-rather-long-receiving-host.example.com".to_string(),
            timestamp(),
        );
        received.from =
            Some("an-equally-long-sending-host.example.com".to_string());
        received.ip = Some("2001:db8::1".parse().unwrap());
        received.protocol = Some(Protocol::Esmtpsa);
        received.recipient = Some("someone@example.com".to_string());
        let encoded = String::from_utf8(received.encode().unwrap()).unwrap();
        for line in encoded.lines() {
            assert!(line.len() <= 79, "line too long: {:?}", line);
        }
        assert!(encoded.ends_with("-0400\r\n"));
    }
}
