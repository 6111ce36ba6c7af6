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

//! Address field decoding (From, To, Cc, Bcc, Sender, Reply-To).
//!
//! Address fields in the wild are too corrupt for a grammar: display
//! names appear on either side of the addr-spec, angle brackets go
//! missing, Outlook wraps names in single quotes. So instead of parsing
//! mailbox productions, each candidate address is split into tokens and
//! the token that looks most like an addr-spec is scored out; whatever
//! remains becomes the display name.

use crate::mime::encoded_word::decode_encoded_words;
use crate::mime::structured::{
    decode_quoted_strings, normalize_angle_brackets, remove_comments,
    separators, split_outside_quotes, unfold, Separators,
};
use crate::support::error::Error;

/// One decoded mailbox. Either part may be empty, but never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub name: String,
    pub email: String,
}

// ':' discards the run before it, which removes group display names
// ("undisclosed-recipients:;") while keeping the group's mailboxes.
const ADDRESS_SEPARATORS: Separators = separators(b",;", b":");

// WSP splits display-name words from a bracketless addr; angle brackets
// split tokens written without any WSP at all.
const TOKEN_SEPARATORS: Separators = separators(b"\t <>", b"");

/// Decodes an address field into its mailboxes. `None` (an absent field)
/// decodes to no mailboxes.
pub fn decode_header_addresses(
    source: Option<&[u8]>,
) -> Result<Vec<Address>, Error> {
    let source = match source {
        Some(source) => source,
        None => return Ok(Vec::new()),
    };
    let unfolded = unfold(source)?;
    let stripped = remove_comments(&unfolded)?;
    let candidates = split_outside_quotes(&stripped, &ADDRESS_SEPARATORS)?;
    let mut addresses = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(address) = decode_address(candidate)? {
            addresses.push(address);
        }
    }
    Ok(addresses)
}

fn decode_address(source: &[u8]) -> Result<Option<Address>, Error> {
    let normalized = normalize_angle_brackets(source);
    let mut parts = split_outside_quotes(&normalized, &TOKEN_SEPARATORS)?;
    if parts.is_empty() {
        return Ok(None);
    }
    // ICANN prohibits dotless domains, so the addr-spec is the token with
    // an '@' followed by a '.'. Ties prefer the rightmost token, where
    // the addr usually sits.
    let mut max = parts.len() - 1;
    let mut scores = vec![0u8; parts.len()];
    for (index, part) in parts.iter().enumerate() {
        if let Some(at) = part.iter().position(|&b| b == b'@') {
            let dot = part[at..].iter().position(|&b| b == b'.');
            if at >= 1 && dot.map(|dot| dot >= 2).unwrap_or(false) {
                scores[index] += 2;
                if scores[index] >= scores[max] {
                    max = index;
                }
            }
        }
    }
    let mut email = String::new();
    if scores[max] > 0 {
        email = clean_email(&decode_quoted_strings(parts[max])?);
        if email.find('@').map(|at| at > 0).unwrap_or(false) {
            parts.remove(max);
        } else {
            email.clear();
        }
    }
    // Runs of CFWS between tokens read as a single space (RFC 5322 3.2.2),
    // so the remaining tokens join with one space each.
    let mut name_bytes = Vec::new();
    for part in parts {
        let part = decode_quoted_strings(part)?;
        if !part.is_empty() {
            if !name_bytes.is_empty() {
                name_bytes.push(b' ');
            }
            name_bytes.extend_from_slice(&part);
        }
    }
    let decoded = decode_encoded_words(&name_bytes)?;
    let mut name = String::from_utf8_lossy(&decoded).into_owned();
    // Outlook wraps display names in single quotes.
    if name.len() >= 2 && name.starts_with('\'') && name.ends_with('\'') {
        name = name[1..name.len() - 1].trim().to_string();
    }
    if !name.is_empty() && name.chars().all(char::is_whitespace) {
        name.clear();
    }
    if name.is_empty() && email.is_empty() {
        log::debug!(
            "dropping empty address token {:?}",
            String::from_utf8_lossy(source)
        );
        return Ok(None);
    }
    // A lone punctuation character is CFWS debris, not a name.
    if email.is_empty()
        && name.chars().count() == 1
        && !name.chars().next().map(char::is_alphanumeric).unwrap_or(false)
    {
        log::debug!("dropping address debris {:?}", name);
        return Ok(None);
    }
    Ok(Some(Address { name, email }))
}

fn clean_email(source: &[u8]) -> String {
    let mut email: String = source
        .iter()
        .map(|&b| (b & 0x7f) as char)
        .filter(|c| !c.is_whitespace())
        .collect();
    email = email
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_string();
    while email.len() >= 2 && email.starts_with('\'') && email.ends_with('\'') {
        email = email[1..email.len() - 1].to_string();
    }
    email
}
