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

//! RFC 5322 grammar fragments as byte classification tables and whole-slice
//! validators.
//!
//! These are shared between the decode engine and the `Received` header
//! encoder. The validators accept a complete candidate slice; none of them
//! consume a prefix.

use crate::mime::structured::index_outside_quotes;

// RFC 5322 3.2.3 Atom
// atext = ALPHA / DIGIT / "!" / "#" / "$" / "%" / "&" / "'" / "*" / "+" /
//         "-" / "/" / "=" / "?" / "^" / "_" / "`" / "{" / "|" / "}" / "~"
pub const ATEXT: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0usize;
    while i < 256 {
        let b = i as u8;
        table[i] = b.is_ascii_alphanumeric();
        i += 1;
    }
    let symbols = b"!#$%&'*+-/=?^_`{|}~";
    let mut i = 0;
    while i < symbols.len() {
        table[symbols[i] as usize] = true;
        i += 1;
    }
    table
};

// RFC 5322 3.4.1 Addr-Spec Specification
// dtext = %d33-90 / %d94-126 ; excludes "[", "]", "\"
pub const DTEXT: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 33usize;
    while i <= 90 {
        table[i] = true;
        i += 1;
    }
    let mut i = 94usize;
    while i <= 126 {
        table[i] = true;
        i += 1;
    }
    table
};

// RFC 5322 3.2.4 Quoted Strings
// qtext = %d33 / %d35-91 / %d93-126 ; excludes "\" and DQUOTE
pub const QTEXT: [bool; 256] = {
    let mut table = [false; 256];
    table[33] = true;
    let mut i = 35usize;
    while i <= 91 {
        table[i] = true;
        i += 1;
    }
    let mut i = 93usize;
    while i <= 126 {
        table[i] = true;
        i += 1;
    }
    table
};

// RFC 5322 3.2.2: the characters that can participate in folding white
// space. CR and LF are included because unfolding happens separately.
pub const FWS: [bool; 256] = {
    let mut table = [false; 256];
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table[b' ' as usize] = true;
    table
};

pub fn is_fws_byte(b: u8) -> bool {
    FWS[b as usize]
}

/// RFC 5322 3.2.3: `1*atext`.
pub fn is_atom(source: &[u8]) -> bool {
    !source.is_empty() && source.iter().all(|&b| ATEXT[b as usize])
}

/// RFC 5322 3.2.3: `dot-atom-text = 1*atext *("." 1*atext)`.
pub fn is_dot_atom(source: &[u8]) -> bool {
    if source.is_empty() {
        return false;
    }
    for (index, &b) in source.iter().enumerate() {
        if !ATEXT[b as usize] {
            if b != b'.' {
                return false;
            }
            // A dot must sit between atext; no leading, trailing, or
            // consecutive dots.
            if index == 0
                || index + 1 >= source.len()
                || source[index - 1] == b'.'
                || source[index + 1] == b'.'
            {
                return false;
            }
        }
    }
    true
}

pub fn is_dtext(source: &[u8]) -> bool {
    !source.is_empty() && source.iter().all(|&b| DTEXT[b as usize])
}

pub fn is_qtext(source: &[u8]) -> bool {
    !source.is_empty() && source.iter().all(|&b| QTEXT[b as usize])
}

/// RFC 5322 3.2.1: `quoted-pair = "\" (VCHAR / WSP)`.
pub fn is_quoted_pair(source: &[u8]) -> bool {
    source.len() == 2
        && source[0] == b'\\'
        && (source[1] == b'\t'
            || source[1] == b' '
            || (33..=126).contains(&source[1]))
}

/// RFC 5322 3.2.4: `qcontent = qtext / quoted-pair`, with FWS admitted
/// since a quoted-string interleaves `[FWS] qcontent`.
pub fn is_qcontent(source: &[u8]) -> bool {
    if source.is_empty() {
        return false;
    }
    let mut index = 0;
    while index < source.len() {
        if !QTEXT[source[index] as usize] && !FWS[source[index] as usize] {
            let end = (index + 2).min(source.len());
            if !is_quoted_pair(&source[index..end]) {
                return false;
            }
            index += 1;
        }
        index += 1;
    }
    true
}

/// RFC 5322 3.2.4: `DQUOTE *([FWS] qcontent) [FWS] DQUOTE`.
pub fn is_quoted_string(source: &[u8]) -> bool {
    if source.len() < 2 {
        return false;
    }
    if source[0] != b'"' || source[source.len() - 1] != b'"' {
        return false;
    }
    source.len() == 2 || is_qcontent(&source[1..source.len() - 1])
}

/// RFC 5322 3.2.5: `phrase = 1*word`, restricted to a single word.
pub fn is_phrase(source: &[u8]) -> bool {
    is_atom(source) || is_quoted_string(source)
}

/// RFC 5322 3.4.1: `domain = dot-atom / domain-literal`.
pub fn is_domain(source: &[u8]) -> bool {
    is_dot_atom(source) || is_domain_literal(source)
}

/// RFC 5322 3.4.1: `domain-literal = [CFWS] "[" *([FWS] dtext) [FWS] "]"`.
///
/// Valid IPv4/IPv6 address syntax is deliberately not enforced here.
pub fn is_domain_literal(source: &[u8]) -> bool {
    if source.len() < 2 {
        return false;
    }
    if source[0] != b'[' || source[source.len() - 1] != b']' {
        return false;
    }
    source[1..source.len() - 1]
        .iter()
        .all(|&b| DTEXT[b as usize] || FWS[b as usize])
}

/// RFC 5322 3.4.1: `local-part = dot-atom / quoted-string`.
pub fn is_local_part(source: &[u8]) -> bool {
    is_dot_atom(source) || is_quoted_string(source)
}

/// RFC 5322 3.4.1: `addr-spec = local-part "@" domain`.
pub fn is_addr_spec(source: &[u8]) -> bool {
    match index_outside_quotes(source, b'@') {
        Some(at) => {
            is_local_part(&source[..at]) && is_domain(&source[at + 1..])
        },
        None => false,
    }
}

/// RFC 5322 3.4: `angle-addr = "<" addr-spec ">"`.
pub fn is_angle_addr(source: &[u8]) -> bool {
    source.len() >= 2
        && source[0] == b'<'
        && source[source.len() - 1] == b'>'
        && is_addr_spec(&source[1..source.len() - 1])
}

/// RFC 5322 3.4: `name-addr = [display-name] angle-addr`.
pub fn is_name_addr(source: &[u8]) -> bool {
    let open = match index_outside_quotes(source, b'<') {
        Some(open) => open,
        None => return false,
    };
    if !is_angle_addr(&source[open..]) {
        return false;
    }
    if open == 0 {
        return true;
    }
    let mut end = open;
    while end > 0 && FWS[source[end - 1] as usize] {
        end -= 1;
    }
    is_phrase(&source[..end])
}

/// RFC 5322 3.4: `mailbox = name-addr / addr-spec`.
pub fn is_mailbox(source: &[u8]) -> bool {
    is_name_addr(source) || is_addr_spec(source)
}

/// RFC 5322 3.6.4: `no-fold-literal = "[" *dtext "]"`.
pub fn is_no_fold_literal(source: &[u8]) -> bool {
    if source.len() < 2 {
        return false;
    }
    if source[0] != b'[' || source[source.len() - 1] != b']' {
        return false;
    }
    source.len() == 2 || is_dtext(&source[1..source.len() - 1])
}

/// RFC 5322 3.6.4: `msg-id = "<" id-left "@" id-right ">"`.
pub fn is_msg_id(source: &[u8]) -> bool {
    if source.len() < 2 {
        return false;
    }
    if source[0] != b'<' || source[source.len() - 1] != b'>' {
        return false;
    }
    let inner = &source[1..source.len() - 1];
    let at = match inner.iter().position(|&b| b == b'@') {
        Some(at) => at,
        None => return false,
    };
    if at == 0 || at == inner.len() - 1 {
        return false;
    }
    is_dot_atom(&inner[..at])
        && (is_dot_atom(&inner[at + 1..]) || is_no_fold_literal(&inner[at + 1..]))
}

/// RFC 5322 3.6.7: `path = angle-addr / ([CFWS] "<" [CFWS] ">" [CFWS])`.
pub fn is_path(source: &[u8]) -> bool {
    is_angle_addr(source) || source == b"<>"
}
