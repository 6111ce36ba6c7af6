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

//! Defensive decoding of untrusted RFC 5322 / MIME byte streams.
//!
//! The entry point is [`mime::message::Message`], which wraps a raw buffer
//! and lazily derives headers, structured fields, the decoded body, and
//! multipart children. All decoding is synchronous and pure; the only
//! defenses against adversarial cost are fixed iteration bounds, so callers
//! that need a hard ceiling should impose a wall-clock budget around the
//! whole decode.
//!
//! Reference specifications: RFC 5322 (message format), RFC 2045/2046
//! (MIME structure and media types), RFC 2047 (encoded words), RFC 2183
//! (Content-Disposition), RFC 2231 (parameter continuations), RFC 7103
//! (advice for handling malformed messages).

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod mime;
pub mod support;

pub use crate::mime::address::Address;
pub use crate::mime::message::Message;
pub use crate::support::buffer::RawMessage;
pub use crate::support::error::Error;
