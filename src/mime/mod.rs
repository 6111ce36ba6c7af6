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

//! Decoding of RFC 5322 messages and their MIME structure.
//!
//! The layers build bottom-up: `grammar` classifies bytes, `structured`
//! handles the shared lexical machinery (unfolding, comments, quoted
//! strings, parameters), the codec modules (`charset`,
//! `quoted_printable`, `content_encoding`, `encoded_word`) undo the
//! various encodings, `entity`/`header`/`address`/`boundary` decode
//! structure, and `message` ties everything into the lazy facade.

pub mod address;
pub mod boundary;
pub mod charset;
pub mod content_encoding;
pub mod encoded_word;
pub mod entity;
pub mod grammar;
pub mod header;
pub mod message;
pub mod quoted_printable;
pub mod received;
pub mod structured;
