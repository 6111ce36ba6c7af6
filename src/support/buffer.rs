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

//! The immutable byte buffer underlying every message and message part.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

/// An immutable, reference-counted byte buffer, or a view of one.
///
/// The raw message is the sole source of truth for everything the decoder
/// derives; it is never mutated in place. Slicing is cheap and shares the
/// underlying allocation, so the header block, the body block, and every
/// multipart part are views of the buffer they were cut from rather than
/// copies.
#[derive(Clone, PartialEq, Eq)]
pub struct RawMessage {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl RawMessage {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let end = data.len();
        RawMessage {
            data,
            start: 0,
            end,
        }
    }

    /// Returns a view of `range` within this view.
    ///
    /// `range` is relative to this view, not to the underlying allocation.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && self.start + range.end <= self.end);
        RawMessage {
            data: Arc::clone(&self.data),
            start: self.start + range.start,
            end: self.start + range.end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

impl Deref for RawMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for RawMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<&[u8]> for RawMessage {
    fn from(data: &[u8]) -> Self {
        RawMessage::new(data.to_vec())
    }
}

impl From<Vec<u8>> for RawMessage {
    fn from(data: Vec<u8>) -> Self {
        RawMessage::new(data)
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RawMessage({:?})",
            String::from_utf8_lossy(self.as_bytes())
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slicing_is_relative_and_shared() {
        let buffer = RawMessage::new(b"hello world".to_vec());
        let world = buffer.slice(6..11);
        assert_eq!(b"world", world.as_bytes());
        let orl = world.slice(1..4);
        assert_eq!(b"orl", orl.as_bytes());
        assert_eq!(3, orl.len());
        assert!(!orl.is_empty());
        assert!(buffer.slice(0..0).is_empty());
    }

    #[test]
    #[should_panic]
    fn slice_out_of_bounds_panics() {
        let buffer = RawMessage::new(b"abc".to_vec());
        let _ = buffer.slice(1..2).slice(0..3);
    }
}
