// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;

use bytes::Bytes;

use crate::store::Weigh;

/// An immutable view over a byte payload; the cache's value type.
///
/// A `ByteView` can never be written through: the payload either arrives by ownership
/// transfer (so no writer can alias it) or is defensively copied on the way in, and it
/// leaves only as a fresh copy via [`to_vec`](Self::to_vec). Cloning is cheap; clones
/// share the underlying buffer.
///
/// # Examples
///
/// ```
/// use hoard::ByteView;
///
/// let view = ByteView::copied_from_slice(b"630");
/// assert_eq!(view.len(), 3);
/// assert_eq!(view.to_vec(), b"630");
/// assert_eq!(view.to_string(), "630");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteView {
    payload: Bytes,
}

impl ByteView {
    /// Creates a view by copying a borrowed slice.
    ///
    /// Use this for buffers the caller retains; the view never aliases its input.
    #[must_use]
    pub fn copied_from_slice(payload: &[u8]) -> Self {
        Self {
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns a copy of the payload.
    ///
    /// The copy is the caller's to mutate; the cached payload is unaffected.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.payload.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    /// Takes ownership of the buffer; no copy is made because an owned buffer cannot
    /// be written through by anyone else.
    fn from(payload: Vec<u8>) -> Self {
        Self {
            payload: Bytes::from(payload),
        }
    }
}

impl From<Bytes> for ByteView {
    fn from(payload: Bytes) -> Self {
        Self { payload }
    }
}

/// Renders the payload as lossy UTF-8.
impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.payload))
    }
}

impl Weigh for ByteView {
    fn weight(&self) -> u64 {
        self.payload.len() as u64
    }
}
