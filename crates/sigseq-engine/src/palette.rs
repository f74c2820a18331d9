//! Item palette dimensions and item references.
//!
//! The engine never owns palette contents; the host provides an ordered list
//! of opaque items and the engine only needs its length. Index 0 is reserved
//! for the hum (silence/home) item, indices 1..=N for content items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensions of the host's item palette.
///
/// `total` counts the hum item plus all content items. A zero-length palette
/// means the host has not provided one yet; playback entry points treat that
/// as "not ready" and no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    total: usize,
}

impl Palette {
    /// A palette of `total` items, hum included.
    pub fn new(total: usize) -> Self {
        Self { total }
    }

    /// Total item count, hum included.
    pub fn len(&self) -> usize {
        self.total
    }

    /// True when the host has not provided a palette.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of content items (palette length minus the hum slot).
    pub fn content_count(&self) -> usize {
        self.total.saturating_sub(1)
    }
}

/// Reference to one palette item, as delivered to the selection sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRef {
    /// The silence/home item at palette index 0.
    Hum,
    /// Content item `k`, i.e. palette index `k + 1`.
    Content(usize),
}

impl ItemRef {
    /// Translates a sequence/slot value to an item reference.
    ///
    /// Value 0 is the hum item, value `k` in `1..=N` is content item `k - 1`.
    /// Values beyond the palette resolve to `None`.
    pub fn from_value(value: usize, palette: Palette) -> Option<ItemRef> {
        if palette.is_empty() {
            return None;
        }
        match value {
            0 => Some(ItemRef::Hum),
            k if k <= palette.content_count() => Some(ItemRef::Content(k - 1)),
            _ => None,
        }
    }

    /// The palette index this reference points at.
    pub fn palette_index(&self) -> usize {
        match self {
            ItemRef::Hum => 0,
            ItemRef::Content(k) => k + 1,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Hum => write!(f, "hum"),
            ItemRef::Content(k) => write!(f, "item {k}"),
        }
    }
}
