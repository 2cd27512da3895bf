// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits an ordered item list into transport-legal chunks.

use std::fmt;
use std::num::NonZeroUsize;
use std::slice::Chunks;

/// Maximum number of items a station accepts in one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLimit {
    /// No limit was discovered; everything goes in one message.
    Unlimited,
    PerMessage(NonZeroUsize),
}

impl ItemLimit {
    /// Convenience constructor; a zero limit is treated as unlimited.
    pub fn per_message(limit: usize) -> Self {
        NonZeroUsize::new(limit).map_or(Self::Unlimited, Self::PerMessage)
    }
}

impl fmt::Display for ItemLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::PerMessage(limit) => write!(f, "{limit}"),
        }
    }
}

/// Lazy, restartable chunking of a borrowed item list.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlan<'a, T> {
    items: &'a [T],
    limit: ItemLimit,
}

impl<'a, T> ChunkPlan<'a, T> {
    pub fn new(items: &'a [T], limit: ItemLimit) -> Self {
        Self { items, limit }
    }

    fn chunk_size(&self) -> usize {
        match self.limit {
            // An empty list yields no chunks regardless of the size used here.
            ItemLimit::Unlimited => self.items.len().max(1),
            ItemLimit::PerMessage(limit) => limit.get(),
        }
    }

    /// Number of chunks the plan produces.
    pub fn len(&self) -> usize {
        self.items.len().div_ceil(self.chunk_size())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> Chunks<'a, T> {
        self.items.chunks(self.chunk_size())
    }
}

impl<'a, T> IntoIterator for ChunkPlan<'a, T> {
    type Item = &'a [T];
    type IntoIter = Chunks<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
