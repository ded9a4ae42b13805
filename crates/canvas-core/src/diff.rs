//! Cells changed since the last broadcast.

use std::collections::BTreeMap;

use crate::color::Color;
use crate::position::Position;

/// Pending migration: position -> latest color.
///
/// At most one entry per position; a later write for the same position
/// replaces the earlier one. Iteration is in ascending position order so
/// the frame built from a diff is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDiff {
    entries: BTreeMap<Position, Color>,
}

impl PendingDiff {
    pub fn new() -> Self {
        PendingDiff::default()
    }

    /// Record a change (last write wins).
    pub fn record(&mut self, position: Position, color: Color) {
        self.entries.insert(position, color);
    }

    pub fn get(&self, position: Position) -> Option<Color> {
        self.entries.get(&position).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, Color)> + '_ {
        self.entries.iter().map(|(p, c)| (*p, *c))
    }

    /// Flatten into `(position, color)` pairs.
    pub fn into_changes(self) -> Vec<(Position, Color)> {
        self.entries.into_iter().collect()
    }
}
