//! Default naming and placement for new computes.

use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::entity::Position3D;
use crate::traits::{NameGenerator, PositionProvider};

/// Generates `compute-xxxxxxxx` identifiers from random UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidNameGenerator;

impl NameGenerator for UuidNameGenerator {
    fn generate(&self) -> String {
        let simple = Uuid::new_v4().simple().to_string();
        format!("compute-{}", &simple[..8])
    }
}

/// Lays computes out row by row on a square grid in the x/z plane.
#[derive(Debug)]
pub struct GridPositionProvider {
    columns: usize,
    spacing: f64,
    next: AtomicUsize,
}

impl GridPositionProvider {
    const DEFAULT_COLUMNS: usize = 4;
    const DEFAULT_SPACING: f64 = 3.0;

    /// Create a grid with the given number of columns and cell spacing.
    #[must_use]
    pub fn new(columns: usize, spacing: f64) -> Self {
        Self {
            columns: columns.max(1),
            spacing,
            next: AtomicUsize::new(0),
        }
    }
}

impl Default for GridPositionProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COLUMNS, Self::DEFAULT_SPACING)
    }
}

impl PositionProvider for GridPositionProvider {
    #[allow(clippy::cast_precision_loss)]
    fn next_position(&self) -> Position3D {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        let column = (slot % self.columns) as f64;
        let row = (slot / self.columns) as f64;
        Position3D::new(column * self.spacing, 0.0, row * self.spacing)
    }
}
