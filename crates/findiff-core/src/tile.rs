//! Group-local staging tile with halo.
//!
//! A tile holds `pencils` pencils of `axis_len + 2 * STENCIL_RADIUS` samples,
//! pencil-major. Stencil positions run from `-STENCIL_RADIUS` to
//! `axis_len + STENCIL_RADIUS - 1`; positions outside `0..axis_len` are the
//! ghost cells written by the halo phase.
//!
//! Cells are stored as `AtomicU32` bit patterns so that every unit of a group
//! can write through a shared reference. Ordering between phases comes from
//! the group barrier, so relaxed accesses are sufficient.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::coefficients::STENCIL_RADIUS;

/// Shared per-group tile.
#[derive(Debug)]
pub struct Tile {
    axis_len: usize,
    pencils: usize,
    cells: Box<[AtomicU32]>,
}

impl Tile {
    /// Allocate a zeroed tile for `pencils` pencils of `axis_len` points.
    pub fn new(axis_len: usize, pencils: usize) -> Self {
        let len = (axis_len + 2 * STENCIL_RADIUS) * pencils;
        let cells = (0..len).map(|_| AtomicU32::new(0)).collect();
        Self {
            axis_len,
            pencils,
            cells,
        }
    }

    /// Points per pencil, halo excluded.
    pub fn axis_len(&self) -> usize {
        self.axis_len
    }

    pub fn pencils(&self) -> usize {
        self.pencils
    }

    /// Valid stencil positions, halo included.
    pub fn stencil_range(&self) -> Range<isize> {
        -(STENCIL_RADIUS as isize)..(self.axis_len + STENCIL_RADIUS) as isize
    }

    /// Size of the tile in bytes.
    pub fn bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<f32>()
    }

    #[inline(always)]
    fn offset(&self, s: isize, p: usize) -> usize {
        debug_assert!(
            self.stencil_range().contains(&s),
            "stencil position {s} outside tile"
        );
        debug_assert!(p < self.pencils, "pencil {p} outside tile");
        p * (self.axis_len + 2 * STENCIL_RADIUS) + (s + STENCIL_RADIUS as isize) as usize
    }

    /// Read the sample at stencil position `s` of pencil `p`.
    #[inline(always)]
    pub fn get(&self, s: isize, p: usize) -> f32 {
        f32::from_bits(self.cells[self.offset(s, p)].load(Ordering::Relaxed))
    }

    /// Write the sample at stencil position `s` of pencil `p`.
    #[inline(always)]
    pub fn set(&self, s: isize, p: usize, value: f32) {
        self.cells[self.offset(s, p)].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Copy one pencil out, halo included.
    pub fn pencil(&self, p: usize) -> Vec<f32> {
        self.stencil_range().map(|s| self.get(s, p)).collect()
    }
}
