//! Tiles the player has picked so far and their running total.

use crate::grid::Grid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Insertion order, so re-selecting a tile moves it to the end.
    indices: Vec<usize>,
    values: Vec<u8>,
    total: u32,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selected flag of a visible tile. Out-of-range or hidden tiles are ignored.
    /// Returns true when the selection changed.
    pub fn toggle(&mut self, grid: &mut Grid, index: usize) -> bool {
        let Some(tile) = grid.tile_mut(index) else {
            return false;
        };
        if tile.hidden {
            return false;
        }
        tile.selected = !tile.selected;
        if tile.selected {
            self.indices.push(index);
            self.values.push(tile.value);
        } else if let Some(pos) = self.indices.iter().position(|&i| i == index) {
            self.indices.remove(pos);
            self.values.remove(pos);
        }
        self.total = self.values.iter().map(|&v| u32::from(v)).sum();
        true
    }

    /// Drop every selection. Tile values and visibility are untouched.
    pub fn clear(&mut self, grid: &mut Grid) {
        for &i in &self.indices {
            if let Some(t) = grid.tile_mut(i) {
                t.selected = false;
            }
        }
        self.indices.clear();
        self.values.clear();
        self.total = 0;
    }

    /// Forget the selection without touching any grid (the grid it pointed into was rebuilt).
    pub fn forget(&mut self) {
        self.indices.clear();
        self.values.clear();
        self.total = 0;
    }

    pub fn is_match(&self, target: u32) -> bool {
        !self.indices.is_empty() && self.total == target
    }

    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[cfg(test)]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// "2 + 3 + 1", or a placeholder when nothing is picked.
    pub fn describe(&self) -> String {
        if self.values.is_empty() {
            return "No tiles selected".to_string();
        }
        self.values
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}
