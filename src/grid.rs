//! Ice grid: tile values, visibility, selection flags and gravity compaction.
//!
//! Tiles are stored column-major: index `col * rows + row`. A tile's index is its identity for
//! the whole round; compaction only moves its `position`.

use rand::Rng;
use std::time::Duration;

/// Default grid height in rows.
pub const DEFAULT_ROWS: usize = 8;
/// Default grid width before the viewport is measured.
pub const DEFAULT_COLUMNS: usize = 10;
/// Column count bounds when fitting the grid to a viewport.
pub const MIN_COLUMNS: usize = 6;
pub const MAX_COLUMNS: usize = 18;
/// Tallest board the renderer lays out.
pub const MAX_ROWS: usize = 32;

/// Tile values are drawn uniformly from `1..=MAX_TILE_VALUE`.
pub const MAX_TILE_VALUE: u8 = 4;

/// Per-row stagger of the drop-in animation (bottom row first).
const ROW_ANIMATION_STEP_MS: u64 = 150;
/// Random jitter added to each tile's animation delay.
const ANIMATION_JITTER_MS: u64 = 100;

/// Where a tile currently sits on the board. `row` 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub col: usize,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub value: u8,
    /// Not yet revealed, or already matched away.
    pub hidden: bool,
    pub selected: bool,
    /// Presentation hint only.
    pub animation_delay: Duration,
}

impl Tile {
    #[inline]
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    columns: usize,
    rows: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Build a fully hidden grid with fresh random values.
    pub fn new(columns: usize, rows: usize, rng: &mut impl Rng) -> Self {
        let mut grid = Self {
            columns,
            rows,
            tiles: Vec::with_capacity(columns * rows),
        };
        grid.initialize(rng);
        grid
    }

    fn initialize(&mut self, rng: &mut impl Rng) {
        self.tiles.clear();
        for col in 0..self.columns {
            for row in 0..self.rows {
                let base = (self.rows - 1 - row) as u64 * ROW_ANIMATION_STEP_MS;
                let jitter = rng.random_range(0..ANIMATION_JITTER_MS);
                self.tiles.push(Tile {
                    position: Position { col, row },
                    value: rng.random_range(1..=MAX_TILE_VALUE),
                    hidden: true,
                    selected: false,
                    animation_delay: Duration::from_millis(base + jitter),
                });
            }
        }
    }

    /// Discard every tile and build a new hidden grid of the same shape.
    pub fn reset(&mut self, rng: &mut impl Rng) {
        self.initialize(rng);
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn index_of(&self, col: usize, row: usize) -> usize {
        col * self.rows + row
    }

    #[inline]
    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    #[inline]
    pub fn tile_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Visible tile currently drawn at `(col, row)`, if any.
    pub fn visible_at(&self, col: usize, row: usize) -> Option<usize> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        let start = col * self.rows;
        (start..start + self.rows).find(|&i| {
            let t = &self.tiles[i];
            t.is_visible() && t.position.row == row
        })
    }

    pub fn visible_values(&self) -> impl Iterator<Item = u8> + '_ {
        self.tiles.iter().filter(|t| t.is_visible()).map(|t| t.value)
    }

    #[cfg(test)]
    pub fn visible_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_visible()).count()
    }

    pub fn all_hidden(&self) -> bool {
        self.tiles.iter().all(|t| t.hidden)
    }

    /// Un-hide every tile whose home row is `row`. Returns the indices that became visible.
    pub fn reveal_row(&mut self, row: usize) -> Vec<usize> {
        if row >= self.rows {
            return Vec::new();
        }
        let mut revealed = Vec::with_capacity(self.columns);
        for col in 0..self.columns {
            let i = self.index_of(col, row);
            if self.tiles[i].hidden {
                self.tiles[i].hidden = false;
                revealed.push(i);
            }
        }
        revealed
    }

    /// Remove tiles from play. Selection flags are dropped with them.
    pub fn hide(&mut self, indices: &[usize]) {
        for &i in indices {
            if let Some(t) = self.tiles.get_mut(i) {
                t.hidden = true;
                t.selected = false;
            }
        }
    }

    /// Settle every column. Returns the indices of tiles whose position changed.
    pub fn compact(&mut self) -> Vec<usize> {
        let mut moved = Vec::new();
        for col in 0..self.columns {
            self.compact_column(col, &mut moved);
        }
        moved
    }

    /// Visible tiles of `col` keep their top-to-bottom order and stack onto the floor.
    fn compact_column(&mut self, col: usize, moved: &mut Vec<usize>) {
        let start = col * self.rows;
        let mut stack: Vec<usize> = (start..start + self.rows)
            .filter(|&i| self.tiles[i].is_visible())
            .collect();
        stack.sort_by_key(|&i| self.tiles[i].position.row);

        let top = self.rows - stack.len();
        for (offset, i) in stack.into_iter().enumerate() {
            let row = top + offset;
            let tile = &mut self.tiles[i];
            if tile.position.row != row {
                tile.position.row = row;
                moved.push(i);
            }
        }
    }
}

/// How many columns fit into `available` units when each tile spans `tile_span` and `margin`
/// units are reserved, clamped to `MIN_COLUMNS..=MAX_COLUMNS`.
pub fn fit_column_count(available: u32, tile_span: u32, margin: u32) -> usize {
    let span = tile_span.max(1);
    let fitted = (available.saturating_sub(margin) / span) as usize;
    fitted.saturating_sub(1).clamp(MIN_COLUMNS, MAX_COLUMNS)
}
