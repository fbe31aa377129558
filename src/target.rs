//! Target number the player has to reach by summing selected tiles.

use rand::Rng;

/// Below this many visible tiles the target becomes their total, forcing a clearing move.
pub const ENDGAME_TILE_THRESHOLD: usize = 5;
/// Random targets are drawn from `1..=MAX_RANDOM_TARGET`.
pub const MAX_RANDOM_TARGET: u32 = 16;

/// Pick the next target from the values of the tiles still on the board.
pub fn generate(visible_values: impl IntoIterator<Item = u8>, rng: &mut impl Rng) -> u32 {
    let values: Vec<u8> = visible_values.into_iter().collect();
    if (1..ENDGAME_TILE_THRESHOLD).contains(&values.len()) {
        values.iter().map(|&v| u32::from(v)).sum()
    } else {
        rng.random_range(1..=MAX_RANDOM_TARGET)
    }
}
