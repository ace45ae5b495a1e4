use rand::seq::SliceRandom;
use rand::Rng;

use super::state::Position;

/// Pick a cell uniformly among those not covered by `snake` or `existing`.
///
/// Below 80% occupancy this rejection-samples the whole grid; above it the
/// free cells are listed and one is chosen, so a crowded board never spins.
/// Returns `None` only when every cell is taken.
pub fn sample_free_cell<R: Rng>(
    rng: &mut R,
    grid_size: usize,
    snake: &[Position],
    existing: &[Position],
) -> Option<Position> {
    let total = grid_size * grid_size;
    let occupied = snake.len() + existing.len();
    let is_taken = |pos: &Position| snake.contains(pos) || existing.contains(pos);

    if occupied * 5 < total * 4 {
        loop {
            let pos = Position::new(
                rng.gen_range(0..grid_size) as i32,
                rng.gen_range(0..grid_size) as i32,
            );
            if !is_taken(&pos) {
                return Some(pos);
            }
        }
    }

    let free: Vec<Position> = (0..grid_size as i32)
        .flat_map(|y| (0..grid_size as i32).map(move |x| Position::new(x, y)))
        .filter(|pos| !is_taken(pos))
        .collect();

    free.choose(rng).copied()
}
