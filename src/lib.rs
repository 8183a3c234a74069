pub mod grid;
pub mod parse_rle;
pub mod parse_util;
pub mod rle;
pub mod world;

use parse_rle::RleError;
use world::Pattern;

/// Generations run when the caller doesn't ask for a specific count.
pub const DEFAULT_GENERATIONS: u64 = 1;

/// Parse an RLE pattern, run it for `generations` generations and encode the result as RLE cell
/// data (no header line).
pub fn run(text: &str, generations: u64) -> Result<String, RleError> {
    let mut pattern = Pattern::parse(text)?.with_generations(generations);

    pattern.evolve();

    Ok(pattern.to_rle())
}
