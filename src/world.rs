use std::str::FromStr;

use tracing::debug;
use tracing::trace;

use crate::DEFAULT_GENERATIONS;
use crate::grid::Grid;
use crate::parse_rle;
use crate::parse_rle::RleError;
use crate::rle;

/// Name given to patterns without a `#N` line.
pub const ANONYMOUS: &str = "anonymous";

/// A Life pattern: the cell grid plus whatever metadata its RLE file carried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Pattern name, from `#N`
    pub name: String,

    /// Pattern author, from `#O`
    pub author: Option<String>,

    /// Every `#C` line, in file order
    pub comments: Vec<String>,

    /// The header rule, verbatim. Evolution always uses B3/S23 regardless.
    pub rule: Option<String>,

    /// How many generations [`Pattern::evolve`] runs
    pub generations: u64,

    /// Generations applied so far
    generation: u64,

    grid: Grid,
}

impl Pattern {
    pub fn new(grid: Grid) -> Self {
        Self {
            name: ANONYMOUS.to_string(),
            author: None,
            comments: Vec::new(),
            rule: None,
            generations: DEFAULT_GENERATIONS,
            generation: 0,
            grid,
        }
    }

    /// Parse a pattern from the RLE format.
    pub fn parse(text: &str) -> Result<Self, RleError> {
        parse_rle::read_rle(text)
    }

    pub fn with_generations(mut self, generations: u64) -> Self {
        self.generations = generations;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Number of generations applied since the pattern was parsed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance the pattern by `self.generations` generations and return how many were run.
    ///
    /// `self.generations` is left untouched, so every call runs the same number of steps.
    pub fn evolve(&mut self) -> u64 {
        debug!(
            name = %self.name,
            from = self.generation,
            generations = self.generations,
            "Evolving pattern"
        );

        for _ in 0..self.generations {
            self.step();
        }

        self.generations
    }

    /// Advance the pattern by a single generation.
    pub fn step(&mut self) {
        step(&mut self.grid);
        self.generation += 1;
    }

    /// The cell data as RLE, without a header line.
    pub fn to_rle(&self) -> String {
        rle::encode(&self.grid)
    }
}

impl FromStr for Pattern {
    type Err = RleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Apply B3/S23 to every cell of `grid` at once.
///
/// Every neighbor count is taken against the grid as it was before the step: deaths and births
/// are collected first and only then written back.
pub fn step(grid: &mut Grid) {
    let mut deaths = Vec::new();
    let mut births = Vec::new();

    for row in 0..grid.height() {
        for col in 0..grid.width() {
            let n = grid.live_neighbors(row, col);

            if grid.get(row, col) {
                if !(2..=3).contains(&n) {
                    deaths.push((row, col));
                }
            } else if n == 3 {
                births.push((row, col));
            }
        }
    }

    trace!(deaths = deaths.len(), births = births.len(), "Step");

    for (row, col) in deaths {
        grid.set(row, col, false);
    }

    for (row, col) in births {
        grid.set(row, col, true);
    }
}

/// Run `generations` steps on `grid`. Returns the number of steps run.
pub fn evolve(grid: &mut Grid, generations: u64) -> u64 {
    for _ in 0..generations {
        step(grid);
    }

    generations
}
