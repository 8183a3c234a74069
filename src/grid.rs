use std::fmt;

const DEAD: char = '·';
const LIVE: char = 'o';

/// A fixed size, row-major grid of cells.
///
/// The grid never wraps and never grows: anything outside `[0, height) x [0, width)` is dead.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    /// The cell buffer
    cells: Vec<bool>,

    /// Number of columns
    w: usize,

    /// Number of rows
    h: usize,
}

impl Grid {
    /// Create an all-dead grid of `width` columns and `height` rows.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![false; width * height],
            w: width,
            h: height,
        }
    }

    /// Build a grid from rows of cells. Every row must have the same length.
    pub fn from_rows<R>(rows: &[R]) -> Self
    where
        R: AsRef<[bool]>,
    {
        let w = rows.first().map_or(0, |r| r.as_ref().len());
        let mut grid = Self::new(w, rows.len());

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            assert_eq!(row.len(), w, "row {y} has length {}, expected {w}", row.len());

            grid.row_mut(y).copy_from_slice(row);
        }

        grid
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    /// Number of live cells
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Gets the cell at `(row, col)`.
    ///
    /// # Panics
    /// If the coordinate is outside the grid.
    pub fn get(&self, row: usize, col: usize) -> bool {
        let i = self.index(row, col);

        self.cells[i]
    }

    /// Like `get`, but returns `None` outside the grid.
    pub fn try_get(&self, row: usize, col: usize) -> Option<bool> {
        (row < self.h && col < self.w).then(|| self.cells[row * self.w + col])
    }

    /// Sets the cell at `(row, col)`.
    ///
    /// # Panics
    /// If the coordinate is outside the grid.
    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        let i = self.index(row, col);

        self.cells[i] = alive;
    }

    pub fn row(&self, row: usize) -> &[bool] {
        assert!(row < self.h, "row is out of bounds");

        &self.cells[row * self.w..(row + 1) * self.w]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [bool] {
        assert!(row < self.h, "row is out of bounds");

        &mut self.cells[row * self.w..(row + 1) * self.w]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[bool]> {
        (0..self.h).map(move |y| self.row(y))
    }

    /// Counts the live cells in the 3x3 block around `(row, col)`, not counting the cell itself.
    ///
    /// Neighbors past the edge of the grid count as dead.
    pub fn live_neighbors(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.h, "row is out of bounds");
        assert!(col < self.w, "col is out of bounds");

        let rows = row.saturating_sub(1)..=(row + 1).min(self.h - 1);
        let cols = col.saturating_sub(1)..=(col + 1).min(self.w - 1);

        let mut n = 0;
        for y in rows {
            for x in cols.clone() {
                if (y, x) != (row, col) && self.cells[y * self.w + x] {
                    n += 1;
                }
            }
        }

        n
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(row < self.h, "row is out of bounds");
        assert!(col < self.w, "col is out of bounds");

        row * self.w + col
    }
}

/// Renders one line per row, `o` for live cells and `·` for dead ones.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.rows().enumerate() {
            if y > 0 {
                writeln!(f)?;
            }

            for &cell in row {
                write!(f, "{}", if cell { LIVE } else { DEAD })?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid {}x{}\n{}", self.w, self.h, self)
    }
}
