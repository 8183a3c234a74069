use std::fmt::Write;

use crate::grid::Grid;
use crate::world::ANONYMOUS;
use crate::world::Pattern;

/// Encoded output is hard-wrapped at this many bytes per line.
pub const LINE_WIDTH: usize = 70;

/// The tag of a run in the cell data of an RLE file.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunTag {
    /// `b`
    Dead,
    /// `o`
    Alive,
    /// `$`
    EndOfRow,
    /// `!`
    EndOfPattern,
}

impl RunTag {
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'b' => Some(Self::Dead),
            b'o' => Some(Self::Alive),
            b'$' => Some(Self::EndOfRow),
            b'!' => Some(Self::EndOfPattern),
            _ => None,
        }
    }

    pub const fn from_cell(alive: bool) -> Self {
        if alive { Self::Alive } else { Self::Dead }
    }

    pub const fn as_char(self) -> char {
        match self {
            Self::Dead => 'b',
            Self::Alive => 'o',
            Self::EndOfRow => '$',
            Self::EndOfPattern => '!',
        }
    }
}

/// `count` repetitions of `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub count: usize,
    pub tag: RunTag,
}

impl Run {
    pub const fn new(count: usize, tag: RunTag) -> Self {
        Self { count, tag }
    }

    /// Appends the run to `s`, leaving out a count of 1.
    fn write(&self, s: &mut String) {
        if self.count != 1 {
            // Writing to a `String` can't fail
            let _ = write!(s, "{}", self.count);
        }

        s.push(self.tag.as_char());
    }
}

/// Encode the cells of `grid` as RLE cell data, without a header line.
///
/// Runs never cross a row boundary. Dead cells at the end of a row are left out since the reader
/// pads every row back to the grid width. The output is wrapped at [`LINE_WIDTH`].
pub fn encode(grid: &Grid) -> String {
    let mut body = String::new();
    let h = grid.height();

    for (y, row) in grid.rows().enumerate() {
        let mut run: Option<Run> = None;

        for &cell in row {
            let tag = RunTag::from_cell(cell);

            if let Some(run) = run.as_mut().filter(|r| r.tag == tag) {
                run.count += 1;
                continue;
            }

            if let Some(prev) = run.replace(Run::new(1, tag)) {
                prev.write(&mut body);
            }
        }

        if let Some(run) = run.filter(|r| r.tag == RunTag::Alive) {
            run.write(&mut body);
        }

        let end = if y + 1 == h {
            RunTag::EndOfPattern
        } else {
            RunTag::EndOfRow
        };
        Run::new(1, end).write(&mut body);
    }

    if h == 0 {
        Run::new(1, RunTag::EndOfPattern).write(&mut body);
    }

    wrap(&body, LINE_WIDTH)
}

/// Hard-wrap `s` into lines of `width` bytes. `s` is expected to be ascii.
pub fn wrap(s: &str, width: usize) -> String {
    assert!(width > 0, "line width must be positive");

    let mut out = String::with_capacity(s.len() + s.len() / width);

    for (i, c) in s.chars().enumerate() {
        if i > 0 && i % width == 0 {
            out.push('\n');
        }

        out.push(c);
    }

    out
}

/// Write a complete RLE document for `pattern`: comment lines, the header line and the cell data.
pub fn write_pattern(pattern: &Pattern) -> String {
    let mut out = String::new();

    if pattern.name != ANONYMOUS {
        let _ = writeln!(out, "#N {}", pattern.name);
    }

    if let Some(author) = &pattern.author {
        let _ = writeln!(out, "#O {author}");
    }

    for comment in &pattern.comments {
        let _ = writeln!(out, "#C {comment}");
    }

    let _ = write!(out, "x = {}, y = {}", pattern.width(), pattern.height());
    if let Some(rule) = &pattern.rule {
        let _ = write!(out, ", rule = {rule}");
    }
    out.push('\n');

    out.push_str(&encode(pattern.grid()));
    out.push('\n');

    out
}
