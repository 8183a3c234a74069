use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::grid::Grid;
use crate::parse_util::ConvertError;
use crate::parse_util::ParseError;
use crate::rle::Run;
use crate::rle::RunTag;
use crate::world::Pattern;

use crate::parse_util;

#[derive(Debug, Error)]
pub enum RleError {
    #[error("Header line error: {0}")]
    Header(#[from] RleHeaderError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] RleEncodingError),
}

/// Parse the RLE file format.
///
/// Comment lines (`#N`, `#O`, `#C`) are read up to the header line `x = .., y = ..[, rule = ..]`,
/// which fixes the grid size. Everything after the header line is cell data, read up to the
/// closing `!`.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
pub fn read_rle(text: &str) -> Result<Pattern, RleError> {
    let mut name: Option<&str> = None;
    let mut author: Option<&str> = None;
    let mut comments = Vec::new();

    // Parse lines until the header line is found
    let mut offset = 0;
    let header = loop {
        let Some(raw) = text[offset..].split_inclusive('\n').next() else {
            return Err(RleHeaderError::MissingHeader.into());
        };
        offset += raw.len();

        let line = raw.trim_end_matches(['\n', '\r']).trim_start();

        if let Some(comment) = line.strip_prefix('#') {
            match read_line_comment(comment) {
                Some(RleCommentLine::Comment { text }) => comments.push(text.to_string()),
                Some(RleCommentLine::Name { name: n }) => {
                    if name.is_some() {
                        warn!(name = n, "RLE file name already defined. Using first");
                    } else {
                        name = Some(n);
                    }
                }
                Some(RleCommentLine::Author { author: a }) => {
                    if author.is_some() {
                        warn!(author = a, "RLE author already defined. Using first");
                    } else {
                        author = Some(a);
                    }
                }
                None => debug!(line, "Skipping comment line"),
            }
        } else if line.starts_with('x') {
            break read_line_header(line)?;
        } else if !line.is_empty() {
            warn!(line, "Ignoring line before the header line");
        }
    };

    let RleHeaderLine { x, y, rule } = header;
    let mut grid = Grid::new(x, y);

    read_encoding(&text.as_bytes()[offset..], &mut grid)?;

    debug!(
        name = name.unwrap_or(crate::world::ANONYMOUS),
        width = x,
        height = y,
        population = grid.population(),
        "Read RLE pattern"
    );

    let mut pattern = Pattern::new(grid);
    if let Some(name) = name {
        pattern.name = name.to_string();
    }
    pattern.author = author.map(str::to_string);
    pattern.comments = comments;
    pattern.rule = rule.map(str::to_string);

    Ok(pattern)
}

enum RleCommentLine<'a> {
    Comment { text: &'a str },
    Name { name: &'a str },
    Author { author: &'a str },
}

/// Reads a comment line with its leading `#` stripped. Lines of any other type, or without any
/// text after the marker, are `None`.
fn read_line_comment(line: &str) -> Option<RleCommentLine<'_>> {
    let mut chars = line.chars();
    let kind = chars.next()?;

    // The marker is followed by exactly one space, the rest is kept as-is
    let text = chars.as_str().strip_prefix(' ').filter(|t| !t.is_empty())?;

    match kind {
        'C' | 'c' => Some(RleCommentLine::Comment { text }),
        'N' => Some(RleCommentLine::Name { name: text }),
        'O' => Some(RleCommentLine::Author { author: text }),
        _ => None,
    }
}

struct RleHeaderLine<'a> {
    x: usize,
    y: usize,
    rule: Option<&'a str>,
}

#[derive(Debug, Error)]
pub enum RleHeaderError {
    #[error("No header line found")]
    MissingHeader,

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoord(#[from] RleCoordError),

    #[error("Invalid token: expected ',' or end of line, found '{got}'")]
    InvalidToken { got: char },
}

/// Parse a header line, `x = <width>, y = <height>[, rule = <rule>]`. The rule is kept verbatim.
fn read_line_header(line: &str) -> Result<RleHeaderLine<'_>, RleHeaderError> {
    let ((x, y), bytes) = read_coordinates(line.as_bytes())?;
    let bytes = parse_util::take_ws_inline(bytes);

    match parse_util::take_1(bytes) {
        (None, _) => Ok(RleHeaderLine { x, y, rule: None }),
        (Some(b','), bytes) => {
            let bytes = parse_util::take_ws_inline(bytes);
            let bytes = parse_util::expect_slice(b"rule", bytes)?;
            let bytes = parse_util::take_ws_inline(bytes);
            let bytes = parse_util::expect(b'=', bytes)?;
            let bytes = parse_util::take_ws_inline(bytes);

            // Everything consumed so far is ascii, so this is a char boundary
            let rule = line[line.len() - bytes.len()..].trim_end();

            Ok(RleHeaderLine {
                x,
                y,
                rule: (!rule.is_empty()).then_some(rule),
            })
        }
        (Some(b), _) => Err(RleHeaderError::InvalidToken { got: b as char }),
    }
}

#[derive(Debug, Error)]
pub enum RleCoordError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Expected x coordinate")]
    NoX,

    #[error("Failed to parse x coordinate: {0}")]
    ParseX(#[source] ConvertError),

    #[error("Expected y coordinate")]
    NoY,

    #[error("Failed to parse y coordinate: {0}")]
    ParseY(#[source] ConvertError),
}

fn read_coordinates(bytes: &[u8]) -> Result<((usize, usize), &[u8]), RleCoordError> {
    let bytes = parse_util::expect(b'x', bytes)?;
    let bytes = parse_util::take_ws_inline(bytes);
    let bytes = parse_util::expect(b'=', bytes)?;
    let bytes = parse_util::take_ws_inline(bytes);

    let (Some(x_bytes), bytes) = parse_util::take_digits(bytes) else {
        return Err(RleCoordError::NoX);
    };
    let x = parse_util::convert(x_bytes).map_err(RleCoordError::ParseX)?;

    let bytes = parse_util::take_ws_inline(bytes);
    let bytes = parse_util::expect(b',', bytes)?;
    let bytes = parse_util::take_ws_inline(bytes);
    let bytes = parse_util::expect(b'y', bytes)?;
    let bytes = parse_util::take_ws_inline(bytes);
    let bytes = parse_util::expect(b'=', bytes)?;
    let bytes = parse_util::take_ws_inline(bytes);

    let (Some(y_bytes), bytes) = parse_util::take_digits(bytes) else {
        return Err(RleCoordError::NoY);
    };
    let y = parse_util::convert(y_bytes).map_err(RleCoordError::ParseY)?;

    Ok(((x, y), bytes))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RleEncodingError {
    #[error("Unexpected end of input, expected '!'")]
    UnexpectedEof,

    #[error("Run length does not fit in a usize")]
    RunLengthOverflow,

    #[error("Run length must be positive")]
    ZeroRunLength,

    #[error("Unrecognized byte: 0x{got:0X}")]
    UnrecognizedByte { got: u8 },

    #[error("Row {row} has {len} cells, but the pattern is only {width} wide")]
    RowOverflow { row: usize, width: usize, len: usize },

    #[error("Cells past the last row, the pattern is only {height} high")]
    TooManyRows { height: usize },
}

/// Splits cell data into [`Run`]s. Whitespace is skipped anywhere, even inside a run length, so
/// line wrapping never changes the meaning of the data.
///
/// The scanner stops after `!` or the first error.
struct RunScanner<'a> {
    bytes: &'a [u8],
    done: bool,
}

impl<'a> RunScanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, done: false }
    }

    fn fail(&mut self, err: RleEncodingError) -> Option<Result<Run, RleEncodingError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for RunScanner<'_> {
    type Item = Result<Run, RleEncodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut count: Option<usize> = None;

        loop {
            let (Some(b), rest) = parse_util::take_1(parse_util::take_ws(self.bytes)) else {
                return self.fail(RleEncodingError::UnexpectedEof);
            };
            self.bytes = rest;

            if b.is_ascii_digit() {
                let digit = (b - b'0') as usize;
                let next = count.unwrap_or(0).checked_mul(10).and_then(|n| n.checked_add(digit));

                let Some(next) = next else {
                    return self.fail(RleEncodingError::RunLengthOverflow);
                };

                count = Some(next);
                continue;
            }

            let Some(tag) = RunTag::from_byte(b) else {
                return self.fail(RleEncodingError::UnrecognizedByte { got: b });
            };

            if count == Some(0) {
                return self.fail(RleEncodingError::ZeroRunLength);
            }

            if tag == RunTag::EndOfPattern {
                self.done = true;
            }

            return Some(Ok(Run::new(count.unwrap_or(1), tag)));
        }
    }
}

/// Decode cell data into `grid`, which must be all dead.
///
/// Rows shorter than the grid width keep their trailing cells dead, as do rows the data never
/// reaches.
fn read_encoding(bytes: &[u8], grid: &mut Grid) -> Result<(), RleEncodingError> {
    let (width, height) = (grid.width(), grid.height());
    let (mut x, mut y) = (0, 0);

    for run in RunScanner::new(bytes) {
        let Run { count, tag } = run?;

        match tag {
            RunTag::Dead | RunTag::Alive => {
                if y >= height {
                    return Err(RleEncodingError::TooManyRows { height });
                }

                if count > width - x {
                    return Err(RleEncodingError::RowOverflow {
                        row: y,
                        width,
                        len: x.saturating_add(count),
                    });
                }

                if tag == RunTag::Alive {
                    grid.row_mut(y)[x..x + count].fill(true);
                }

                x += count;
            }

            // `n$` ends the current row and skips `n - 1` blank ones
            RunTag::EndOfRow => {
                x = 0;
                y = y.saturating_add(count);
            }

            RunTag::EndOfPattern => return Ok(()),
        }
    }

    Err(RleEncodingError::UnexpectedEof)
}

#[cfg(test)]
mod test {
    use super::*;

    const GLIDER: &str = "#N Glider\n#C A small spaceship\nx = 3, y = 3, rule = B3/S23\nbo$2bo$3o!\n";

    #[test]
    fn read_coordinates() {
        let bytes = b"x = 1, y = 1\n";
        let ((x, y), rest) = super::read_coordinates(bytes.as_slice()).unwrap();

        assert_eq!((x, y), (1, 1));
        assert_eq!(rest, b"\n");
    }

    #[test]
    fn read_coordinates_tight_spacing() {
        let ((x, y), _) = super::read_coordinates(b"x=36,y=9").unwrap();

        assert_eq!((x, y), (36, 9));
    }

    #[test]
    fn read_coordinates_missing_y() {
        let err = super::read_coordinates(b"x = 3, y = ").unwrap_err();

        assert!(matches!(err, RleCoordError::NoY));
    }

    #[test]
    fn read_glider() {
        let pattern = read_rle(GLIDER).unwrap();

        assert_eq!(pattern.name, "Glider");
        assert_eq!(pattern.comments, vec!["A small spaceship"]);
        assert_eq!(pattern.rule.as_deref(), Some("B3/S23"));
        assert_eq!((pattern.width(), pattern.height()), (3, 3));
        assert_eq!(
            pattern.grid().to_string(),
            ["·o·", "··o", "ooo"].join("\n")
        );
    }

    #[test]
    fn read_without_metadata() {
        let pattern = read_rle("x = 2, y = 1\n2o!").unwrap();

        assert_eq!(pattern.name, "anonymous");
        assert!(pattern.comments.is_empty());
        assert_eq!(pattern.author, None);
        assert_eq!(pattern.rule, None);
    }

    #[test]
    fn read_author_and_lowercase_comment() {
        let text = "#O John Conway\n#c lower\n#C upper\n#R 0 0\nx = 1, y = 1\no!";
        let pattern = read_rle(text).unwrap();

        assert_eq!(pattern.author.as_deref(), Some("John Conway"));
        assert_eq!(pattern.comments, vec!["lower", "upper"]);
    }

    #[test]
    fn first_name_wins() {
        let pattern = read_rle("#N first\n#N second\nx = 1, y = 1\no!").unwrap();

        assert_eq!(pattern.name, "first");
    }

    #[test]
    fn empty_markers_are_skipped() {
        let pattern = read_rle("#N\n#C\nx = 1, y = 1\no!").unwrap();

        assert_eq!(pattern.name, "anonymous");
        assert!(pattern.comments.is_empty());
    }

    #[test]
    fn indented_lines_and_crlf() {
        let text = "  #N Block\r\n  x = 2, y = 2, rule = B3/S23 \r\n  2o$2o!\r\n";
        let pattern = read_rle(text).unwrap();

        assert_eq!(pattern.name, "Block");
        assert_eq!(pattern.rule.as_deref(), Some("B3/S23"));
        assert_eq!(pattern.grid().population(), 4);
    }

    #[test]
    fn short_rows_are_padded() {
        let pattern = read_rle("x = 4, y = 2\no$bo!").unwrap();

        assert_eq!(pattern.grid().row(0), &[true, false, false, false]);
        assert_eq!(pattern.grid().row(1), &[false, true, false, false]);
        assert_eq!(pattern.to_rle(), "o$bo!");
    }

    #[test]
    fn missing_rows_stay_dead() {
        let pattern = read_rle("x = 2, y = 3\n2o!").unwrap();

        assert_eq!(pattern.height(), 3);
        assert_eq!(pattern.grid().population(), 2);
        assert_eq!(pattern.to_rle(), "2o$$!");
    }

    #[test]
    fn row_skip_count() {
        let pattern = read_rle("x = 1, y = 4\no3$o!").unwrap();

        assert!(pattern.grid().get(0, 0));
        assert!(pattern.grid().get(3, 0));
        assert_eq!(pattern.grid().population(), 2);
    }

    #[test]
    fn whitespace_inside_run_length() {
        let pattern = read_rle("x = 12, y = 1\n1\n1b\no!").unwrap();

        assert!(pattern.grid().get(0, 11));
        assert_eq!(pattern.grid().population(), 1);
    }

    #[test]
    fn trailing_text_after_terminator() {
        let pattern = read_rle("x = 1, y = 1\no!this is ignored $$ 3q").unwrap();

        assert!(pattern.grid().get(0, 0));
    }

    #[test]
    fn missing_header() {
        let err = read_rle("#N nothing\nbo$2bo$3o!").unwrap_err();

        assert!(matches!(err, RleError::Header(RleHeaderError::MissingHeader)));
    }

    #[test]
    fn malformed_header() {
        let err = read_rle("x = three, y = 3\nbo$2bo$3o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Header(RleHeaderError::InvalidCoord(RleCoordError::NoX))
        ));

        let err = read_rle("x = 3, y = 3; rule = B3/S23\nbo$2bo$3o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Header(RleHeaderError::InvalidToken { got: ';' })
        ));
    }

    #[test]
    fn missing_terminator() {
        let err = read_rle("x = 3, y = 3\nbo$2bo$3o").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::UnexpectedEof)
        ));
    }

    #[test]
    fn unrecognized_byte() {
        let err = read_rle("x = 3, y = 3\nbo$2bx$3o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::UnrecognizedByte { got: b'x' })
        ));
    }

    #[test]
    fn row_overflow() {
        let err = read_rle("x = 3, y = 1\n2o2b!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::RowOverflow {
                row: 0,
                width: 3,
                len: 4
            })
        ));
    }

    #[test]
    fn too_many_rows() {
        let err = read_rle("x = 1, y = 1\no$o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::TooManyRows { height: 1 })
        ));
    }

    #[test]
    fn zero_run_length() {
        let err = read_rle("x = 1, y = 1\n0o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::ZeroRunLength)
        ));
    }

    #[test]
    fn run_length_overflow() {
        let err = read_rle("x = 1, y = 1\n99999999999999999999999o!").unwrap_err();

        assert!(matches!(
            err,
            RleError::Encoding(RleEncodingError::RunLengthOverflow)
        ));
    }

    #[test]
    fn empty_pattern() {
        let pattern = read_rle("x = 0, y = 0\n!").unwrap();

        assert_eq!(pattern.grid().population(), 0);
        assert_eq!(pattern.to_rle(), "!");
    }

    #[test]
    fn scanner_runs() {
        let runs: Result<Vec<Run>, _> = RunScanner::new(b"2b o\n$ 12\n3o!junk").collect();

        assert_eq!(
            runs.unwrap(),
            vec![
                Run::new(2, RunTag::Dead),
                Run::new(1, RunTag::Alive),
                Run::new(1, RunTag::EndOfRow),
                Run::new(123, RunTag::Alive),
                Run::new(1, RunTag::EndOfPattern),
            ]
        );
    }

    #[test]
    fn scanner_stops_after_error() {
        let mut scanner = RunScanner::new(b"2b?o!");

        assert_eq!(scanner.next(), Some(Ok(Run::new(2, RunTag::Dead))));
        assert_eq!(
            scanner.next(),
            Some(Err(RleEncodingError::UnrecognizedByte { got: b'?' }))
        );
        assert_eq!(scanner.next(), None);
    }
}
