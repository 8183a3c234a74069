use std::io;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use crossterm::execute;
use crossterm::style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rlelife::DEFAULT_GENERATIONS;
use rlelife::rle;
use rlelife::world::Pattern;

const USAGE: &str = "Usage: rlelife <pattern.rle> [generations] [--header] [--show]";

#[derive(Debug, PartialEq, Eq)]
struct Options {
    /// The .rle file to read
    path: PathBuf,

    /// Generations to run
    generations: u64,

    /// Print a full RLE file instead of just the cell data
    header: bool,

    /// Also print the final grid as text
    show: bool,
}

impl Options {
    fn from_args<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut path = None;
        let mut generations = None;
        let (mut header, mut show) = (false, false);

        for arg in args {
            match arg.as_str() {
                "--header" => header = true,
                "--show" => show = true,
                "-h" | "--help" => bail!(USAGE),
                flag if flag.starts_with('-') => bail!("Unknown flag \"{flag}\"\n{USAGE}"),
                _ if path.is_none() => path = Some(PathBuf::from(&arg)),
                _ if generations.is_none() => {
                    let n = arg
                        .parse::<u64>()
                        .with_context(|| format!("Invalid generation count \"{arg}\""))?;

                    generations = Some(n);
                }
                _ => bail!("Unexpected argument \"{arg}\"\n{USAGE}"),
            }
        }

        let Some(path) = path else {
            bail!("A .rle file is required\n{USAGE}")
        };

        Ok(Self {
            path,
            generations: generations.unwrap_or(DEFAULT_GENERATIONS),
            header,
            show,
        })
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let opts = Options::from_args(std::env::args().skip(1))?;

    let data = std::fs::read_to_string(&opts.path)
        .with_context(|| format!("Failed to open {}", opts.path.display()))?;

    let mut pattern = Pattern::parse(&data)
        .with_context(|| format!("Failed to read RLE file {}", opts.path.display()))?
        .with_generations(opts.generations);

    pattern.evolve();
    info!(generation = pattern.generation(), "Done");

    let out = if opts.header {
        rle::write_pattern(&pattern)
    } else {
        pattern.to_rle() + "\n"
    };

    let mut stdout = io::stdout();

    if opts.show {
        execute!(stdout, style::Print(pattern.grid()), style::Print("\n\n"))?;
    }

    execute!(stdout, style::Print(out))?;

    Ok(())
}
