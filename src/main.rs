use std::path::{Path, PathBuf};
use std::time::Instant;

use molscope::{RenderContext, Session, ViewerError, ViewerOptions};

const USAGE: &str = "Usage: molscope <file> [--format xyz|pdb|sdf] [--frames N] \
                     [--dt SECONDS] [--size WxH] [--options path.toml]";

struct Args {
    path: PathBuf,
    format: Option<String>,
    frames: u32,
    dt: f64,
    size: (u32, u32),
    options: Option<PathBuf>,
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("size '{value}' is not WxH"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|e| format!("size '{value}': {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args {
        path: PathBuf::new(),
        format: None,
        frames: 60,
        dt: 1.0 / 60.0,
        size: (800, 600),
        options: None,
    };
    let mut path = None;
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next().ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--format" => parsed.format = Some(value("--format")?),
            "--frames" => {
                parsed.frames = value("--frames")?
                    .parse()
                    .map_err(|e| format!("--frames: {e}"))?;
            }
            "--dt" => {
                parsed.dt =
                    value("--dt")?.parse().map_err(|e| format!("--dt: {e}"))?;
            }
            "--size" => parsed.size = parse_size(&value("--size")?)?,
            "--options" => parsed.options = Some(PathBuf::from(value("--options")?)),
            flag if flag.starts_with("--") => {
                return Err(format!("unknown flag '{flag}'"));
            }
            _ if path.is_none() => path = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument '{arg}'")),
        }
    }
    parsed.path = path.ok_or_else(|| "missing input file".to_owned())?;
    Ok(parsed)
}

fn format_from_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn run(args: &Args) -> Result<(), ViewerError> {
    let options = match &args.options {
        Some(path) => ViewerOptions::load(path)?,
        None => ViewerOptions::default(),
    };
    let format = args
        .format
        .clone()
        .or_else(|| format_from_extension(&args.path))
        .unwrap_or_default();
    let bytes = std::fs::read(&args.path)?;

    let (width, height) = args.size;
    let context = pollster::block_on(RenderContext::headless(width, height))
        .map_err(ViewerError::Context)?;
    let mut session =
        Session::new(args.path.display().to_string(), context, options)?;
    session.add_molecule(&bytes, &format)?;

    if let Some(structure) = session.structure() {
        log::info!(
            "{}: {} atoms, {} bonds",
            args.path.display(),
            structure.atom_count(),
            structure.bond_count()
        );
    }

    let start = Instant::now();
    for _ in 0..args.frames {
        session.update_time(args.dt)?;
        session.render()?;
    }
    let elapsed = start.elapsed();
    log::info!(
        "rendered {} frames at {width}x{height} in {:.1} ms ({:.2} ms/frame)",
        args.frames,
        elapsed.as_secs_f64() * 1e3,
        elapsed.as_secs_f64() * 1e3 / f64::from(args.frames.max(1))
    );

    session.dispose();
    Ok(())
}

fn main() {
    molscope::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            log::error!("{e}");
            log::error!("{USAGE}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
