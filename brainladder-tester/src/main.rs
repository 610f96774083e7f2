mod common;
mod logic;

use anyhow::{Context, Result};
use brainladder_game::{GameEngine, JsonFileBackend, LevelId, MemoryBackend, ProgressSummary};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::{resolve_levels, resolve_seeds};
use logic::{LevelResult, LevelTester, PlayStrategy};

#[derive(Debug, Parser)]
#[command(name = "brainladder-tester", version = "0.1.0")]
#[command(about = "Automated playthroughs and progression checks for Brain Ladder levels")]
struct Args {
    /// Level ids, ranges like 3-7, or `all`
    #[arg(long, default_value = "all")]
    levels: String,

    #[arg(long)]
    list_levels: bool,

    #[arg(long, default_value = "1337")]
    seeds: String,

    #[arg(long, default_value_t = 3)]
    iterations: usize,

    #[arg(long, default_value = "perfect")]
    #[arg(value_parser = ["perfect", "clumsy", "random", "idle"])]
    policy: String,

    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Play every level against one save file instead of fresh stores
    #[arg(long)]
    save: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_levels(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let strategy: PlayStrategy = args.policy.parse().map_err(anyhow::Error::msg)?;
    let seeds = resolve_seeds(&args.seeds)?;
    let tester = LevelTester::new(args.verbose);

    let (results, summary) = match &args.save {
        Some(path) => run_on_save_file(&args, path, &tester, strategy, &seeds)?,
        None => (run_fresh(&args, &tester, strategy, &seeds)?, None),
    };

    write_reports(&args, &results, summary.as_ref(), start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_levels(args: &Args) -> Result<bool> {
    if !args.list_levels {
        return Ok(false);
    }
    let engine = GameEngine::with_defaults(MemoryBackend::new())
        .context("failed to load the embedded catalog")?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available levels:")?;
    for world in engine.catalog().worlds() {
        let premium = if world.is_premium { " (premium)" } else { "" };
        writeln!(output_target.writer(), "World {} - {}{premium}", world.id, world.name)?;
        for level in &world.levels {
            let timer = level
                .time_limit_seconds
                .map(|secs| format!(", {secs}s"))
                .unwrap_or_default();
            writeln!(
                output_target.writer(),
                "  {:>2} {:24} {:22} target {} mistakes {}{timer}",
                level.id,
                level.name,
                level.mechanic.to_string(),
                level.target_count,
                level.max_wrong_attempts
            )?;
        }
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🧠 Brain Ladder Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn level_ids<B: brainladder_game::ProgressBackend>(
    args: &Args,
    engine: &GameEngine<B>,
) -> Result<Vec<LevelId>> {
    resolve_levels(&args.levels, engine.catalog())
}

fn run_fresh(
    args: &Args,
    tester: &LevelTester,
    strategy: PlayStrategy,
    seeds: &[u64],
) -> Result<Vec<LevelResult>> {
    let probe = GameEngine::with_defaults(MemoryBackend::new())
        .context("failed to load the embedded catalog")?;
    let mut results = Vec::new();
    for level_id in level_ids(args, &probe)? {
        results.extend(tester.run_level(level_id, strategy, seeds, args.iterations));
    }
    Ok(results)
}

fn run_on_save_file(
    args: &Args,
    path: &Path,
    tester: &LevelTester,
    strategy: PlayStrategy,
    seeds: &[u64],
) -> Result<(Vec<LevelResult>, Option<ProgressSummary>)> {
    let backend = JsonFileBackend::open(path)
        .with_context(|| format!("failed to open save file {}", path.display()))?;
    let mut engine =
        GameEngine::with_defaults(backend).context("failed to load the embedded catalog")?;

    let mut results = Vec::new();
    for level_id in level_ids(args, &engine)? {
        results.extend(tester.run_level_on(
            &mut engine,
            level_id,
            strategy,
            seeds,
            args.iterations,
        ));
    }
    let summary = engine.summary();

    let (_, closed) = engine.close();
    closed.with_context(|| format!("failed to write save file {}", path.display()))?;
    Ok((results, Some(summary)))
}

fn write_reports(
    args: &Args,
    results: &[LevelResult],
    summary: Option<&ProgressSummary>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Brain Ladder Level Test Results\n\n_No levels played._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No levels played.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    summary,
                    start_time.elapsed(),
                )?;
            }
        }
    }

    if args.report != "json" {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
