mod clock;
mod config;
mod domain;
mod error;
mod input;
mod persistence;
mod report;
mod ticker;
mod tracker;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clock::{Clock, SystemClock};
use config::{load_config, save_config, Config};
use domain::GlobalState;
use persistence::{ensure_dir, init_local_dir, report_file, resolve_data_dir, Store};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;
use ticker::Interval;
use tracker::Tracker;

#[derive(Parser)]
#[command(name = "timetracker")]
#[command(about = "Track time spent on tickets and their todos, per day", long_about = None)]
struct Cli {
    /// Data directory (overrides TIMETRACKER_DIR and any local .timetracker)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Restart the ticket and todo that were selected when the last session ended
    #[arg(long)]
    resume: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .timetracker directory in the current directory
    Init,
    /// Print tickets with their tracked time
    List {
        /// Include tickets and todos marked done
        #[arg(short, long)]
        all: bool,
    },
    /// Write a markdown report of the time tracked on one day
    Report {
        /// Date to report on (YYYY-MM-DD format). Defaults to today.
        #[arg(short, long)]
        date: Option<String>,
        /// Output file path. Defaults to <data dir>/report-YYYY-MM-DD.md
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let base = std::env::current_dir().context("Could not determine current directory")?;
            let dir = init_local_dir(&base)?;
            save_config(&dir, &Config::default())?;
            println!("Initialized tracker directory: {}", dir.display());
            println!();
            println!("Run 'timetracker' from here to track time in this directory.");
            Ok(())
        }
        Some(Commands::List { all }) => {
            let dir = resolve_data_dir(cli.dir.as_deref())?;
            let config = load_config(&dir)?;
            let store = Store::new(&dir, &config);
            let mut tracker = Tracker::open(SystemClock, config.status_scheme, &store)?;
            tracker.set_hide_done(!all);
            print!("{}", input::render_listing(&tracker));
            Ok(())
        }
        Some(Commands::Report { date, output }) => {
            let dir = resolve_data_dir(cli.dir.as_deref())?;
            let config = load_config(&dir)?;
            let report_date = match date {
                Some(date_str) => chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                    .map_err(|e| anyhow::anyhow!("Invalid date format. Use YYYY-MM-DD: {}", e))?,
                None => chrono::Local::now().date_naive(),
            };
            let output = output.unwrap_or_else(|| report_file(&dir, report_date));

            let store = Store::new(&dir, &config);
            let tracker = Tracker::open(SystemClock, config.status_scheme, &store)?;
            let path = report::generate_report(
                tracker.registry().tickets(),
                report_date,
                tracker.now(),
                &output,
            )?;
            println!("Report generated: {}", path.display());
            Ok(())
        }
        None => {
            let dir = resolve_data_dir(cli.dir.as_deref())?;
            run_session(&dir, cli.resume)
        }
    }
}

/// Read stdin on its own thread; the receiver disconnects at end of input
fn spawn_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });
    receiver
}

fn run_session(dir: &Path, resume: bool) -> Result<()> {
    ensure_dir(dir)?;
    let config = load_config(dir)?;
    log::info!("Using data directory {}", dir.display());

    let store = Store::new(dir, &config);
    let mut tracker = Tracker::load(SystemClock, config.status_scheme, &store);
    tracker.set_hide_done(config.hide_done);
    if resume {
        tracker.restore_selection();
    } else if tracker.selection_hint().ticket.is_some() {
        log::info!("Run with --resume to restart the last selected ticket");
    }

    let lines = spawn_reader();
    serve(&mut tracker, &store, &lines, &mut io::stdout(), dir, &config)
}

/// Run the command loop, then stop every timer and write the final state,
/// also when the loop failed. The loop error wins over a failed final save.
fn serve<C: Clock, W: Write>(
    tracker: &mut Tracker<C>,
    store: &Store,
    lines: &Receiver<String>,
    out: &mut W,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    let outcome = command_loop(tracker, store, lines, out, dir, config);
    let saved = tracker
        .shutdown(store)
        .context("Failed to save tracker state on exit");
    match outcome {
        Ok(()) => saved,
        Err(e) => {
            if let Err(save_err) = saved {
                log::error!("{:#}", save_err);
            }
            Err(e)
        }
    }
}

fn command_loop<C: Clock, W: Write>(
    tracker: &mut Tracker<C>,
    store: &Store,
    lines: &Receiver<String>,
    out: &mut W,
    dir: &Path,
    config: &Config,
) -> Result<()> {
    write!(out, "{}", input::render_listing(tracker))?;
    writeln!(out, "Type 'help' for commands.")?;
    out.flush()?;

    let tick_rate = config.tick_interval();
    let mut autosave = Interval::new(config.autosave_interval(), Instant::now());

    loop {
        let wait = tick_rate.min(autosave.remaining(Instant::now()));
        match lines.recv_timeout(wait) {
            Ok(line) => {
                let should_quit = input::handle_line(tracker, store, &line, out)?;
                out.flush()?;
                if should_quit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(finished) = tracker.tick() {
            write_day_report(tracker, dir, finished);
        }

        if autosave.due(Instant::now())
            && (tracker.needs_save() || tracker.global_state() == GlobalState::Running)
        {
            if let Err(e) = tracker.save(store) {
                log::error!("Autosave failed, retrying at the next interval: {}", e);
            }
        }
    }
    Ok(())
}

fn write_day_report<C: Clock>(tracker: &Tracker<C>, dir: &Path, date: chrono::NaiveDate) {
    let output = report_file(dir, date);
    if let Err(e) = report::generate_report(tracker.registry().tickets(), date, tracker.now(), &output) {
        log::warn!("Failed to generate report for {}: {}", date, e);
    }
}
