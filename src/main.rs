//! Delvekeep - Entry Point
//!
//! Three ways to play:
//! - no flags: interactive prompt on stdin
//! - `--bot`: one automated run at watchable speed, events printed
//! - `--bot-soak`: a batch of automated runs with records and a summary

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;

use delvekeep::ai::{load_persona, load_persona_file, BotPersona, BotPolicy, InteractivePolicy, PolicyAgent};
use delvekeep::core::error::Result;
use delvekeep::core::SimulationConfig;
use delvekeep::harness::{
    append_json_lines, write_summary_json, GameSession, RunOrchestrator, RunRecordBuilder, Services, StepReport,
};
use delvekeep::turn::ActionRequest;
use delvekeep::world::{build_world, RoomsAndCorridors, World};

/// Delvekeep - deterministic dungeon crawler core with bot soak testing
#[derive(Parser, Debug)]
#[command(name = "delvekeep")]
#[command(about = "Play, watch the bot play, or soak-test the turn scheduler")]
struct Args {
    /// Single automated run at interactive speed
    #[arg(long, conflicts_with = "bot_soak")]
    bot: bool,

    /// Batch of automated runs as fast as possible
    #[arg(long)]
    bot_soak: bool,

    /// Number of runs in a soak batch
    #[arg(long, default_value_t = 100)]
    runs: u32,

    /// Tick limit per run
    #[arg(long, default_value_t = 5000)]
    max_turns: u64,

    /// Descending past this floor counts as a completed run
    #[arg(long, default_value_t = 5)]
    max_floors: u32,

    /// Append one JSON line per run to this file
    #[arg(long)]
    metrics_log: Option<PathBuf>,

    /// Merge the batch summary into this JSON file, keyed by persona
    #[arg(long)]
    telemetry_json: Option<PathBuf>,

    /// Base seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Persona name (loaded from data/personas/ or a built-in preset)
    #[arg(long, default_value = "balanced")]
    persona: String,

    /// Persona TOML file, overriding --persona
    #[arg(long)]
    persona_file: Option<PathBuf>,

    /// Simulation config TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause between ticks in --bot mode
    #[arg(long, default_value_t = 30)]
    pace_ms: u64,
}

/// Cosmetic delay between ticks so a human can follow the bot
struct BotPacing {
    delay: Duration,
}

impl BotPacing {
    fn new(pace_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(pace_ms.min(1000)),
        }
    }

    fn pause(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("delvekeep=info")),
        )
        .init();

    let args = Args::parse();
    let result = if args.bot_soak {
        run_soak(&args)
    } else if args.bot {
        run_bot(&args)
    } else {
        run_interactive(&args)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "setup failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_bot_persona(args: &Args) -> Result<BotPersona> {
    match &args.persona_file {
        Some(path) => load_persona_file(path),
        None => load_persona(&args.persona),
    }
}

fn run_soak(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let persona = load_bot_persona(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!(seed, persona = %persona.name, "soak batch");

    let mut orchestrator = RunOrchestrator::new(config, persona, RoomsAndCorridors);
    let records = orchestrator.run_batch(args.runs, seed, args.max_turns, args.max_floors)?;

    if let Some(path) = &args.metrics_log {
        append_json_lines(path, &records)?;
    }
    let summary = orchestrator.metrics().summary();
    if let Some(path) = &args.telemetry_json {
        write_summary_json(path, &summary)?;
    }
    println!("{}", summary.render_table());
    println!("base seed: {seed}");
    Ok(())
}

fn run_bot(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let persona = load_bot_persona(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let factory = RoomsAndCorridors;
    let world = Rc::new(RefCell::new(build_world(&factory, &config, seed)?));

    let mut services = Services::new();
    services.reset_all(Some(&world));
    let mut record = RunRecordBuilder::new(0, seed, persona.name.clone());
    let policy = BotPolicy::new(persona, &config);
    let mut session = GameSession::new(Rc::clone(&world), policy, &config, &factory, seed, args.max_floors);
    let pacing = BotPacing::new(args.pace_ms);

    println!("seed {seed}, persona {}", session.policy().name());
    let outcome = loop {
        if session.ticks() >= args.max_turns {
            break "tick limit";
        }
        if session.idle_streak() >= config.max_idle_ticks {
            break "stalled";
        }
        let report = session.step(&mut services, &mut record)?;
        print_report(&world.borrow(), &report);

        let w = world.borrow();
        if w.mode.is_terminal() {
            break if w.player().is_some_and(|p| p.is_alive()) { "completed" } else { "died" };
        }
        drop(w);
        pacing.pause();
    };
    session.finish_counters(&services, &mut record);
    services.reset_all(None);

    println!("{}", world.borrow().render());
    println!("run ended: {outcome} after {} turns on floor {}", session.turns(), session.depth());
    Ok(())
}

fn print_report(world: &World, report: &StepReport) {
    for event in &report.events {
        println!("[{:>5}] {}", world.turn, event.describe(world));
    }
    if report.rejected {
        println!("[{:>5}] move rejected", world.turn);
    }
}

/// Translate one line of input into an action
fn parse_command(line: &str, world: &World) -> Option<ActionRequest> {
    let (dx, dy) = match line {
        "8" | "n" => (0, -1),
        "2" | "s" => (0, 1),
        "6" | "e" => (1, 0),
        "4" | "w" => (-1, 0),
        "9" | "ne" => (1, -1),
        "7" | "nw" => (-1, -1),
        "3" | "se" => (1, 1),
        "1" | "sw" => (-1, 1),
        "5" | "." | "wait" => return Some(ActionRequest::Wait),
        "x" | "explore" => return Some(ActionRequest::StartExploring),
        "c" | "cancel" => return Some(ActionRequest::CancelExploring),
        "f" | "search" => return Some(ActionRequest::Search),
        ">" | "descend" => return Some(ActionRequest::Descend),
        "q" | "quaff" => {
            let item = world.player()?.inventory.first_healing()?;
            return Some(ActionRequest::UseItem { item, target: None });
        }
        _ => return None,
    };
    Some(ActionRequest::Move { dx, dy })
}

fn run_interactive(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let factory = RoomsAndCorridors;
    let world = Rc::new(RefCell::new(build_world(&factory, &config, seed)?));

    let mut services = Services::new();
    services.reset_all(Some(&world));
    let mut record = RunRecordBuilder::new(0, seed, "interactive");
    let mut session = GameSession::new(
        Rc::clone(&world),
        InteractivePolicy::new(&config),
        &config,
        &factory,
        seed,
        args.max_floors,
    );

    println!("\n=== DELVEKEEP === (seed {seed})");
    println!("Commands:");
    println!("  1-9 (numpad)      - move, or n s e w ne nw se sw");
    println!("  5 / .             - wait");
    println!("  x / c             - start / cancel auto-explore");
    println!("  f                 - search for traps");
    println!("  q                 - quaff a healing potion");
    println!("  >                 - descend stairs");
    println!("  quit              - exit");

    let stdin = io::stdin();
    loop {
        println!("{}", world.borrow().render());
        if world.borrow().mode.is_terminal() {
            println!("game over");
            break;
        }
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "quit" {
            break;
        }
        let Some(action) = parse_command(line, &world.borrow()) else {
            println!("unknown command: {line}");
            continue;
        };
        session.policy_mut().push(action);

        // Assisted exploration keeps stepping until it stops itself
        loop {
            let report = session.step(&mut services, &mut record)?;
            print_report(&world.borrow(), &report);
            let exploring = world.borrow().player().is_some_and(|p| p.is_exploring());
            if report.action.is_none() || !exploring || world.borrow().mode.is_terminal() {
                break;
            }
        }
    }
    services.reset_all(None);
    Ok(())
}
