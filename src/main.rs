use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use u_rotation::cp::SolverConfig;
use u_rotation::display::{render_kpi, render_schedule};
use u_rotation::kpi::RotationKpi;
use u_rotation::models::{GroupStrategy, RotationConfig, Schedule};
use u_rotation::validation::validate_schedule;
use u_rotation::{run_bench_planner, run_court_planner, run_group_planner, run_pipeline, store};

/// Stage or report to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Command {
    /// Plan who sits out each round (discards groups and courts)
    Bench,
    /// Plan the units of four from the saved bench layer
    Group,
    /// Plan teams and courts from the saved group layer
    Court,
    /// Run all three stages from scratch
    All,
    /// Print the saved schedule and its metrics
    Show,
    /// Re-check every invariant of the saved schedule
    Check,
}

#[derive(Parser, Debug)]
#[command(name = "u-rotation", version, about)]
struct CliArgs {
    /// Number of players
    #[arg(short = 'p', long, default_value_t = 12)]
    players: usize,

    /// Number of rounds
    #[arg(short = 'r', long, default_value_t = 6)]
    rounds: usize,

    /// Number of courts
    #[arg(short = 'c', long, default_value_t = 3)]
    courts: usize,

    /// State file shared between stages
    #[arg(short = 'f', long, default_value = "rotation.json")]
    file: PathBuf,

    /// Rounds a player plays after a bench turn before the next one
    #[arg(long)]
    cooldown: Option<usize>,

    /// Maximum rounds any pair may share a court
    #[arg(long)]
    max_co_occurrence: Option<usize>,

    /// Solve the group stage as one model over all rounds
    #[arg(long)]
    joint: bool,

    /// Cost of a pair sitting out together again (0 = ignore)
    #[arg(long, default_value_t = 1)]
    bench_pair_weight: i64,

    /// Keep teams from a previous court run instead of re-splitting
    #[arg(long)]
    keep_teams: bool,

    /// Search budget per stage (seconds, 0 = unlimited)
    #[arg(long, default_value_t = 30)]
    time_limit: u64,

    /// Seed for the search order
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(value_enum)]
    command: Command,
}

impl CliArgs {
    fn config(&self) -> RotationConfig {
        let mut solver = SolverConfig::default().with_seed(self.seed);
        solver = if self.time_limit == 0 {
            solver.without_time_limit()
        } else {
            solver.with_time_limit_ms(self.time_limit * 1000)
        };

        let mut config = RotationConfig::new(self.players, self.courts, self.rounds)
            .with_bench_pair_weight(self.bench_pair_weight)
            .with_keep_teams(self.keep_teams)
            .with_solver(solver);
        if let Some(d) = self.cooldown {
            config = config.with_cooldown(d);
        }
        if let Some(cap) = self.max_co_occurrence {
            config = config.with_max_co_occurrence(cap);
        }
        if self.joint {
            config = config.with_group_strategy(GroupStrategy::Joint);
        }
        config
    }
}

fn load(args: &CliArgs) -> Result<Schedule> {
    store::load_schedule(&args.file)
        .with_context(|| format!("Failed to read state file {}", args.file.display()))
}

fn save(args: &CliArgs, schedule: &Schedule) -> Result<()> {
    store::save_schedule(&args.file, schedule)
        .with_context(|| format!("Failed to write state file {}", args.file.display()))?;
    info!(file = %args.file.display(), "state file written");
    Ok(())
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = args.config();
    info!(
        players = config.player_count,
        courts = config.court_count,
        rounds = config.round_count,
        bench = config.bench_size(),
        cooldown = config.cooldown(),
        cap = config.co_occurrence_cap(),
        "configuration"
    );

    let schedule = match args.command {
        Command::Bench => run_bench_planner(&Schedule::empty(&config), &config)?,
        Command::Group => run_group_planner(&load(&args)?, &config)?,
        Command::Court => run_court_planner(&load(&args)?, &config)?,
        Command::All => run_pipeline(&config)?,
        Command::Show => {
            let schedule = load(&args)?;
            print!("{}", render_schedule(&schedule));
            println!();
            print!("{}", render_kpi(&RotationKpi::calculate(&schedule)));
            return Ok(());
        }
        Command::Check => {
            let schedule = load(&args)?;
            if let Err(errors) = validate_schedule(&schedule, &config) {
                for error in &errors {
                    eprintln!("{:?}: {}", error.kind, error.message);
                }
                bail!("{} invariant violations", errors.len());
            }
            println!("schedule is valid ({:?} complete)", schedule.completed_stage());
            return Ok(());
        }
    };

    save(&args, &schedule)?;
    print!("{}", render_schedule(&schedule));
    if schedule.is_suboptimal() {
        println!("note: search budget expired before optimality was proven");
    }
    Ok(())
}
