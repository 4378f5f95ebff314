//! Madden Imperialism - command line front end
//!
//! Every command loads the save, applies one change or query, and writes the
//! save back atomically when something changed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use madden_imperialism::core::error::{GameError, Result};
use madden_imperialism::core::{CountyId, GameConfig, TeamId};
use madden_imperialism::game::{parse_team_line, GameSession, TeamRoster};
use madden_imperialism::history::{Battle, BattleOutcome};
use madden_imperialism::map::{Color, CountyAtlas, DistanceMetric};
use madden_imperialism::persist::{self, SaveFile};
use madden_imperialism::render;

/// Madden Imperialism - conquer the US one county at a time
#[derive(Parser, Debug)]
#[command(name = "madden-imperialism", version)]
#[command(about = "Territory conquest over US counties with a replayable battle log")]
struct Cli {
    /// Save file (defaults to save.path from the config)
    #[arg(long, global = true)]
    save: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Partition the map between teams and start a new game
    New {
        /// County CSV with fips,name,state,lat,lng columns
        #[arg(long)]
        counties: PathBuf,

        /// TOML roster with [[team]] entries
        #[arg(long)]
        teams: Option<PathBuf>,

        /// Extra team as "Name, lat, lon" (repeatable)
        #[arg(long = "team")]
        team_lines: Vec<String>,

        /// Distance metric for the partition and spins
        #[arg(long, value_enum)]
        metric: Option<DistanceMetric>,

        /// Seed for random team colors
        #[arg(long)]
        seed: Option<u64>,

        /// Overwrite an existing save
        #[arg(long)]
        force: bool,
    },

    /// Edit a team
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Pick a random matchup and hold it until `resolve`
    Spin {
        /// Seed for deterministic spins
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Record the result of the pending spin
    Resolve {
        #[arg(value_enum)]
        winner: BattleOutcome,
    },

    /// Record a battle directly
    Battle {
        #[arg(long)]
        attacker: String,
        #[arg(long)]
        defender: String,
        /// County FIPS code
        #[arg(long)]
        county: String,
        #[arg(long, value_enum)]
        outcome: BattleOutcome,
    },

    /// Show current standings
    Status {
        /// Print standings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show standings as they were after the first STEP battles
    Replay {
        #[arg(allow_negative_numbers = true)]
        step: i64,
    },

    /// List every recorded battle
    History {
        /// Mark the battle that produced this step
        #[arg(long, allow_negative_numbers = true)]
        step: Option<i64>,
    },

    /// Export a PNG map
    Render {
        /// Step to draw (defaults to the latest)
        #[arg(long, allow_negative_numbers = true)]
        step: Option<i64>,

        #[arg(long, default_value = "map.png")]
        out: PathBuf,
    },

    /// Check the save replays to the stored state
    Verify,
}

#[derive(Subcommand, Debug)]
enum TeamAction {
    Rename { id: String, name: String },
    /// COLOR is `rgb(r, g, b)` or `#rrggbb`
    Recolor { id: String, color: String },
    /// Only teams that never held land or fought can be removed
    Remove { id: String },
}

/// A session loaded from disk along with where it came from
struct Game {
    session: GameSession,
    counties_path: PathBuf,
}

impl Game {
    fn open(save_path: &Path, config: GameConfig) -> Result<Self> {
        let (session, counties_path) = persist::open_game(save_path, config)?;
        Ok(Self { session, counties_path })
    }

    fn store(&self, save_path: &Path) -> Result<()> {
        let save = SaveFile::from_session(&self.session, Some(self.counties_path.clone()))?;
        persist::save(save_path, &save)
    }
}

fn rng_from(seed: Option<u64>) -> ChaCha8Rng {
    let seed = seed.unwrap_or_else(rand::random);
    tracing::debug!(seed, "rng seeded");
    ChaCha8Rng::seed_from_u64(seed)
}

fn print_standings(session: &GameSession) -> Result<()> {
    let engine = session.engine()?;
    let standings = engine.standings_at_step(engine.len())?;
    print!("{}", render::format_standings(session.roster(), &standings));
    Ok(())
}

fn announce_winner(session: &GameSession) -> Result<()> {
    if let Some(team) = session.winner()? {
        println!("{} controls the whole map!", team.name);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_new(
    save_path: &Path,
    mut config: GameConfig,
    counties: PathBuf,
    teams: Option<PathBuf>,
    team_lines: &[String],
    metric: Option<DistanceMetric>,
    seed: Option<u64>,
    force: bool,
) -> Result<()> {
    if save_path.exists() && !force {
        return Err(GameError::InvalidSetup(format!(
            "{} already exists; pass --force to overwrite it",
            save_path.display()
        )));
    }
    if let Some(metric) = metric {
        config.partition.metric = metric;
    }

    // Stored absolute so later commands work from any directory
    let counties = std::fs::canonicalize(&counties)?;
    let mut rng = rng_from(seed);
    let atlas = CountyAtlas::load_csv(&counties)?;
    let mut session = GameSession::new(atlas, config);

    if let Some(path) = teams {
        for team in TeamRoster::load(&path, &mut rng)?.teams() {
            session.add_team(team.clone())?;
        }
    }
    for line in team_lines {
        session.add_team(parse_team_line(line, &mut rng)?)?;
    }

    session.start()?;
    let game = Game { session, counties_path: counties };
    game.store(save_path)?;

    let engine = game.session.engine()?;
    println!(
        "New game {}: {} counties split between {} teams ({}).",
        game.session.id(),
        engine.initial().len(),
        game.session.roster().len(),
        game.session.metric().name(),
    );
    if !game.session.excluded().is_empty() {
        println!(
            "{} counties left out for bad geometry.",
            game.session.excluded().len()
        );
    }
    print_standings(&game.session)
}

fn cmd_team(save_path: &Path, config: GameConfig, action: TeamAction) -> Result<()> {
    let mut game = Game::open(save_path, config)?;
    match action {
        TeamAction::Rename { id, name } => {
            game.session.rename_team(&TeamId::new(id), name)?;
        }
        TeamAction::Recolor { id, color } => {
            let color: Color = color.parse()?;
            game.session.recolor_team(&TeamId::new(id), color)?;
        }
        TeamAction::Remove { id } => {
            let team = game.session.remove_team(&TeamId::new(id))?;
            println!("Removed {}.", team.name);
        }
    }
    game.store(save_path)
}

fn cmd_spin(save_path: &Path, config: GameConfig, seed: Option<u64>) -> Result<()> {
    let mut game = Game::open(save_path, config)?;
    let mut rng = rng_from(seed);
    let matchup = game.session.spin(&mut rng)?.cloned();
    let line = match matchup {
        Some(m) => {
            let roster = game.session.roster();
            let county = game
                .session
                .atlas()
                .get(&m.county)
                .map(|c| c.label())
                .unwrap_or_else(|| m.county.to_string());
            format!(
                "{} attacks {} ({}) over {}",
                roster.name_of(&m.attacker),
                roster.name_of(&m.defender),
                m.direction.abbrev(),
                county
            )
        }
        None => "No matchup possible: fewer than two teams hold land.".to_string(),
    };
    println!("{}", line);
    game.store(save_path)
}

fn cmd_resolve(save_path: &Path, config: GameConfig, outcome: BattleOutcome) -> Result<()> {
    let mut game = Game::open(save_path, config)?;
    let event = game.session.resolve_pending(outcome)?.clone();
    println!(
        "{}",
        render::describe_event(game.session.roster(), game.session.atlas(), &event)
    );
    game.store(save_path)?;
    announce_winner(&game.session)
}

fn cmd_battle(save_path: &Path, config: GameConfig, battle: Battle) -> Result<()> {
    let mut game = Game::open(save_path, config)?;
    let event = game.session.record_battle(battle)?.clone();
    println!(
        "{}",
        render::describe_event(game.session.roster(), game.session.atlas(), &event)
    );
    game.store(save_path)?;
    announce_winner(&game.session)
}

fn cmd_status(save_path: &Path, config: GameConfig, json: bool) -> Result<()> {
    let game = Game::open(save_path, config)?;
    let session = &game.session;
    let engine = session.engine()?;

    if json {
        let standings = engine.standings_at_step(engine.len())?;
        println!("{}", serde_json::to_string_pretty(&standings)?);
        return Ok(());
    }

    println!("Game {} after {} battles", session.id(), engine.len());
    print_standings(session)?;
    if let Some(m) = session.pending() {
        println!(
            "Pending: {} attacks {} over {}",
            session.roster().name_of(&m.attacker),
            session.roster().name_of(&m.defender),
            m.county
        );
    }
    announce_winner(session)
}

fn cmd_replay(save_path: &Path, config: GameConfig, step: i64) -> Result<()> {
    let game = Game::open(save_path, config)?;
    let session = &game.session;
    let engine = session.engine()?;
    let step = engine.resolve_step(step)?;

    let standings = engine.standings_at_step(step)?;
    println!("Step {} of {}", step, engine.len());
    print!("{}", render::format_standings(session.roster(), &standings));

    let changed = engine.changed_counties(step, engine.len())?;
    if !changed.is_empty() {
        println!("{} counties change hands after this step:", changed.len());
        for county in changed.iter().take(20) {
            let label = session
                .atlas()
                .get(county)
                .map(|c| c.label())
                .unwrap_or_else(|| county.to_string());
            println!("  {}", label);
        }
        if changed.len() > 20 {
            println!("  ...");
        }
    }
    Ok(())
}

fn cmd_history(save_path: &Path, config: GameConfig, step: Option<i64>) -> Result<()> {
    let game = Game::open(save_path, config)?;
    let engine = game.session.engine()?;
    let marker = step.map(|s| engine.resolve_step(s)).transpose()?;
    print!(
        "{}",
        render::format_history(game.session.roster(), game.session.atlas(), engine.events(), marker)
    );
    Ok(())
}

fn cmd_render(save_path: &Path, config: GameConfig, step: Option<i64>, out: &Path) -> Result<()> {
    let game = Game::open(save_path, config)?;
    let session = &game.session;
    let engine = session.engine()?;
    let step = match step {
        Some(step) => engine.resolve_step(step)?,
        None => engine.len(),
    };

    let snapshot = engine.ownership_at_step(step)?;
    let highlight = match step {
        0 => None,
        step => Some(engine.changed_counties(step - 1, step)?),
    };
    render::export_png(
        session.atlas(),
        session.roster(),
        &snapshot,
        highlight.as_ref(),
        &session.config().render,
        out,
    )?;
    println!("Wrote step {} to {}", step, out.display());
    Ok(())
}

fn cmd_verify(save_path: &Path, config: GameConfig) -> Result<()> {
    let game = Game::open(save_path, config)?;
    let engine = game.session.engine()?;
    if !engine.verify() {
        return Err(GameError::SaveCorrupt(
            "replayed log does not match the live snapshot".to_string(),
        ));
    }
    println!("OK: {} battles replay cleanly.", engine.len());
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let save_path = cli.save.clone().unwrap_or_else(|| config.save.path.clone());

    match cli.command {
        Command::New {
            counties,
            teams,
            team_lines,
            metric,
            seed,
            force,
        } => cmd_new(&save_path, config, counties, teams, &team_lines, metric, seed, force),
        Command::Team { action } => cmd_team(&save_path, config, action),
        Command::Spin { seed } => cmd_spin(&save_path, config, seed),
        Command::Resolve { winner } => cmd_resolve(&save_path, config, winner),
        Command::Battle {
            attacker,
            defender,
            county,
            outcome,
        } => {
            let battle = Battle::new(
                TeamId::new(attacker),
                TeamId::new(defender),
                CountyId::normalize(&county),
                outcome,
            );
            cmd_battle(&save_path, config, battle)
        }
        Command::Status { json } => cmd_status(&save_path, config, json),
        Command::Replay { step } => cmd_replay(&save_path, config, step),
        Command::History { step } => cmd_history(&save_path, config, step),
        Command::Render { step, out } => cmd_render(&save_path, config, step, &out),
        Command::Verify => cmd_verify(&save_path, config),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("madden_imperialism=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if matches!(e, GameError::SaveCorrupt(_)) {
                eprintln!("The save cannot be used; start a fresh game with `new --force`.");
            }
            ExitCode::FAILURE
        }
    }
}
