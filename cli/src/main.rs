use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use combat_engine::api::{builtin_bestiary, load_encounter, simulate_encounter, simulate_encounter_many};
use combat_engine::content::builtin_encounters;
use combat_engine::{AdMode, Dice};
use tracing_subscriber::filter::LevelFilter;

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll a d20 multiple times with optional advantage/disadvantage
    Roll {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Advantage mode
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        /// Number of rolls
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
    /// Perform a check against a DC using a modifier and (dis)advantage
    Check {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Advantage mode
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        /// Difficulty Class to beat (>=)
        #[arg(long)]
        dc: i32,
        /// Ability/skill modifier to add to the d20
        #[arg(long, default_value_t = 0)]
        modifier: i32,
    },
    /// List the built-in creatures and encounters
    Creatures,
    /// Fight one encounter and print the narration
    Simulate {
        /// Built-in encounter name or path to a YAML/JSON encounter file
        #[arg(long, default_value = "snake_pit")]
        encounter: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Print the result as JSON instead of narration
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Monte Carlo: many fights of one encounter, seeds seed..seed+runs
    Batch {
        /// Built-in encounter name or path to a YAML/JSON encounter file
        #[arg(long, default_value = "snake_pit")]
        encounter: String,
        /// Number of fights
        #[arg(long, default_value_t = 200)]
        runs: u32,
        /// Base RNG seed (fight i uses seed+i)
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
}

#[derive(Parser)]
#[command(name = "combat")]
#[command(about = "Grapple-aware combat engine harness")]
struct Cli {
    /// More tracing output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Suppress narration on stdout
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

fn to_mode(a: Adv) -> AdMode {
    match a {
        Adv::Normal => AdMode::Normal,
        Adv::Advantage => AdMode::Advantage,
        Adv::Disadvantage => AdMode::Disadvantage,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Roll { seed, adv, rolls } => {
            let mode = to_mode(adv);
            let mut dice = Dice::from_seed(seed);
            for _ in 0..rolls {
                println!("{}", dice.d20(mode));
            }
        }
        Cmd::Check { seed, adv, dc, modifier } => {
            let mode = to_mode(adv);
            let mut dice = Dice::from_seed(seed);
            let res = combat_engine::check(&mut dice, combat_engine::CheckInput { dc, modifier, mode });
            println!(
                "roll={} mod={} total={} dc={} => {}",
                res.roll,
                modifier,
                res.total,
                res.dc,
                if res.passed { "SUCCESS" } else { "FAIL" }
            );
        }
        Cmd::Creatures => {
            let bestiary = builtin_bestiary()?;
            println!("creatures:");
            for (id, spec) in &bestiary {
                let grapple = match &spec.grapple {
                    Some(g) => format!(" grapple={} reach={} capacity={}", g.damage, g.reach, g.capacity),
                    None => String::new(),
                };
                println!(
                    "  {:<24} {} (HP {}, AC {}, {:?}){}",
                    id, spec.name, spec.hp, spec.ac, spec.size, grapple
                );
            }
            let mut encounters: Vec<_> = builtin_encounters().into_keys().collect();
            encounters.sort_unstable();
            println!("encounters:");
            for name in encounters {
                println!("  {}", name);
            }
        }
        Cmd::Simulate { encounter, seed, json } => {
            let file = load_encounter(&encounter)
                .with_context(|| format!("cannot load encounter '{}'", encounter))?;
            tracing::debug!(encounter = %file.name, seed, "simulating one fight");
            let result = simulate_encounter(&file, seed, !cli.quiet || json)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            if !cli.quiet {
                for line in &result.log {
                    println!("{}", line);
                }
            }
            println!(
                "winner={} rounds={}",
                result.winner.as_deref().unwrap_or("none"),
                result.rounds
            );
            for actor in &result.actors {
                println!(
                    "  {:<24} [{}] HP {}/{}{}",
                    actor.name,
                    actor.team,
                    actor.hp,
                    actor.max_hp,
                    if actor.alive { "" } else { " (dead)" }
                );
            }
        }
        Cmd::Batch { encounter, runs, seed } => {
            let file = load_encounter(&encounter)
                .with_context(|| format!("cannot load encounter '{}'", encounter))?;
            tracing::debug!(encounter = %file.name, runs, seed, "starting batch");
            let summary = simulate_encounter_many(&file, seed, runs)?;
            println!("encounter={} runs={}", summary.encounter, summary.runs);
            for (team, wins) in &summary.wins {
                println!(
                    "  {:<12} wins={} ({:.1}%)",
                    team,
                    wins,
                    summary.win_rate(team) * 100.0
                );
            }
            println!("  unresolved={} mean_rounds={:.2}", summary.unresolved, summary.mean_rounds);
        }
    }
    Ok(())
}
