//! Personality Demo - a composite agent over a scripted backend
//!
//! # Usage
//!
//! ```bash
//! # Answer a few prompts and print the transcript
//! personality-demo chat "I found a wallet" "It has cash in it"
//!
//! # Sweep the referee across temperatures with fixed candidates
//! personality-demo sweep --label low=0.2 --label high=1.2 --bypass "I found a wallet"
//!
//! # Pull the user inputs and Angel's answers out of a conversation
//! personality-demo scan --collect user --collect Angel "I found a wallet" "It has cash"
//!
//! # Use your own roster
//! personality-demo --roster alex.json about
//! ```
//!
//! No network backend ships with this crate; personas run against a scripted
//! `MockBackend` behind the retrying `ResilientBackend`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use personality_core::{PersonConfig, PersonaDefaults};
use personality_experiments::{
    answer_and_scan, ref_response_collector, Choices, Collect, Extraction, Selector, SweepRequest,
};
use personality_llm::{GenerationBackend, MockBackend, ResilientBackend, RetryConfig};
use personality_runtime::Person;

const DEFAULT_ROSTER: &str = r#"{
    "name": "Alex",
    "description": "Alex is a university student weighing everyday moral choices.",
    "personas": [
        {
            "name": "Angel",
            "instructions": "You are Angel, Alex's conscience. Argue for the honest, kind option.",
            "temperature": 0.7
        },
        {
            "name": "Devil",
            "instructions": "You are Devil, Alex's impulses. Argue for the tempting option.",
            "temperature": 1.1
        },
        {
            "name": "Ref",
            "instructions": "You are Ref, Alex's judgement. Choose one response and reply as Alex.",
            "role": "referee",
            "temperature": 0.2
        }
    ]
}"#;

const DEFAULT_PROMPTS: [&str; 2] = [
    "I found a wallet on the bus. What should I do?",
    "It has a lot of cash in it.",
];

#[derive(Parser)]
#[command(
    name = "personality-demo",
    version,
    about = "Composite agent demo: personas answer, a referee decides"
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON roster to load instead of the built-in one
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer prompts in order and print the transcript
    Chat(ChatArgs),

    /// Run the referee once per temperature label
    Sweep(SweepArgs),

    /// Answer prompts, then extract columns from the history
    Scan(ScanArgs),

    /// Describe the person and its personas
    About,
}

#[derive(Args)]
struct ChatArgs {
    /// Prompts to answer, in order
    prompts: Vec<String>,

    /// Don't show earlier turns to the personas
    #[arg(long)]
    no_context: bool,
}

#[derive(Args)]
struct SweepArgs {
    /// Prompts to sweep over
    prompts: Vec<String>,

    /// Temperature label as NAME=TEMP (repeatable)
    #[arg(long = "label", value_parser = parse_label)]
    labels: Vec<(String, f32)>,

    /// Use fixed candidates instead of asking the personas
    #[arg(long)]
    bypass: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Prompts to answer before scanning
    prompts: Vec<String>,

    /// What to collect: "user", "referee" or a persona name (repeatable)
    #[arg(long, default_value = "user")]
    collect: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let carry = !matches!(&cli.command, Commands::Chat(ChatArgs { no_context: true, .. }));
    let mut person = build_person(cli.roster.as_deref())?.with_context_carry(carry);

    match cli.command {
        Commands::Chat(args) => chat(&mut person, args).await?,
        Commands::Sweep(args) => sweep(&person, args).await?,
        Commands::Scan(args) => scan(&mut person, args).await?,
        Commands::About => println!("{}", person.about()),
    }

    println!("\n{}", "Metrics".bold());
    print!("{}", person.metrics().snapshot().to_prometheus());
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}

fn build_person(roster: Option<&std::path::Path>) -> Result<Person> {
    let document = match roster {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster {}", path.display()))?,
        None => DEFAULT_ROSTER.to_string(),
    };
    let config = PersonConfig::from_json(&document)?;

    let retry = RetryConfig::fixed(3, Duration::from_millis(250))
        .with_attempt_timeout(Duration::from_secs(30));
    let backend: Arc<dyn GenerationBackend> =
        Arc::new(ResilientBackend::new(scripted_backend(), retry));

    let person = Person::from_config(&config, &PersonaDefaults::from_env(), Some(backend))?;
    tracing::info!(person = %person.name(), id = %person.id(), "Person ready");
    Ok(person)
}

fn scripted_backend() -> MockBackend {
    MockBackend::scripted()
        .named("scripted")
        .with_latency(40)
        .on_system(
            "You are Angel",
            "Hand it in. Someone is probably panicking about it right now.",
        )
        .delay_on_system("You are Angel", 120)
        .on_system(
            "You are Devil",
            "Finders keepers. Nobody saw you pick it up.",
        )
        .on_system(
            "You are Ref",
            "I'll take it to the lost and found. It's what I'd want someone to do for me.",
        )
}

fn prompts_or_default(prompts: Vec<String>) -> Vec<String> {
    if prompts.is_empty() {
        DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect()
    } else {
        prompts
    }
}

async fn chat(person: &mut Person, args: ChatArgs) -> Result<()> {
    for prompt in prompts_or_default(args.prompts) {
        println!("{} {}", "user:".cyan().bold(), prompt);
        let reply = person.answer(&prompt).await?;
        println!("{} {}\n", format!("{}:", person.name()).green().bold(), reply);
    }

    println!("{}", "Transcript".bold());
    print!("{}", person.transcript());
    Ok(())
}

async fn sweep(person: &Person, args: SweepArgs) -> Result<()> {
    let prompts = prompts_or_default(args.prompts);
    let labels = if args.labels.is_empty() {
        vec![("low".to_string(), 0.2), ("high".to_string(), 1.2)]
    } else {
        args.labels
    };

    let mut request = labels
        .iter()
        .fold(SweepRequest::new(prompts.clone()), |req, (label, temp)| {
            req.temperature(label, *temp)
        });
    if args.bypass {
        request = request.bypass_with(fixed_choices(person, prompts.len()));
    }

    let results = ref_response_collector(person, &request).await?;
    for (label, picks) in &results {
        println!("{}", label.yellow().bold());
        for (prompt, pick) in prompts.iter().zip(picks) {
            println!("  {} {}", prompt.dimmed(), pick);
        }
    }
    Ok(())
}

/// The same two candidates for every prompt
fn fixed_choices(person: &Person, count: usize) -> Vec<Choices> {
    let names = person.persona_names();
    let candidates: Choices = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let text = if i % 2 == 0 {
                "Return it to its owner."
            } else {
                "Keep it, nobody will know."
            };
            (name.to_string(), text.to_string())
        })
        .collect();
    vec![candidates; count]
}

async fn scan(person: &mut Person, args: ScanArgs) -> Result<()> {
    let collect = match args.collect.as_slice() {
        [] => bail!("Nothing to collect"),
        [one] => Collect::One(Selector::from(one.as_str())),
        many => Collect::Many(many.iter().map(|s| Selector::from(s.as_str())).collect()),
    };

    let prompts = prompts_or_default(args.prompts);
    let prompts: Vec<&str> = prompts.iter().map(String::as_str).collect();

    match answer_and_scan(person, &prompts, &collect).await? {
        Extraction::Single(values) => {
            for value in values {
                println!("{}", value);
            }
        }
        Extraction::Aligned(columns) => {
            for (selector, values) in columns {
                println!("{}", selector.to_string().yellow().bold());
                for value in values {
                    println!("  {}", value);
                }
            }
        }
    }
    println!("\n{}", serde_json::to_string_pretty(person.thoughts())?);
    Ok(())
}

fn parse_label(s: &str) -> Result<(String, f32), String> {
    let (name, temp) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TEMP, got '{}'", s))?;
    let temp: f32 = temp
        .trim()
        .parse()
        .map_err(|e| format!("invalid temperature '{}': {}", temp, e))?;
    Ok((name.trim().to_string(), temp))
}
