//! Ludics CLI
//!
//! Usage:
//!   ludics compile --moves feed.json --out designs/     # Compile a move feed
//!   ludics step --pos a.json --neg b.json               # Step two designs
//!   ludics copy --design d.json --base 0.1 --count 2    # Copy a subtree
//!   ludics instantiate --design d.json --base 0.1 --name x
//!   ludics uniform --design d.json --base 0 --a 0.1 --b 0.2
//!   ludics serve                                        # HTTP API server
//!   ludics --json step ...                              # JSON output

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use ludics::config::EngineConfig;
use ludics::core::{
    load_design, load_moves, run_server, save_design, save_json, trace_fingerprint, LudicsEngine, StepRequest,
};
use ludics::types::{pair_lines, CompositionMode, Design, Locus, Phase, ScopingStrategy, StepOutput};
use ludics::{Result, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "ludics",
    version = VERSION,
    about = "Ludics interaction engine - compile dialogues to designs and step them",
    long_about = "Compiles deliberation move feeds into Proponent/Opponent designs and\n\
                  runs the interaction between them.\n\n\
                  Trace status:\n  \
                  CONVERGENT - every branch closed by a daimon\n  \
                  DIVERGENT  - the designs disagree at some locus\n  \
                  STUCK      - nobody can play at a required locus\n  \
                  ONGOING    - the pair budget ran out"
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    no_color: bool,

    /// Debug logging and per-pair listings
    #[arg(long, global = true)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a move feed into designs
    Compile {
        /// JSON array of moves
        #[arg(long)]
        moves: PathBuf,
        /// legacy | topic | actor-pair | argument
        #[arg(long)]
        strategy: Option<ScopingStrategy>,
        /// Directory to write one file per design
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Step a positive design against a negative one
    Step {
        #[arg(long)]
        pos: PathBuf,
        #[arg(long)]
        neg: PathBuf,
        /// assoc | partial | spiritual
        #[arg(long)]
        mode: Option<CompositionMode>,
        /// neutral | focus-P | focus-O
        #[arg(long)]
        phase: Option<Phase>,
        #[arg(long)]
        max_pairs: Option<usize>,
    },
    /// Copy the subtree at a locus to fresh siblings
    Copy {
        #[arg(long)]
        design: PathBuf,
        #[arg(long)]
        base: Locus,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Write the new design here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Bind a witness name at a locus
    Instantiate {
        #[arg(long)]
        design: PathBuf,
        #[arg(long)]
        base: Locus,
        #[arg(long)]
        name: String,
        /// Make the binding final
        #[arg(long)]
        mask: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check whether two instances under a base are played alike
    Uniform {
        #[arg(long)]
        design: PathBuf,
        #[arg(long)]
        base: Locus,
        #[arg(long)]
        a: Locus,
        #[arg(long)]
        b: Locus,
    },
    /// Run the HTTP API server
    Serve {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = match EngineConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    let result = match cli.command {
        Command::Serve { ref addr } => run_serve(addr, config).await,
        _ => run(&cli, config),
    };
    if let Err(e) = result {
        fail(&e);
    }
}

fn fail(e: &ludics::LudicsError) -> ! {
    eprintln!("{} [{}] {}", "error:".red().bold(), e.code(), e);
    std::process::exit(1);
}

fn run(cli: &Cli, config: EngineConfig) -> Result<()> {
    let mut engine = LudicsEngine::new(config);
    match &cli.command {
        Command::Compile { moves, strategy, out } => run_compile(cli, &mut engine, moves, *strategy, out.as_deref()),
        Command::Step {
            pos,
            neg,
            mode,
            phase,
            max_pairs,
        } => {
            let pos_ref = engine.insert_design(load_design(pos)?);
            let neg_ref = engine.insert_design(load_design(neg)?);
            let request = StepRequest {
                mode: *mode,
                phase: *phase,
                max_pairs: *max_pairs,
                ..StepRequest::new(pos_ref.id, neg_ref.id)
            };
            run_step(cli, &engine, &request)
        }
        Command::Copy {
            design,
            base,
            count,
            out,
        } => {
            let id = engine.insert_design(load_design(design)?).id;
            let outcome = engine.copy_locus(&id, base, *count, None)?;
            if cli.json && out.is_none() {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }
            let children: Vec<String> = outcome.children.iter().map(|c| c.to_string()).collect();
            println!(
                "copied {} → [{}] ({} acts per copy)",
                base,
                children.join(", "),
                outcome.bijection.len()
            );
            emit_design(&outcome.design, out.as_deref())
        }
        Command::Instantiate {
            design,
            base,
            name,
            mask,
            out,
        } => {
            let id = engine.insert_design(load_design(design)?).id;
            let reference = engine.instantiate(&id, base, name, *mask, None)?;
            let updated = engine
                .design(&reference.id)
                .ok_or_else(|| ludics::LudicsError::DesignNotFound(reference.id.clone()))?;
            if !cli.json {
                println!("bound '{}' at {} ({}@v{})", name.trim(), base, reference.id, reference.version);
            }
            emit_design(&updated, out.as_deref())
        }
        Command::Uniform { design, base, a, b } => {
            let id = engine.insert_design(load_design(design)?).id;
            let result = engine.check_uniformity(&id, base, a, b)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{} {} vs {} under {}: {}", result.code.code(), a, b, base, result.display_value());
                if let Some(cx) = &result.counterexample {
                    println!("  a: {}", cx.a.as_ref().map(|l| l.to_string()).unwrap_or_else(|| "-".into()));
                    println!("  b: {}", cx.b.as_ref().map(|l| l.to_string()).unwrap_or_else(|| "-".into()));
                }
            }
            Ok(())
        }
        Command::Serve { .. } => Ok(()),
    }
}

fn run_compile(
    cli: &Cli,
    engine: &mut LudicsEngine,
    moves: &Path,
    strategy: Option<ScopingStrategy>,
    out: Option<&Path>,
) -> Result<()> {
    let feed = load_moves(moves)?;
    let output = engine.compile(&feed, strategy)?;

    if let Some(dir) = out {
        for scope in &output.scopes {
            save_design(&scope.proponent_design, dir)?;
            save_design(&scope.opponent_design, dir)?;
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} scope(s), strategy {}", output.scopes.len(), output.strategy);
    for scope in &output.scopes {
        println!(
            "  {:<32} P={} acts  O={} acts  moves={}  {}",
            scope.key,
            scope.proponent_design.len(),
            scope.opponent_design.len(),
            scope.metadata.move_count,
            scope.metadata.label.dimmed()
        );
    }
    if let Some(dir) = out {
        println!("designs written to {}", dir.display());
    }
    Ok(())
}

fn run_step(cli: &Cli, engine: &LudicsEngine, request: &StepRequest) -> Result<()> {
    let trace = engine.step(request)?;
    let fingerprint = trace_fingerprint(&trace);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&trace)?);
        return Ok(());
    }

    let output = StepOutput::new(&trace, fingerprint);
    if cli.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }
    if cli.verbose {
        for line in pair_lines(&trace) {
            println!("{}", line);
        }
    }
    for hint in &trace.daimon_hints {
        println!("  hint: {} could close at {}", hint.side, hint.locus);
    }
    Ok(())
}

fn emit_design(design: &Design, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            save_json(design, path)?;
            println!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(design)?),
    }
    Ok(())
}

async fn run_serve(addr: &str, config: EngineConfig) -> Result<()> {
    println!();
    println!("{}", format!("Ludics API Server v{}", VERSION).bold());
    println!();
    if let Err(e) = run_server(addr, config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
