use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use panel_tiler::common::config::{Config, config_file};
use panel_tiler::common::log;
use panel_tiler::layout_engine::LayoutEngine;
use panel_tiler::layout_engine::engine::LayoutCommand;
use panel_tiler::layout_engine::replay::replay;
use panel_tiler::persistence::{FileStore, LayoutPersistence};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the stored layout (overrides the configured one).
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current layout (the default).
    Show,
    /// Throw away the stored layout and start over from the default.
    Reset,
    /// Feed a JSON-lines gesture trace through the engine.
    Replay { file: PathBuf },
    /// Run one layout command, given as JSON, e.g. '"rebalance"'.
    Command { json: String },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    if let Err(err) = run(opt) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);
    let config = if config_path.exists() {
        Config::read(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        Config::default()
    };

    if opt.validate {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    let dir = opt.store.clone().unwrap_or_else(|| config.settings.storage.dir());
    let persistence = LayoutPersistence::new(
        Box::new(FileStore::new(dir)),
        config.settings.storage.key.clone(),
    );
    let mut engine = LayoutEngine::new(&config, persistence);

    match opt.command.unwrap_or(Commands::Show) {
        Commands::Show => {}
        Commands::Reset => {
            let _ = engine.handle_command(LayoutCommand::ResetLayout);
        }
        Commands::Replay { file } => {
            let trace = File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            let summary = replay(&mut engine, BufReader::new(trace))?;
            println!("replayed {} lines, {} changed the layout", summary.lines, summary.mutations);
        }
        Commands::Command { json } => {
            let command: LayoutCommand =
                serde_json::from_str(&json).with_context(|| format!("bad command {json}"))?;
            if !engine.handle_command(command).layout_changed {
                println!("layout unchanged");
            }
        }
    }

    print!("{}", engine.draw_tree());
    Ok(())
}
