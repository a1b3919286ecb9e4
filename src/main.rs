//! dprof - Save and restore multi-monitor display layouts.
//!
//! Provides both human-friendly and agent-friendly (robot mode) interfaces.
#![deny(unsafe_code)]

use std::io;

use clap::Parser;
use console::style;
use serde::Serialize;

use dprof::cli::{self, Cli, Commands, ConfigCommand};
use dprof::config::{EngineConfig, default_config_path, load_engine_config};
use dprof::engine::DisplayEngine;
use dprof::error::{DprofError, Result};
use dprof::logging::init_logging;
use dprof::output::{CheckResult, DiffResult, Output, OutputMode};
use dprof::platform::{self, NativePlatform};
use dprof::report::{describe, describe_live};
use dprof::snapshot::{SnapshotDb, diff};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> Option<&'static str> {
        option_env!("VERGEN_GIT_SHA")
    }

    pub fn build_timestamp() -> Option<&'static str> {
        option_env!("VERGEN_BUILD_TIMESTAMP")
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();
    if let Err(e) = run(&cli, output.as_ref()) {
        output.error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, out: &dyn Output) -> Result<()> {
    match &cli.command {
        None => {
            print_quick_start(cli);
            Ok(())
        }
        Some(Commands::Capture(args)) => cmd_capture(cli, out, args),
        Some(Commands::List) => cmd_list(cli, out),
        Some(Commands::Show(args)) => cmd_show(cli, out, args),
        Some(Commands::Diff(args)) => cmd_diff(cli, out, args),
        Some(Commands::Check(args)) => cmd_check(cli, out, args),
        Some(Commands::Apply(args)) => cmd_apply(cli, out, args),
        Some(Commands::Delete(args)) => cmd_delete(cli, out, args),
        Some(Commands::Export(args)) => cmd_export(cli, out, args),
        Some(Commands::Import(args)) => cmd_import(cli, out, args),
        Some(Commands::Vendors) => cmd_vendors(cli, out),
        Some(Commands::Config(command)) => cmd_config(cli, out, command),
        Some(Commands::Version) => {
            out.version_info(
                build_info::VERSION,
                build_info::git_sha(),
                build_info::build_timestamp(),
            );
            Ok(())
        }
        Some(Commands::Completions(args)) => {
            use clap::CommandFactory;
            clap_complete::generate(args.shell, &mut Cli::command(), "dprof", &mut io::stdout());
            Ok(())
        }
    }
}

// === Quick Start ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    inspect: [&'static str; 3],
    save_and_restore: [&'static str; 3],
    output_modes: [&'static str; 3],
}

fn print_quick_start(cli: &Cli) {
    if cli.use_json() {
        let help = RobotQuickStart {
            tool: "dprof",
            version: build_info::VERSION,
            description: "Capture, reconcile and reapply multi-monitor display layouts",
            inspect: ["dprof show --robot", "dprof list --robot", "dprof vendors --robot"],
            save_and_restore: [
                "dprof capture --save <NAME>",
                "dprof check <NAME>",
                "dprof apply <NAME>",
            ],
            output_modes: [
                "--format=text (default)",
                "--robot or --format=json",
                "--format=json-compact",
            ],
        };
        if let Ok(json) = serde_json::to_string_pretty(&help) {
            println!("{json}");
        }
        return;
    }

    println!(
        "{} {} - display layout profiles\n",
        style("dprof").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("Save and restore:").bold());
    println!("  dprof capture --save desk   Save the current layout as 'desk'");
    println!("  dprof check desk            Can 'desk' be applied right now?");
    println!("  dprof apply desk            Restore 'desk'");
    println!();
    println!("{}", style("Inspect:").bold());
    println!("  dprof show                  Describe the live layout");
    println!("  dprof list                  List saved layouts");
    println!("  dprof diff desk             Compare 'desk' with the live layout");
    println!();
    println!("Run {} for all commands.", style("dprof --help").yellow());
}

// === Helpers ===

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    load_engine_config(cli.config.as_deref())
}

fn open_store(cli: &Cli, config: &EngineConfig) -> Result<SnapshotDb> {
    if let Some(path) = &cli.db {
        return SnapshotDb::open(path);
    }
    match config.database_path()? {
        Some(path) => SnapshotDb::open(path),
        None => SnapshotDb::open_default(),
    }
}

fn open_engine(config: EngineConfig) -> Result<DisplayEngine<NativePlatform>> {
    Ok(DisplayEngine::new(platform::native()?, config))
}

// === Commands ===

fn cmd_capture(cli: &Cli, out: &dyn Output, args: &cli::CaptureArgs) -> Result<()> {
    let config = load_config(cli)?;
    let mut db = match &args.save {
        Some(_) => Some(open_store(cli, &config)?),
        None => None,
    };
    let mut engine = open_engine(config)?;
    let snapshot = if args.all {
        engine.capture_all()?
    } else {
        engine.capture_active()?
    };
    let report = describe_live(engine.platform(), &snapshot);

    if let (Some(db), Some(name)) = (db.as_mut(), args.save.as_deref()) {
        db.save_snapshot(name, args.description.as_deref(), &snapshot)?;
    }
    out.captured(&snapshot, &report, args.save.as_deref());
    Ok(())
}

fn cmd_list(cli: &Cli, out: &dyn Output) -> Result<()> {
    let config = load_config(cli)?;
    let db = open_store(cli, &config)?;
    out.snapshot_list(&db.list_snapshots()?);
    Ok(())
}

fn cmd_show(cli: &Cli, out: &dyn Output, args: &cli::ShowArgs) -> Result<()> {
    let config = load_config(cli)?;
    if let Some(name) = &args.name {
        let db = open_store(cli, &config)?;
        let stored = db.require_snapshot(name)?;
        out.snapshot_report(name, &describe(&stored.snapshot));
        return Ok(());
    }
    let mut engine = open_engine(config)?;
    let snapshot = engine.capture_active()?;
    out.snapshot_report("live", &describe_live(engine.platform(), &snapshot));
    Ok(())
}

fn cmd_diff(cli: &Cli, out: &dyn Output, args: &cli::DiffArgs) -> Result<()> {
    let config = load_config(cli)?;
    let db = open_store(cli, &config)?;
    let first = db.require_snapshot(&args.first)?.snapshot;
    let (label, second) = match &args.second {
        Some(name) => (name.clone(), db.require_snapshot(name)?.snapshot),
        None => ("live".to_string(), open_engine(config)?.capture_active()?),
    };
    out.diff_result(&DiffResult::new(&args.first, label, diff(&first, &second)));
    Ok(())
}

fn cmd_check(cli: &Cli, out: &dyn Output, args: &cli::NameArgs) -> Result<()> {
    let config = load_config(cli)?;
    let db = open_store(cli, &config)?;
    let snapshot = db.require_snapshot(&args.name)?.snapshot;
    let mut engine = open_engine(config)?;

    let missing_displays = engine.missing_displays(&snapshot)?;
    let possible = missing_displays.is_empty();
    let valid = if possible {
        Some(engine.is_valid(&snapshot)?)
    } else {
        None
    };
    let active = engine.is_active(&snapshot)?;
    out.check_result(&CheckResult {
        name: args.name.clone(),
        possible,
        valid,
        active,
        missing_displays,
    });
    Ok(())
}

fn cmd_apply(cli: &Cli, out: &dyn Output, args: &cli::ApplyArgs) -> Result<()> {
    let config = load_config(cli)?;
    let db = open_store(cli, &config)?;
    let snapshot = db.require_snapshot(&args.name)?.snapshot;
    let mut engine = open_engine(config)?;

    if !args.force {
        if engine.is_active(&snapshot)? {
            out.already_active(&args.name);
            return Ok(());
        }
        let missing = engine.missing_displays(&snapshot)?;
        if !missing.is_empty() {
            return Err(DprofError::DisplaysMissing {
                name: args.name.clone(),
                missing,
            });
        }
    }

    let report = engine.apply(&snapshot)?;
    out.apply_report(&args.name, &report);
    Ok(())
}

fn cmd_delete(cli: &Cli, out: &dyn Output, args: &cli::NameArgs) -> Result<()> {
    let config = load_config(cli)?;
    let mut db = open_store(cli, &config)?;
    if !db.delete_snapshot(&args.name)? {
        return Err(DprofError::SnapshotNotFound {
            name: args.name.clone(),
        });
    }
    out.success(&format!("Deleted snapshot '{}'", args.name));
    Ok(())
}

fn cmd_export(cli: &Cli, out: &dyn Output, args: &cli::ExportArgs) -> Result<()> {
    let config = load_config(cli)?;
    let db = open_store(cli, &config)?;
    db.export_json(&args.name, &args.file)?;
    out.success(&format!(
        "Exported '{}' to {}",
        args.name,
        args.file.display()
    ));
    Ok(())
}

fn cmd_import(cli: &Cli, out: &dyn Output, args: &cli::ImportArgs) -> Result<()> {
    let config = load_config(cli)?;
    let mut db = open_store(cli, &config)?;
    let name = db.import_json(&args.file, args.name.as_deref())?;
    out.success(&format!("Imported '{name}' from {}", args.file.display()));
    Ok(())
}

fn cmd_vendors(cli: &Cli, out: &dyn Output) -> Result<()> {
    let engine = open_engine(load_config(cli)?)?;
    out.vendors(&engine.video_card_vendors()?);
    Ok(())
}

fn cmd_config(cli: &Cli, out: &dyn Output, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => default_config_path()?,
            };
            let exists = path.exists();
            out.config_path(&path, exists);
        }
        ConfigCommand::Show => out.config(&load_config(cli)?),
    }
    Ok(())
}
