use clap::{Parser, Subcommand};
use colored::Colorize;
use envboot_config::{EnvbootConfig, LogFormat, ShellKind};
use envboot_profile::{load_config, render, InitReport, ProfileLoader, SessionState};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "envboot")]
#[command(about = "Bootstrap an interactive shell session from the system profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (replaces the search path)
    #[arg(short, long, global = true, env = "ENVBOOT_CONFIG")]
    config: Option<PathBuf>,

    /// Fail when a present profile cannot be read or parsed
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a script that sets up the session, for `eval "$(envboot init)"`
    Init {
        /// Output dialect: sh, bash, zsh or fish
        #[arg(short, long)]
        shell: Option<ShellKind>,
    },

    /// Show the aliases and variables a new session receives
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse one profile and print the directives it contributes
    Check {
        /// Profile to parse
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    session: &'a SessionState,
    report: &'a InitReport,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config_for(&cli).and_then(|mut config| {
        if cli.strict {
            config.profiles.strict = true;
        }
        init_logging(&config);

        match cli.command {
            Commands::Init { shell } => cmd_init(&config, shell),
            Commands::Show { json } => cmd_show(&config, json),
            Commands::Check { file, json } => cmd_check(&file, json),
            Commands::Config => cmd_config(&config),
        }
    });

    if let Err(e) = result {
        eprintln!("{} {}", "envboot:".red().bold(), e);
        std::process::exit(1);
    }
}

fn load_config_for(cli: &Cli) -> Result<EnvbootConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => envboot_config::ConfigLoader::new().with_file(path).load()?,
        None => envboot_config::load()?,
    };
    Ok(config)
}

fn init_logging(config: &EnvbootConfig) {
    // stdout carries the script, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.filter_directive()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn initialize(config: &EnvbootConfig) -> Result<(SessionState, InitReport), Box<dyn std::error::Error>> {
    let loader = ProfileLoader::new(&config.profiles);
    let mut session = SessionState::from_process_env();
    let report = loader.initialize_session(&mut session)?;
    Ok((session, report))
}

fn cmd_init(config: &EnvbootConfig, shell: Option<ShellKind>) -> CliResult {
    let shell = shell.unwrap_or(config.output.shell);
    let (session, report) = initialize(config)?;
    tracing::debug!(
        %shell,
        sourced = report.sourced.len(),
        skipped = report.skipped_statements,
        "Session initialized"
    );
    print!("{}", render(&session, shell));
    Ok(())
}

fn cmd_show(config: &EnvbootConfig, json: bool) -> CliResult {
    let (session, report) = initialize(config)?;

    if json {
        let output = ShowOutput {
            session: &session,
            report: &report,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Profiles:".bold());
    for path in &report.sourced {
        println!("  {} {}", "✓".green(), path.display());
    }
    for path in &report.missing {
        println!("  {} {} (not present)", "-".dimmed(), path.display());
    }
    for (path, error) in &report.failed {
        println!("  {} {}: {}", "✗".red(), path.display(), error);
    }
    if report.skipped_statements > 0 {
        println!("  {} statements skipped", report.skipped_statements);
    }

    println!();
    println!("{}", "Aliases:".bold());
    for alias in session.aliases() {
        println!("  {} = {}", alias.name.cyan(), alias.expansion);
    }

    println!();
    println!("{}", "Variables:".bold());
    for var in session.variables() {
        let marker = if var.exported { "export" } else { "      " };
        println!("  {} {} = {}", marker.dimmed(), var.name.cyan(), var.value);
    }
    for name in session.unset_names() {
        println!("  {} {}", "unset".yellow(), name);
    }

    Ok(())
}

fn cmd_check(file: &std::path::Path, json: bool) -> CliResult {
    let parsed = load_config(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("{} {}", "✓".green(), file.display().to_string().bold());
    for directive in &parsed.directives {
        println!("  {directive}");
    }
    if parsed.skipped > 0 {
        println!(
            "  {} {} statements skipped (not applied when sourcing)",
            "⚠".yellow(),
            parsed.skipped
        );
    }
    Ok(())
}

fn cmd_config(config: &EnvbootConfig) -> CliResult {
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}
