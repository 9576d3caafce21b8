//! omsdoctor CLI - A troubleshooter for the Linux monitoring agent.

use clap::Parser;
use omsdoctor::cli::{Cli, Commands};
use omsdoctor::commands::{self, CheckReport, CommandResult, EXIT_FAULT, FactsReport};
use omsdoctor::config::{OutputFormat, ResolvedSettings, SettingsOverrides, resolve_settings};
use omsdoctor::paths::AgentPaths;
use omsdoctor::prompt::{Prompter, TerminalPrompter};
use omsdoctor::report::Report;
use omsdoctor::session::Session;
use omsdoctor::sys::{Host, is_elevated};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();

    let settings = match resolve_settings(&overrides_from(&cli)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(r#"{{"error": "{}"}}"#, e);
            process::exit(EXIT_FAULT);
        }
    };
    let human = settings.output_format() == OutputFormat::Human;

    init_logging(&settings);

    if !is_elevated() {
        tracing::warn!("not running as root; some checks may report permission problems");
    }

    let paths = match cli.root {
        Some(root) => AgentPaths::with_root(root),
        None => AgentPaths::host(),
    };
    let host = Host::system(paths);

    match run_command(cli.command, host, human, !settings.silent()) {
        Ok(code) => process::exit(code),
        Err(e) => {
            if human {
                eprintln!("Error: {}", e);
            } else {
                eprintln!(r#"{{"error": "{}"}}"#, e);
            }
            process::exit(EXIT_FAULT);
        }
    }
}

/// CLI flags that take part in settings resolution.
fn overrides_from(cli: &Cli) -> SettingsOverrides {
    let mut overrides = SettingsOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    if cli.silent {
        overrides = overrides.with_silent(true);
    }
    if let Some(ref level) = cli.log_level {
        overrides = overrides.with_log_level(level.clone());
    }
    overrides
}

/// Initialize logging to stderr so stdout stays machine-readable.
fn init_logging(settings: &ResolvedSettings) {
    let filter =
        EnvFilter::try_new(settings.log_level()).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    tracing::debug!(
        level = settings.log_level(),
        source = %settings.log_level.source,
        silent = settings.silent(),
        "settings resolved"
    );
}

fn run_command(
    command: Commands,
    host: Host,
    human: bool,
    interactive: bool,
) -> Result<i32, omsdoctor::Error> {
    let name = command.name();

    // Human runs stream progress as it happens; JSON runs keep stdout for the
    // result and show notes on stderr only when the operator may be prompted.
    let mut report = if human {
        Report::live(Box::new(io::stdout()))
    } else if interactive {
        Report::live_notes(Box::new(io::stderr()))
    } else {
        Report::new()
    };
    let mut prompter: Box<dyn Prompter> = if human {
        Box::new(TerminalPrompter::stdio())
    } else {
        Box::new(TerminalPrompter::new(io::stdin().lock(), io::stderr()))
    };
    let mut session = Session::new(host, &mut report, prompter.as_mut(), interactive);

    let diagnosis = match command {
        Commands::Heartbeat => commands::heartbeat(&mut session)?,
        Commands::CustomLogs => commands::custom_logs(&mut session)?,
        Commands::Multihoming { workspace } => commands::multihoming(&mut session, workspace)?,
        Commands::Facts { key } => {
            let (facts, failure) = commands::facts(&mut session, key.as_deref())?;
            drop(session);
            let result = FactsReport::new(facts, failure, report.into_findings());
            output(&result, human);
            return Ok(result.exit_code());
        }
    };
    drop(session);

    let result = CheckReport::new(name, diagnosis, report.into_findings());
    output(&result, human);
    Ok(result.exit_code())
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
