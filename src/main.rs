use clap::Parser;
use mindmap_jira::cli::commands;
use mindmap_jira::cli::{Cli, Commands};
use mindmap_jira::config;
use mindmap_jira::logging::init_logging;
use mindmap_jira::{MmjError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        handle_error(&MmjError::Other(e), cli.json);
    }

    let overrides = build_cli_overrides(&cli);
    let config_path = cli.config.as_deref();

    let result = match &cli.command {
        Commands::Run(args) => commands::run::execute(args, config_path, &overrides, cli.json),
        Commands::Init => commands::init::execute(config_path, &overrides, cli.json),
        Commands::Template(args) => commands::template::execute(args, config_path, &overrides),
        Commands::Check => commands::check::execute(config_path, &overrides, cli.json),
        Commands::Summary(args) => {
            commands::summary::execute(args, config_path, &overrides, cli.json)
        }
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &MmjError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        working_dir: cli.working_dir.clone(),
        url: cli.url.clone(),
        no_prompt: cli.no_prompt.then_some(true),
        debug: cli.debug.then_some(true),
    }
}
