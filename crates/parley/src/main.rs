// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - a dialog execution core.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod authoring;
mod middleware;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use parley_config::ParleyConfig;
use parley_flow::SkillRegistry;

/// Parley - a dialog execution core.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the event engine and janitor, reading events from stdin.
    Serve,
    /// Check a flow file for authoring errors.
    Validate {
        /// Path to a `.flow.json` file.
        path: PathBuf,
    },
    /// List the built-in skills.
    Skills,
    /// Compile a skill into a finalized flow and print it as JSON.
    CompileSkill {
        /// Skill id, e.g. `choice`.
        id: String,
        /// Skill parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
        /// Flow the generated skill will be embedded into.
        #[arg(long)]
        parent_flow: Option<String>,
    },
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            match serve::run_serve(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("parley: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Validate { path }) => match authoring::validate_file(&path) {
            Ok(problems) if problems.is_empty() => {
                println!("{}: ok", path.display());
                ExitCode::SUCCESS
            }
            Ok(problems) => {
                for problem in &problems {
                    eprintln!("{}: {problem}", path.display());
                }
                eprintln!("{} problem(s) found", problems.len());
                ExitCode::FAILURE
            }
            Err(e) => {
                eprintln!("parley: {e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::Skills) => {
            println!("{}", authoring::list_skills(&SkillRegistry::with_builtins()));
            ExitCode::SUCCESS
        }
        Some(Commands::CompileSkill {
            id,
            params,
            parent_flow,
        }) => {
            let registry = SkillRegistry::with_builtins();
            match authoring::compile_skill(&registry, &id, &params, parent_flow) {
                Ok(output) => match serde_json::to_string_pretty(&output) {
                    Ok(json) => {
                        println!("{json}");
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("parley: {e}");
                        ExitCode::FAILURE
                    }
                },
                Err(e) => {
                    eprintln!("parley: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some(Commands::Config) => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            match toml::to_string_pretty(&config) {
                Ok(rendered) => {
                    print!("{rendered}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("parley: failed to render configuration: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        None => {
            println!("parley: use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}

/// Loads and validates configuration, rendering diagnostics on failure.
fn load_config(path: Option<&std::path::Path>) -> Option<ParleyConfig> {
    let loaded = match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            parley_config::render_errors(&errors);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compile_skill_arguments_parse() {
        let cli = Cli::try_parse_from([
            "parley",
            "compile-skill",
            "choice",
            "--params",
            r#"{"question":"q","choices":["a"]}"#,
        ])
        .unwrap();
        match cli.command {
            Some(Commands::CompileSkill {
                id,
                params,
                parent_flow,
            }) => {
                assert_eq!(id, "choice");
                assert!(params.contains("question"));
                assert!(parent_flow.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config =
            parley_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.dialog.name, "parley");
    }
}
