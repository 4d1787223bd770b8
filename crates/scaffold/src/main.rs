//! scaffold CLI - Generate projects from local templates

use clap::{Parser, Subcommand};
use scaffolder_core::tui::InitArgs;
use scaffolder_core::{logger, ProductConfig};
use tracing_subscriber::EnvFilter;

/// CLI version
pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// scaffold product configuration
#[derive(Clone)]
pub struct ScaffoldConfig;

impl ProductConfig for ScaffoldConfig {
    fn name(&self) -> &'static str {
        "scaffold"
    }

    fn display_name(&self) -> &'static str {
        "scaffold"
    }

    fn version_check_url(&self) -> &'static str {
        "https://crates.io/api/v1/crates/scaffold"
    }

    fn version_check_url_env(&self) -> &'static str {
        "SCAFFOLD_VERSION_URL"
    }

    fn upgrade_command(&self) -> &'static str {
        "cargo install scaffold --force"
    }
}

#[derive(Parser, Debug)]
#[command(name = "scaffold")]
#[command(about = "Generate projects from templates")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new project from a template
    Init(CliInitArgs),
}

#[derive(Parser, Debug)]
pub struct CliInitArgs {
    /// Template directory (a local path such as ./my-template)
    pub template: String,

    /// Project name; omit or pass "." to generate into the current directory
    pub name: Option<String>,

    /// Accept every default answer (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,

    /// Do not check for a newer scaffold release
    #[arg(long = "skip-version-check")]
    pub skip_version_check: bool,
}

impl From<CliInitArgs> for InitArgs {
    fn from(args: CliInitArgs) -> Self {
        InitArgs {
            template: args.template,
            name: args.name,
            yes: args.yes,
            skip_version_check: args.skip_version_check,
        }
    }
}

#[tokio::main]
async fn main() {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ScaffoldConfig;

    let result = match args.command {
        Command::Init(init_args) => {
            scaffolder_core::run(&config, init_args.into(), CLI_VERSION).await
        }
    };

    // Ensure cursor is visible on exit
    let _ = console::Term::stderr().show_cursor();

    if let Err(e) = result {
        logger::fatal(format!("{:#}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_init_flags() {
        let args = Args::parse_from(["scaffold", "init", "./tpl", "my-app", "--yes"]);
        let Command::Init(init) = args.command;
        let init: InitArgs = init.into();

        assert_eq!(init.template, "./tpl");
        assert_eq!(init.name.as_deref(), Some("my-app"));
        assert!(init.yes);
        assert!(!init.skip_version_check);
    }

    #[test]
    fn test_name_is_optional() {
        let args = Args::parse_from(["scaffold", "init", "../shared/tpl", "--skip-version-check"]);
        let Command::Init(init) = args.command;

        assert!(init.name.is_none());
        assert!(init.skip_version_check);
    }
}
