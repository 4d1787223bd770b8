//! The `init` flow: resolve the template, ask, generate, report

use super::CliclackPresenter;
use crate::logger;
use crate::pipeline::{DefaultsPresenter, HandlebarsRenderer};
use crate::product::ProductConfig;
use crate::templates::{self, version, GenerateRequest};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// CLI arguments for the init command
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    /// Template directory (local path)
    pub template: String,

    /// Project name; `None` or `.` generates into the current directory
    pub name: Option<String>,

    /// Accept every default without asking (non-interactive mode)
    pub yes: bool,

    /// Skip the latest-version check
    pub skip_version_check: bool,
}

/// Run the init command with interactive prompts
pub async fn run<C: ProductConfig>(config: &C, args: InitArgs, cli_version: &str) -> Result<()> {
    cliclack::intro(config.display_name())?;

    if args.skip_version_check {
        cliclack::log::info("Skipping version check")?;
    } else {
        report_version(config, cli_version).await?;
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let template_dir = resolve_template(&args.template, &cwd)?;
    let request = build_request(&args, template_dir, &cwd);

    confirm_destination(&request.destination, args.yes)?;

    let renderer = HandlebarsRenderer::new();
    let cancel = CancellationToken::new();
    let generated = if args.yes {
        templates::generate(&request, &mut DefaultsPresenter, &renderer, &cancel).await?
    } else {
        templates::generate(&request, &mut CliclackPresenter, &renderer, &cancel).await?
    };

    cliclack::log::success(format!(
        "Generated {} files in {}",
        generated.written.len(),
        request.destination.display()
    ))?;

    match templates::render_complete_message(&generated, &renderer).await {
        Some(Ok(message)) => println!("\n{}\n", logger::indent(&message)),
        Some(Err(e)) => logger::warn(format!("{:#}", e)),
        None => {}
    }

    cliclack::outro("Done")?;

    Ok(())
}

async fn report_version<C: ProductConfig>(config: &C, cli_version: &str) -> Result<()> {
    let spinner = cliclack::spinner();
    spinner.start("Checking for updates...");

    match version::check_latest(config, cli_version).await {
        Ok(Some(warning)) => {
            spinner.stop("Update available");
            cliclack::log::warning(warning)?;
        }
        Ok(None) => spinner.stop(format!("{} {} is up to date", config.name(), cli_version)),
        Err(e) => {
            tracing::debug!(error = %e, "version check failed");
            spinner.stop("Version check skipped");
            cliclack::log::warning(format!("Could not check for updates: {:#}", e))?;
        }
    }

    Ok(())
}

fn resolve_template(template: &str, cwd: &Path) -> Result<PathBuf> {
    let template_dir = templates::template_path(template, cwd);
    if template_dir.is_dir() {
        cliclack::log::info(format!("Using template {}", template_dir.display()))?;
        return Ok(template_dir);
    }

    if templates::is_local_path(template) {
        anyhow::bail!("Local template \"{}\" not found.", template);
    }
    anyhow::bail!(
        "Template \"{}\" not found. Pass a local path starting with '.' or '/'.",
        template
    )
}

fn build_request(args: &InitArgs, template_dir: PathBuf, cwd: &Path) -> GenerateRequest {
    let in_place = matches!(args.name.as_deref(), None | Some("."));

    let (name, destination) = match &args.name {
        Some(name) if !in_place => (name.clone(), templates::template_path(name, cwd)),
        _ => {
            let name = cwd
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (name, cwd.to_path_buf())
        }
    };

    GenerateRequest {
        name,
        template_dir,
        destination,
        cwd: cwd.to_path_buf(),
    }
}

fn confirm_destination(destination: &Path, yes: bool) -> Result<()> {
    if !destination.is_dir() {
        return Ok(());
    }

    let count = std::fs::read_dir(destination)
        .with_context(|| format!("Failed to read {}", destination.display()))?
        .count();
    if count == 0 {
        return Ok(());
    }

    cliclack::log::warning(format!(
        "{} has {} existing items",
        destination.display(),
        count
    ))?;

    // Auto-confirm with --yes flag
    let confirm = if yes {
        true
    } else {
        cliclack::confirm("Continue anyway?")
            .initial_value(true)
            .interact()?
    };

    if !confirm {
        anyhow::bail!("Setup cancelled.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: Option<&str>) -> InitArgs {
        InitArgs {
            template: "./tpl".to_string(),
            name: name.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_named_project_goes_into_subdirectory() {
        let cwd = Path::new("/work");
        let request = build_request(&args(Some("my-app")), PathBuf::from("/work/tpl"), cwd);

        assert_eq!(request.name, "my-app");
        assert_eq!(request.destination, PathBuf::from("/work/my-app"));
        assert_eq!(request.seed_metadata()["inPlace"], serde_json::json!(false));
    }

    #[test]
    fn test_missing_or_dot_name_generates_in_place() {
        let cwd = Path::new("/work/site");
        for name in [None, Some(".")] {
            let request = build_request(&args(name), PathBuf::from("/t"), cwd);
            assert_eq!(request.name, "site");
            assert_eq!(request.destination, cwd);
            assert_eq!(request.seed_metadata()["inPlace"], serde_json::json!(true));
        }
    }
}
