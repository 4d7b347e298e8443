//! Charm-style CLI prompts using cliclack

use super::messages::{fill, Messages};
use crate::pipeline::{http_client, steps, Pipeline};
use crate::product::{ProductConfig, Variant};
use crate::runtime::{git, tool};
use crate::templates::PlacementMode;
use crate::tracker::Tracker;
use anyhow::{bail, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Timeout for the connectivity request in `check`
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Host requested by `check` to confirm internet access
const CONNECTIVITY_URL: &str = "https://api.github.com";

/// CLI arguments for the init command
#[derive(Debug, Clone, Default)]
pub struct InitArgs {
    /// Name of the new project directory
    pub project_name: Option<String>,

    /// Variant key (e.g., "claude")
    pub variant: Option<String>,

    /// Initialize in the current directory instead of creating a new one
    pub here: bool,

    /// Skip git repository initialization
    pub no_git: bool,

    /// Skip the companion tool check for the selected variant
    pub ignore_agent_tools: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the init flow with interactive prompts
pub async fn run_init<C: ProductConfig>(config: &C, args: InitArgs) -> Result<()> {
    let text = Messages::for_locale(config.locale());
    cliclack::intro(config.display_name())?;

    // Step 1: Resolve target directory and placement mode
    let (project_dir, mode) = select_directory(text, &args)?;

    // Step 2: Check git (absence only skips repository init)
    let git_available = if args.no_git {
        false
    } else {
        check_git(text)?
    };

    // Step 3: Select variant
    let variant = select_variant(text, config, &args)?;

    // Step 4: Companion tool for the variant
    if !args.ignore_agent_tools {
        check_agent_tool(text, variant)?;
    }

    // Step 5: Materialize
    let mut tracker = init_tracker(text, config.display_name(), variant);

    let pipeline = Pipeline::from_config(config)?;
    let live = attach_live_view(&mut tracker);
    let result = pipeline
        .run(variant.key, &project_dir, mode, &mut tracker)
        .await;

    let project = match result {
        Ok(project) => project,
        Err(err) => {
            tracker.skip("git", Some(text.setup_failed_detail));
            tracker.skip("final", Some(text.setup_failed_detail));
            finish_live_view(&mut tracker, live);
            for cleanup in &err.cleanup_errors {
                cliclack::log::warning(cleanup.to_string())?;
            }
            cliclack::outro_cancel(text.setup_failed)?;
            return Err(err.into());
        }
    };

    // Step 6: Git repository
    init_git_step(
        text,
        &mut tracker,
        &project.path,
        args.no_git,
        git_available,
        config.commit_message(),
    );
    tracker.complete("final", Some(text.project_ready_detail));
    finish_live_view(&mut tracker, live);

    for cleanup in &project.cleanup_errors {
        cliclack::log::warning(cleanup.to_string())?;
    }
    cliclack::log::success(text.project_ready.green().bold())?;

    // Step 7: Show next steps
    print_next_steps(text, config, &project.path, variant, args.here)?;

    Ok(())
}

/// Tracker with every step of `init` registered in display order
fn init_tracker(text: &Messages, display_name: &str, variant: &Variant) -> Tracker {
    let mut tracker = Tracker::new(fill(text.tracker_title, &[&display_name]));
    tracker.add("precheck", text.step_precheck);
    tracker.complete("precheck", Some(text.precheck_ok));
    tracker.add("ai-select", text.step_ai_select);
    tracker.complete("ai-select", Some(variant.key));
    for ((key, _), label) in steps::ALL.iter().zip(text.pipeline_steps) {
        tracker.add(key, label);
    }
    Pipeline::register_steps(&mut tracker);
    tracker.add("git", text.step_git);
    tracker.add("final", text.step_final);
    tracker
}

fn select_directory(text: &Messages, args: &InitArgs) -> Result<(PathBuf, PlacementMode)> {
    let current_dir = std::env::current_dir()?;

    match (&args.project_name, args.here) {
        (Some(_), true) => bail!(text.name_and_here),
        (None, false) => bail!(text.name_or_here),
        (None, true) => {
            let count = std::fs::read_dir(&current_dir)?.count();
            if count > 0 {
                cliclack::log::warning(fill(text.directory_not_empty, &[&count]))?;

                // Auto-confirm with --yes flag
                let confirm = if args.yes {
                    true
                } else {
                    cliclack::confirm(text.continue_anyway)
                        .initial_value(false)
                        .interact()?
                };

                if !confirm {
                    bail!(text.cancelled);
                }
            }
            cliclack::log::info(fill(text.init_here, &[&current_dir.display()]))?;
            Ok((current_dir, PlacementMode::MergeIntoExisting))
        }
        (Some(name), false) => {
            let path = current_dir.join(name);
            if path.exists() {
                bail!(fill(text.already_exists, &[&name]));
            }
            cliclack::log::info(fill(text.creating, &[&path.display()]))?;
            Ok((path, PlacementMode::NewDirectory))
        }
    }
}

fn check_git(text: &Messages) -> Result<bool> {
    if tool::git_tool().is_installed() {
        return Ok(true);
    }
    cliclack::log::warning(text.git_missing)?;
    Ok(false)
}

fn select_variant<C: ProductConfig>(
    text: &Messages,
    config: &C,
    args: &InitArgs,
) -> Result<&'static Variant> {
    if let Some(key) = &args.variant {
        return match config.find_variant(key) {
            Some(variant) => {
                cliclack::log::info(fill(text.using_variant, &[&variant.display_name]))?;
                Ok(variant)
            }
            None => bail!(fill(text.invalid_variant, &[&key, &config.variant_keys()])),
        };
    }

    let default = config.default_variant();
    if args.yes {
        return match config.find_variant(default) {
            Some(variant) => {
                cliclack::log::info(fill(text.using_variant, &[&variant.display_name]))?;
                Ok(variant)
            }
            None => bail!("Default variant '{}' is not configured", default),
        };
    }

    let mut select = cliclack::select(text.choose_variant);
    for variant in config.variants() {
        select = select.item(variant.key, variant.display_name, variant.key);
    }
    let key: &str = select.initial_value(default).interact()?;

    config
        .find_variant(key)
        .ok_or_else(|| anyhow::anyhow!("Unknown AI assistant '{}'", key))
}

fn check_agent_tool(text: &Messages, variant: &Variant) -> Result<()> {
    let Some(config) = variant.tool else {
        return Ok(());
    };
    let tool = tool::ToolManager::new(config);

    if tool.is_installed() {
        let version = tool.get_version().unwrap_or_else(|| "unknown".to_string());
        cliclack::log::success(fill(text.tool_installed, &[&config.display_name, &version]))?;
        return Ok(());
    }

    cliclack::log::error(fill(
        text.variant_requires,
        &[&variant.display_name, &config.display_name],
    ))?;
    cliclack::log::warning(missing_tool(text, &config))?;
    cliclack::log::remark(text.ignore_tools_tip)?;
    bail!(text.tool_required);
}

fn missing_tool(text: &Messages, config: &tool::ToolConfig) -> String {
    fill(text.tool_missing, &[&config.display_name, &config.install_hint])
}

/// Redraw the tracker in place on every mutation when stderr is a terminal
fn attach_live_view(tracker: &mut Tracker) -> bool {
    let term = console::Term::stderr();
    if !term.is_term() {
        return false;
    }

    let mut drawn = 0;
    tracker.attach_observer(Box::new(move |tracker: &Tracker| {
        let text = tracker.render().to_string();
        term.clear_last_lines(drawn)?;
        term.write_line(&text)?;
        drawn = text.lines().count();
        Ok(())
    }));
    true
}

/// Leave the final tree on screen exactly once
fn finish_live_view(tracker: &mut Tracker, live: bool) {
    tracker.detach_observer();
    if !live {
        eprintln!("{}", tracker.render());
    }
}

fn init_git_step(
    text: &Messages,
    tracker: &mut Tracker,
    project_dir: &Path,
    no_git: bool,
    git_available: bool,
    commit_message: &str,
) {
    if no_git {
        tracker.skip("git", Some(text.git_flag));
        return;
    }

    tracker.start("git", None);
    if git::is_git_repo(project_dir) {
        tracker.complete("git", Some(text.git_existing));
    } else if !git_available {
        tracker.skip("git", Some(text.git_unavailable));
    } else {
        match git::init_repo(project_dir, commit_message) {
            Ok(()) => tracker.complete("git", Some(text.git_initialized)),
            Err(e) => {
                tracing::warn!(error = %e, "git initialization failed");
                tracker.error("git", Some(text.git_failed));
            }
        }
    }
}

fn print_next_steps<C: ProductConfig>(
    text: &Messages,
    config: &C,
    project_dir: &Path,
    variant: &Variant,
    here: bool,
) -> Result<()> {
    let steps = config.next_steps(project_dir, variant, here, config.locale());

    println!();
    println!("  {}", text.next_steps);
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro(text.outro)?;

    Ok(())
}

/// Run the check flow: connectivity plus every tool the product can use
pub async fn run_check<C: ProductConfig>(config: &C) -> Result<()> {
    let text = Messages::for_locale(config.locale());
    cliclack::intro(fill(text.check_intro, &[&config.display_name()]))?;

    let spinner = cliclack::spinner();
    spinner.start(text.checking_connectivity);
    if check_connectivity(config.user_agent()).await {
        spinner.stop(text.connected);
    } else {
        spinner.error(text.offline);
        cliclack::log::warning(text.check_connection)?;
    }

    let git_ok = report_tool(text, &tool::git_tool())?;

    let mut any_agent_ok = false;
    let mut has_agent_tools = false;
    for variant in config.variants() {
        if let Some(tool_config) = variant.tool {
            has_agent_tools = true;
            any_agent_ok |= report_tool(text, &tool::ToolManager::new(tool_config))?;
        }
    }

    if !git_ok {
        cliclack::log::remark(text.suggest_git)?;
    }
    if has_agent_tools && !any_agent_ok {
        cliclack::log::remark(text.suggest_agent)?;
    }

    cliclack::outro(fill(text.check_ready, &[&config.display_name()]))?;
    Ok(())
}

async fn check_connectivity(user_agent: &str) -> bool {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(CONNECTIVITY_TIMEOUT)
        .build()
        .unwrap_or_else(|_| http_client(user_agent));

    match client.get(CONNECTIVITY_URL).send().await {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "connectivity check failed");
            false
        }
    }
}

fn report_tool(text: &Messages, tool: &tool::ToolManager) -> Result<bool> {
    if tool.is_installed() {
        let version = tool.get_version().unwrap_or_else(|| "unknown".to_string());
        cliclack::log::success(format!("{} ({})", tool.config().display_name, version))?;
        Ok(true)
    } else {
        cliclack::log::warning(missing_tool(text, tool.config()))?;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::tracker::StepStatus;

    const VARIANT: Variant = Variant {
        key: "claude",
        display_name: "Claude Code",
        tool: None,
    };

    #[test]
    fn test_init_tracker_uses_translated_labels() {
        let text = Messages::for_locale(Locale::Japanese);
        let tracker = init_tracker(text, "Specify", &VARIANT);

        assert_eq!(tracker.title(), "Specifyプロジェクトの初期化");
        let labels: Vec<_> = tracker.steps().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels[0], "必要なツールを確認");
        assert_eq!(labels[3], "テンプレートをダウンロード");
        assert_eq!(labels.last(), Some(&"完了"));
    }

    #[test]
    fn test_init_tracker_step_order() {
        let tracker = init_tracker(&crate::tui::messages::ENGLISH, "Specify", &VARIANT);
        let keys: Vec<_> = tracker.steps().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "precheck", "ai-select", "fetch", "download", "zip-list", "extract", "flatten",
                "cleanup", "git", "final"
            ]
        );
        let select = tracker.get("ai-select").unwrap();
        assert_eq!(select.status, StepStatus::Done);
        assert_eq!(select.detail, "claude");
    }

    #[test]
    fn test_missing_tool_names_install_hint() {
        let config = tool::ToolConfig {
            name: "gemini",
            display_name: "Gemini CLI",
            install_hint: "https://example.com/gemini",
        };
        assert_eq!(
            missing_tool(Messages::for_locale(Locale::English), &config),
            "Gemini CLI not found. Install it from https://example.com/gemini"
        );
        assert!(missing_tool(Messages::for_locale(Locale::Japanese), &config)
            .starts_with("Gemini CLIが見つかりません"));
    }
}
