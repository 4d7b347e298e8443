//! Specify CLI - Bootstrap spec-driven development projects from the latest templates

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use speckit_core::tui::InitArgs;
use speckit_core::{Locale, ProductConfig, ToolConfig, Variant};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g., "speckit_core=debug")
const LOG_ENV: &str = "SPECIFY_LOG";

const VARIANTS: &[Variant] = &[
    Variant {
        key: "copilot",
        display_name: "GitHub Copilot",
        tool: None,
    },
    Variant {
        key: "claude",
        display_name: "Claude Code",
        tool: Some(ToolConfig {
            name: "claude",
            display_name: "Claude CLI",
            install_hint: "https://docs.anthropic.com/en/docs/claude-code/setup",
        }),
    },
    Variant {
        key: "gemini",
        display_name: "Gemini CLI",
        tool: Some(ToolConfig {
            name: "gemini",
            display_name: "Gemini CLI",
            install_hint: "https://github.com/google-gemini/gemini-cli",
        }),
    },
];

/// Spec Kit product configuration
#[derive(Clone)]
pub struct SpecKitConfig;

impl ProductConfig for SpecKitConfig {
    fn name(&self) -> &'static str {
        "specify"
    }

    fn display_name(&self) -> &'static str {
        "Specify"
    }

    fn default_release_url(&self) -> &'static str {
        "https://api.github.com/repos/github/spec-kit/releases/latest"
    }

    fn release_url_env(&self) -> &'static str {
        "SPECIFY_RELEASE_URL"
    }

    fn asset_prefix(&self) -> &'static str {
        "spec-kit-template-"
    }

    fn variants(&self) -> &'static [Variant] {
        VARIANTS
    }

    fn default_variant(&self) -> &'static str {
        "copilot"
    }

    fn commit_message(&self) -> &'static str {
        "Initial commit from Specify template"
    }

    fn cli_description(&self) -> &'static str {
        "Setup tool for Specify spec-driven development projects"
    }

    fn user_agent(&self) -> &'static str {
        concat!("specify-cli/", env!("CARGO_PKG_VERSION"))
    }

    fn locale_env(&self) -> &'static str {
        "SPECIFY_LANG"
    }

    fn next_steps(&self, dir: &Path, variant: &Variant, here: bool, locale: Locale) -> Vec<String> {
        match locale {
            Locale::English => english_next_steps(dir, variant, here),
            Locale::Japanese => japanese_next_steps(dir, variant, here),
        }
    }
}

fn project_dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

fn english_next_steps(dir: &Path, variant: &Variant, here: bool) -> Vec<String> {
    let mut steps = Vec::new();

    // Step 1: cd to directory unless initialized in place
    if here {
        steps.push("You're already in the project directory!".to_string());
    } else {
        steps.push(format!("cd {}", project_dir_name(dir)));
    }

    // Step 2: Variant-specific usage
    match variant.key {
        "claude" => steps.push(
            "Open in Visual Studio Code and use / commands with Claude Code \
             (/specify, /plan, /tasks)"
                .to_string(),
        ),
        "gemini" => steps.push(
            "Use / commands with Gemini CLI (gemini /specify, gemini /plan); \
             see GEMINI.md for all available commands"
                .to_string(),
        ),
        _ => steps.push(format!(
            "Open in Visual Studio Code and use /specify, /plan, /tasks commands with {}",
            variant.display_name
        )),
    }

    // Step 3: Project principles
    steps.push("Update CONSTITUTION.md with your project's non-negotiable principles".to_string());

    steps
}

fn japanese_next_steps(dir: &Path, variant: &Variant, here: bool) -> Vec<String> {
    let mut steps = Vec::new();

    if here {
        steps.push("既にプロジェクトディレクトリにいます！".to_string());
    } else {
        steps.push(format!("cd {}", project_dir_name(dir)));
    }

    match variant.key {
        "claude" => steps.push(
            "Visual Studio Codeで開いて、Claude Codeで / コマンドを使用開始\
             （/specify, /plan, /tasks）"
                .to_string(),
        ),
        "gemini" => steps.push(
            "Gemini CLIで / コマンドを使用（gemini /specify, gemini /plan）。\
             GEMINI.mdですべての利用可能なコマンドを確認"
                .to_string(),
        ),
        _ => steps.push(format!(
            "Visual Studio Codeで開いて、{}で /specify, /plan, /tasks コマンドを使用",
            variant.display_name
        )),
    }

    steps.push("CONSTITUTION.md をプロジェクトの譲れない原則で更新".to_string());

    steps
}

#[derive(Parser, Debug)]
#[command(name = "specify")]
#[command(about = "Setup tool for Specify spec-driven development projects")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new Specify project from the latest template
    Init(CliInitArgs),
    /// Check that all required tools are installed
    Check,
}

#[derive(Parser, Debug)]
pub struct CliInitArgs {
    /// Name for your new project directory (optional with --here)
    pub project_name: Option<String>,

    /// AI assistant to use: copilot, claude or gemini
    #[arg(long = "ai")]
    pub ai: Option<String>,

    /// Initialize in the current directory instead of creating a new one
    #[arg(long)]
    pub here: bool,

    /// Skip git repository initialization
    #[arg(long = "no-git")]
    pub no_git: bool,

    /// Skip checks for AI agent tools like Claude Code
    #[arg(long = "ignore-agent-tools")]
    pub ignore_agent_tools: bool,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

/// Command definition with help text in the user's language
fn localized_command(locale: Locale) -> clap::Command {
    let command = Args::command();
    match locale {
        Locale::English => command,
        Locale::Japanese => command
            .about("Specify仕様駆動開発プロジェクトのセットアップツール")
            .mut_subcommand("init", |init| {
                init.about("最新テンプレートから新しいSpecifyプロジェクトを初期化")
                    .mut_arg("project_name", |a| {
                        a.help("新しいプロジェクトディレクトリの名前（--here使用時はオプション）")
                    })
                    .mut_arg("ai", |a| {
                        a.help("使用するAIアシスタント: copilot, claude, または gemini")
                    })
                    .mut_arg("here", |a| {
                        a.help("新しいディレクトリを作成せず、現在のディレクトリでプロジェクトを初期化")
                    })
                    .mut_arg("no_git", |a| a.help("gitリポジトリの初期化をスキップ"))
                    .mut_arg("ignore_agent_tools", |a| {
                        a.help("Claude CodeなどのAIエージェントツールのチェックをスキップ")
                    })
                    .mut_arg("yes", |a| a.help("すべてのプロンプトを自動確認（非対話モード）"))
            })
            .mut_subcommand("check", |check| {
                check.about("必要なツールがすべてインストールされているか確認")
            }),
    }
}

impl From<CliInitArgs> for InitArgs {
    fn from(args: CliInitArgs) -> Self {
        InitArgs {
            project_name: args.project_name,
            variant: args.ai,
            here: args.here,
            no_git: args.no_git,
            ignore_agent_tools: args.ignore_agent_tools,
            yes: args.yes,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

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

    let config = SpecKitConfig;
    let locale = config.locale();
    let matches = localized_command(locale).get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let result = match args.command {
        Some(Command::Init(init_args)) => speckit_core::run_init(&config, init_args.into()).await,
        Some(Command::Check) => speckit_core::run_check(&config).await,
        None => {
            localized_command(locale).print_help()?;
            Ok(())
        }
    };

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_init_flags() {
        let args = Args::parse_from(["specify", "init", "demo", "--ai", "claude", "--no-git"]);
        match args.command {
            Some(Command::Init(init)) => {
                let init: InitArgs = init.into();
                assert_eq!(init.project_name.as_deref(), Some("demo"));
                assert_eq!(init.variant.as_deref(), Some("claude"));
                assert!(init.no_git);
                assert!(!init.here);
            }
            other => panic!("expected init, got {:?}", other),
        }
    }

    #[test]
    fn test_default_variant_is_known() {
        let config = SpecKitConfig;
        assert!(config.find_variant(config.default_variant()).is_some());
        assert_eq!(config.variant_keys(), "copilot, claude, gemini");
    }

    #[test]
    fn test_next_steps_for_new_directory() {
        let config = SpecKitConfig;
        let variant = config.find_variant("gemini").unwrap();
        let steps = config.next_steps(Path::new("/work/demo"), variant, false, Locale::English);
        assert_eq!(steps[0], "cd demo");
        assert!(steps[1].contains("GEMINI.md"));
        assert!(steps[2].contains("CONSTITUTION.md"));
    }

    #[test]
    fn test_next_steps_in_place() {
        let config = SpecKitConfig;
        let variant = config.find_variant("copilot").unwrap();
        let steps = config.next_steps(Path::new("/work/demo"), variant, true, Locale::English);
        assert_eq!(steps[0], "You're already in the project directory!");
        assert!(steps[1].contains("GitHub Copilot"));
    }

    #[test]
    fn test_japanese_next_steps() {
        let config = SpecKitConfig;
        let variant = config.find_variant("copilot").unwrap();
        let steps = config.next_steps(Path::new("/work/demo"), variant, true, Locale::Japanese);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], "既にプロジェクトディレクトリにいます！");
        assert!(steps[1].contains("GitHub Copilot"));
        assert!(steps[2].starts_with("CONSTITUTION.md"));

        let gemini = config.find_variant("gemini").unwrap();
        let steps = config.next_steps(Path::new("/work/demo"), gemini, false, Locale::Japanese);
        assert_eq!(steps[0], "cd demo");
        assert!(steps[1].contains("GEMINI.md"));
    }

    #[test]
    fn test_japanese_help_keeps_flags() {
        let command = localized_command(Locale::Japanese);
        command.clone().debug_assert();
        assert_eq!(
            command.get_about().map(|s| s.to_string()).as_deref(),
            Some("Specify仕様駆動開発プロジェクトのセットアップツール")
        );

        let init = command.find_subcommand("init").unwrap();
        let no_git = init
            .get_arguments()
            .find(|a| a.get_id() == "no_git")
            .unwrap();
        assert_eq!(
            no_git.get_help().map(|s| s.to_string()).as_deref(),
            Some("gitリポジトリの初期化をスキップ")
        );

        let matches = command
            .try_get_matches_from(["specify", "init", "--here", "--ai", "gemini"])
            .unwrap();
        match Args::from_arg_matches(&matches).unwrap().command {
            Some(Command::Init(init)) => {
                assert!(init.here);
                assert_eq!(init.ai.as_deref(), Some("gemini"));
            }
            other => panic!("expected init, got {:?}", other),
        }
    }
}
