//! Translated text for the interactive flows
//!
//! Templates use `{}` placeholders, filled in order by [`fill`].

use crate::locale::Locale;
use std::fmt::Display;

/// Every user-facing string of `init` and `check`
#[derive(Debug)]
pub struct Messages {
    pub tracker_title: &'static str,
    pub step_precheck: &'static str,
    pub step_ai_select: &'static str,
    /// Labels for the pipeline steps, in registration order
    pub pipeline_steps: [&'static str; 6],
    pub step_git: &'static str,
    pub step_final: &'static str,
    pub precheck_ok: &'static str,
    pub setup_failed_detail: &'static str,
    pub setup_failed: &'static str,
    pub project_ready_detail: &'static str,
    pub project_ready: &'static str,

    pub name_and_here: &'static str,
    pub name_or_here: &'static str,
    pub directory_not_empty: &'static str,
    pub continue_anyway: &'static str,
    pub cancelled: &'static str,
    pub init_here: &'static str,
    pub already_exists: &'static str,
    pub creating: &'static str,

    pub git_missing: &'static str,
    pub tool_missing: &'static str,
    pub tool_installed: &'static str,
    pub using_variant: &'static str,
    pub invalid_variant: &'static str,
    pub choose_variant: &'static str,
    pub variant_requires: &'static str,
    pub ignore_tools_tip: &'static str,
    pub tool_required: &'static str,

    pub git_flag: &'static str,
    pub git_existing: &'static str,
    pub git_unavailable: &'static str,
    pub git_initialized: &'static str,
    pub git_failed: &'static str,

    pub next_steps: &'static str,
    pub outro: &'static str,

    pub check_intro: &'static str,
    pub checking_connectivity: &'static str,
    pub connected: &'static str,
    pub offline: &'static str,
    pub check_connection: &'static str,
    pub suggest_git: &'static str,
    pub suggest_agent: &'static str,
    pub check_ready: &'static str,
}

pub const ENGLISH: Messages = Messages {
    tracker_title: "Initialize {} project",
    step_precheck: "Check required tools",
    step_ai_select: "Select AI assistant",
    pipeline_steps: [
        "Fetch latest release",
        "Download template",
        "Archive contents",
        "Extract template",
        "Flatten nested directory",
        "Remove temporary archive",
    ],
    step_git: "Initialize git repository",
    step_final: "Finalize",
    precheck_ok: "ok",
    setup_failed_detail: "setup failed",
    setup_failed: "Project setup failed",
    project_ready_detail: "project ready",
    project_ready: "Project ready.",

    name_and_here: "Cannot specify both a project name and --here",
    name_or_here: "Specify a project name or use --here",
    directory_not_empty: "Current directory is not empty ({} items). Template files will be merged with existing content and may overwrite existing files",
    continue_anyway: "Continue anyway?",
    cancelled: "Setup cancelled.",
    init_here: "Initializing in current directory: {}",
    already_exists: "Directory '{}' already exists",
    creating: "Creating new project: {}",

    git_missing: "Git not found; repository initialization will be skipped",
    tool_missing: "{} not found. Install it from {}",
    tool_installed: "{} installed ({})",
    using_variant: "Using AI assistant: {}",
    invalid_variant: "Invalid AI assistant '{}'. Choose from: {}",
    choose_variant: "Choose your AI assistant",
    variant_requires: "{} projects require {}",
    ignore_tools_tip: "Tip: use --ignore-agent-tools to skip this check",
    tool_required: "Required AI tool is missing.",

    git_flag: "--no-git flag",
    git_existing: "existing repository detected",
    git_unavailable: "git not available",
    git_initialized: "initialized",
    git_failed: "init failed",

    next_steps: "Next steps",
    outro: "Happy specifying!",

    check_intro: "Checking {} requirements",
    checking_connectivity: "Checking internet connectivity...",
    connected: "Internet connection available",
    offline: "No internet connection - required for downloading templates",
    check_connection: "Please check your internet connection",
    suggest_git: "Consider installing git for repository management",
    suggest_agent: "Consider installing an AI assistant for the best experience",
    check_ready: "{} CLI is ready to use!",
};

pub const JAPANESE: Messages = Messages {
    tracker_title: "{}プロジェクトの初期化",
    step_precheck: "必要なツールを確認",
    step_ai_select: "AIアシスタントを選択",
    pipeline_steps: [
        "最新リリースを取得",
        "テンプレートをダウンロード",
        "アーカイブの内容",
        "テンプレートを展開",
        "ネストされたディレクトリを平坦化",
        "一時アーカイブを削除",
    ],
    step_git: "Gitリポジトリを初期化",
    step_final: "完了",
    precheck_ok: "OK",
    setup_failed_detail: "セットアップ失敗",
    setup_failed: "プロジェクトのセットアップに失敗しました",
    project_ready_detail: "プロジェクト準備完了",
    project_ready: "プロジェクトの準備が完了しました。",

    name_and_here: "プロジェクト名と--hereフラグを同時に指定できません",
    name_or_here: "プロジェクト名を指定するか、--hereフラグを使用してください",
    directory_not_empty: "現在のディレクトリは空ではありません（{}個のアイテム）。テンプレートファイルは既存のコンテンツとマージされ、既存のファイルを上書きする可能性があります",
    continue_anyway: "続行しますか？",
    cancelled: "操作がキャンセルされました",
    init_here: "現在のディレクトリで初期化: {}",
    already_exists: "ディレクトリ '{}' は既に存在します",
    creating: "新しいプロジェクトを作成: {}",

    git_missing: "Gitが見つかりません - リポジトリの初期化をスキップします",
    tool_missing: "{}が見つかりません。インストール先: {}",
    tool_installed: "{}がインストールされています（{}）",
    using_variant: "AIアシスタント: {}",
    invalid_variant: "無効なAIアシスタント '{}'。次から選択してください: {}",
    choose_variant: "AIアシスタントを選択:",
    variant_requires: "{}プロジェクトには{}が必要です",
    ignore_tools_tip: "ヒント: --ignore-agent-toolsを使用してこのチェックをスキップできます",
    tool_required: "必要なAIツールがありません！",

    git_flag: "--no-gitフラグ",
    git_existing: "既存のリポジトリを検出",
    git_unavailable: "gitが利用できません",
    git_initialized: "初期化完了",
    git_failed: "初期化失敗",

    next_steps: "次のステップ",
    outro: "良い仕様駆動開発を！",

    check_intro: "{}の要件を確認中",
    checking_connectivity: "インターネット接続を確認中...",
    connected: "インターネット接続が利用可能です",
    offline: "インターネット接続がありません - テンプレートのダウンロードに必要です",
    check_connection: "インターネット接続を確認してください",
    suggest_git: "リポジトリ管理のためにgitのインストールを検討してください",
    suggest_agent: "最良の体験のためにAIアシスタントのインストールを検討してください",
    check_ready: "{} CLIは使用可能です！",
};

impl Messages {
    pub fn for_locale(locale: Locale) -> &'static Messages {
        match locale {
            Locale::English => &ENGLISH,
            Locale::Japanese => &JAPANESE,
        }
    }
}

/// Replace each `{}` in `template` with the next argument
pub fn fill(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    for (i, piece) in template.split("{}").enumerate() {
        if i > 0 {
            match args.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
        }
        out.push_str(piece);
    }
    out
}
