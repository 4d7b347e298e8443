//! Git repository helpers for freshly materialized projects

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

/// True if `path` lies inside a git work tree
pub fn is_git_repo(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(path)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Initialize a repository at `path` and commit everything in it
pub fn init_repo(path: &Path, message: &str) -> Result<()> {
    run_git(path, &["init"])?;
    run_git(path, &["add", "."])?;
    run_git(path, &["commit", "-m", message])?;
    tracing::debug!(path = %path.display(), "initialized git repository");
    Ok(())
}

fn run_git(path: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(path)
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_not_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_git_repo(&dir.path().join("missing")));
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    #[test]
    fn test_init_repo_commits_project_files() {
        if !super::super::tool::git_tool().is_installed() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "hello").unwrap();

        // Repository-local identity so the commit does not depend on the machine
        git(dir.path(), &["init", "--quiet"]);
        git(dir.path(), &["config", "user.name", "Spec Kit"]);
        git(dir.path(), &["config", "user.email", "speckit@example.com"]);
        git(dir.path(), &["config", "commit.gpgsign", "false"]);

        init_repo(dir.path(), "Initial commit").unwrap();

        assert!(is_git_repo(dir.path()));
        assert_eq!(git(dir.path(), &["log", "-1", "--format=%s"]), "Initial commit");
        assert_eq!(git(dir.path(), &["ls-files"]), "README.md");
    }
}
