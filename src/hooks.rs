//! Git post-commit hook management.
//!
//! The hook keeps the index current without a running watcher: every commit
//! triggers a quiet incremental sync. Deliberately thin — a marker line
//! identifies our hook so install/remove never clobber a user's own script.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;

const HOOK_MARKER: &str = "# installed by codexray";

const HOOK_SCRIPT: &str = "#!/bin/sh\n# installed by codexray\ncodexray sync --quiet || true\n";

fn hook_path(root: &Path) -> PathBuf {
    root.join(".git").join("hooks").join("post-commit")
}

/// Install the post-commit hook and record it in the config.
pub fn install(root: &Path) -> Result<()> {
    let git_dir = root.join(".git");
    if !git_dir.is_dir() {
        anyhow::bail!("{} is not a git repository", root.display());
    }

    let path = hook_path(root);
    if let Some(existing) = read_hook(&path) {
        if !existing.contains(HOOK_MARKER) {
            anyhow::bail!(
                "a post-commit hook already exists at {} — remove it first",
                path.display()
            );
        }
    }

    fs::create_dir_all(path.parent().expect("hooks dir"))?;
    fs::write(&path, HOOK_SCRIPT)
        .with_context(|| format!("cannot write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    let mut config = Config::load(root)?;
    config.git_hooks_enabled = true;
    config.save(root)?;
    Ok(())
}

/// Remove the hook if it is ours; leave foreign hooks alone.
pub fn remove(root: &Path) -> Result<()> {
    let path = hook_path(root);
    if let Some(existing) = read_hook(&path) {
        if existing.contains(HOOK_MARKER) {
            fs::remove_file(&path)
                .with_context(|| format!("cannot remove {}", path.display()))?;
        } else {
            anyhow::bail!(
                "post-commit hook at {} was not installed by codexray",
                path.display()
            );
        }
    }

    let mut config = Config::load(root)?;
    config.git_hooks_enabled = false;
    config.save(root)?;
    Ok(())
}

/// Is our hook currently installed?
pub fn status(root: &Path) -> bool {
    read_hook(&hook_path(root)).is_some_and(|s| s.contains(HOOK_MARKER))
}

fn read_hook(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_project() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git").join("hooks")).unwrap();
        crate::config::init_project(tmp.path()).unwrap();
        tmp
    }

    #[test]
    fn test_install_remove_cycle() {
        let tmp = git_project();
        assert!(!status(tmp.path()));

        install(tmp.path()).unwrap();
        assert!(status(tmp.path()));
        assert!(Config::load(tmp.path()).unwrap().git_hooks_enabled);

        remove(tmp.path()).unwrap();
        assert!(!status(tmp.path()));
        assert!(!Config::load(tmp.path()).unwrap().git_hooks_enabled);
    }

    #[test]
    fn test_install_is_idempotent() {
        let tmp = git_project();
        install(tmp.path()).unwrap();
        install(tmp.path()).unwrap();
        assert!(status(tmp.path()));
    }

    #[test]
    fn test_never_clobbers_foreign_hook() {
        let tmp = git_project();
        let path = tmp.path().join(".git/hooks/post-commit");
        fs::write(&path, "#!/bin/sh\necho custom\n").unwrap();

        assert!(install(tmp.path()).is_err());
        assert!(remove(tmp.path()).is_err());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("custom"));
    }

    #[test]
    fn test_install_requires_git_repo() {
        let tmp = tempfile::tempdir().unwrap();
        crate::config::init_project(tmp.path()).unwrap();
        assert!(install(tmp.path()).is_err());
    }
}
