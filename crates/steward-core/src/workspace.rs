//! Workspace layout and shared-state directory resolution.
//!
//! Definitions live under `.steward/` in the working copy. Runtime state must
//! be shared by every working copy of the same repository, so its directory
//! is derived from the git common dir (worktree-aware) rather than from the
//! working copy itself. Non-git workspaces fall back to `.steward/state`.

use crate::config::Config;
use crate::error::Result;
use crate::{io, paths};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    state_dir: PathBuf,
    config: Config,
}

impl Workspace {
    /// Open an initialized workspace. `state_override` (from the CLI env
    /// hook) wins over the config's `state_dir`, which wins over derivation.
    pub fn open_with(root: &Path, state_override: Option<&Path>) -> Result<Self> {
        let config = Config::load(root)?;
        let state_dir = resolve_state_dir(root, &config, state_override)?;
        ensure_state_skeleton(root, &state_dir)?;
        Ok(Workspace {
            root: root.to_path_buf(),
            state_dir,
            config,
        })
    }

    pub fn open(root: &Path) -> Result<Self> {
        Self::open_with(root, None)
    }

    /// Scaffold `.steward/` and the shared state tree. Idempotent: an
    /// existing config is kept as-is.
    pub fn init(root: &Path, project_name: &str) -> Result<Self> {
        Self::init_with(root, project_name, None)
    }

    pub fn init_with(
        root: &Path,
        project_name: &str,
        state_override: Option<&Path>,
    ) -> Result<Self> {
        io::ensure_dir(&paths::epics_dir(root))?;
        let config_path = paths::config_path(root);
        if !config_path.exists() {
            Config::new(project_name).save(root)?;
        }
        Self::open_with(root, state_override)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// State dir resolution
// ---------------------------------------------------------------------------

fn resolve_state_dir(root: &Path, config: &Config, state_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = state_override {
        return Ok(absolutize(root, p));
    }
    if let Some(p) = &config.state_dir {
        return Ok(absolutize(root, p));
    }
    if let Some(common) = git_common_dir(root)? {
        return Ok(common.join(paths::STATE_SUBDIR));
    }
    Ok(root.join(paths::FALLBACK_STATE_DIR))
}

fn absolutize(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Locate the git common dir for `root`, or `None` when `root` is not a git
/// working copy.
///
/// A linked worktree has a `.git` *file* containing `gitdir: <path>`; that
/// private gitdir in turn carries a `commondir` file pointing back at the
/// repository-level dir shared by all worktrees. Resolving through both
/// levels is what makes every working copy agree on one state location.
fn git_common_dir(root: &Path) -> Result<Option<PathBuf>> {
    let dot_git = root.join(".git");
    let gitdir = if dot_git.is_dir() {
        dot_git
    } else if dot_git.is_file() {
        let content = std::fs::read_to_string(&dot_git)?;
        let Some(rel) = content.trim().strip_prefix("gitdir:") else {
            return Ok(None);
        };
        absolutize(root, Path::new(rel.trim()))
    } else {
        return Ok(None);
    };

    let commondir_file = gitdir.join("commondir");
    let common = if commondir_file.is_file() {
        let rel = std::fs::read_to_string(&commondir_file)?;
        absolutize(&gitdir, Path::new(rel.trim()))
    } else {
        gitdir
    };

    // commondir entries are usually relative ("../.."); normalize so every
    // worktree derives a byte-identical path.
    Ok(Some(match common.canonicalize() {
        Ok(p) => p,
        Err(_) => common,
    }))
}

fn ensure_state_skeleton(root: &Path, state: &Path) -> Result<()> {
    io::ensure_dir(&paths::runtime_epics_dir(state))?;
    io::ensure_dir(&paths::runtime_tasks_dir(state))?;
    io::ensure_dir(&paths::locks_dir(state))?;
    io::ensure_dir(&paths::receipts_dir(state))?;
    io::ensure_dir(&paths::runs_dir(state))?;
    if state == root.join(paths::FALLBACK_STATE_DIR) {
        io::ensure_gitignore_entry(root, paths::GITIGNORE_STATE_ENTRY)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_is_idempotent_and_keeps_config() {
        let dir = TempDir::new().unwrap();
        Workspace::init(dir.path(), "first").unwrap();
        let ws = Workspace::init(dir.path(), "second").unwrap();
        assert_eq!(ws.config().project.name, "first");
    }

    #[test]
    fn open_uninitialized_fails() {
        let dir = TempDir::new().unwrap();
        let err = Workspace::open(dir.path()).unwrap_err();
        assert_eq!(err.code(), "not_initialized");
    }

    #[test]
    fn non_git_falls_back_and_gitignores_state() {
        let dir = TempDir::new().unwrap();
        let ws = Workspace::init(dir.path(), "p").unwrap();
        assert_eq!(ws.state_dir(), dir.path().join(".steward/state"));
        assert!(paths::runs_dir(ws.state_dir()).is_dir());
        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(gitignore.lines().any(|l| l == ".steward/state/"));
    }

    #[test]
    fn git_dir_maps_to_common_state() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let ws = Workspace::init(dir.path(), "p").unwrap();
        assert_eq!(
            ws.state_dir().canonicalize().unwrap(),
            dir.path().join(".git/steward").canonicalize().unwrap()
        );
    }

    #[test]
    fn linked_worktree_resolves_to_main_common_dir() {
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        let wt = dir.path().join("wt");
        let private = main.join(".git/worktrees/wt");
        std::fs::create_dir_all(&private).unwrap();
        std::fs::create_dir_all(&wt).unwrap();
        std::fs::write(wt.join(".git"), format!("gitdir: {}\n", private.display())).unwrap();
        std::fs::write(private.join("commondir"), "../..\n").unwrap();

        let main_ws = Workspace::init(&main, "p").unwrap();
        std::fs::create_dir_all(paths::steward_dir(&wt)).unwrap();
        std::fs::copy(paths::config_path(&main), paths::config_path(&wt)).unwrap();
        let wt_ws = Workspace::open(&wt).unwrap();
        assert_eq!(
            wt_ws.state_dir().canonicalize().unwrap(),
            main_ws.state_dir().canonicalize().unwrap()
        );
    }

    #[test]
    fn config_state_dir_override() {
        let dir = TempDir::new().unwrap();
        Workspace::init(dir.path(), "p").unwrap();
        let mut cfg = Config::load(dir.path()).unwrap();
        cfg.state_dir = Some(PathBuf::from("custom-state"));
        cfg.save(dir.path()).unwrap();
        let ws = Workspace::open(dir.path()).unwrap();
        assert_eq!(ws.state_dir(), dir.path().join("custom-state"));
    }

    #[test]
    fn explicit_override_beats_config() {
        let dir = TempDir::new().unwrap();
        Workspace::init(dir.path(), "p").unwrap();
        let mut cfg = Config::load(dir.path()).unwrap();
        cfg.state_dir = Some(PathBuf::from("from-config"));
        cfg.save(dir.path()).unwrap();
        let explicit = dir.path().join("from-env");
        let ws = Workspace::open_with(dir.path(), Some(&explicit)).unwrap();
        assert_eq!(ws.state_dir(), explicit);
    }
}
