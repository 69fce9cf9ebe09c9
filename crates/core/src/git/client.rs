//! Read-only repository inspection via `git2`.
//!
//! Answers the questions the report needs about an in-progress merge: which
//! paths are conflicted, what kind of operation produced them, and which
//! branches are involved. Nothing here writes to the repository.

use std::path::{Path, PathBuf};

use git2::{Oid, ReferenceType, Repository, RepositoryState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;

/// Files naming the incoming commit, checked in this order.
const INCOMING_HEAD_FILES: [&str; 3] = ["MERGE_HEAD", "CHERRY_PICK_HEAD", "REVERT_HEAD"];

/// Kind of operation that left the work tree conflicted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MergeType {
    Merge,
    Rebase,
    CherryPick,
    Revert,
    Unknown,
}

impl From<RepositoryState> for MergeType {
    fn from(state: RepositoryState) -> Self {
        match state {
            RepositoryState::Merge => Self::Merge,
            RepositoryState::Rebase
            | RepositoryState::RebaseInteractive
            | RepositoryState::RebaseMerge
            | RepositoryState::ApplyMailbox
            | RepositoryState::ApplyMailboxOrRebase => Self::Rebase,
            RepositoryState::CherryPick | RepositoryState::CherryPickSequence => Self::CherryPick,
            RepositoryState::Revert | RepositoryState::RevertSequence => Self::Revert,
            RepositoryState::Clean | RepositoryState::Bisect => Self::Unknown,
        }
    }
}

impl std::fmt::Display for MergeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
            Self::CherryPick => write!(f, "cherry-pick"),
            Self::Revert => write!(f, "revert"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Branch names on both sides of the conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchNames {
    /// Checked-out branch, or `HEAD` when detached.
    pub current: String,
    /// Name of the commit being merged in, or `unknown`.
    pub incoming: String,
}

/// High-level Git client wrapping a `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

impl GitClient {
    /// Open the repository enclosing `path`.
    ///
    /// Fails with [`GitError::RepositoryNotFound`] outside a repository and
    /// [`GitError::BareRepository`] when there is no work tree to scan.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(repo.path().display().to_string()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    /// Root of the work tree; conflicted paths are relative to it.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Paths with unmerged index entries, in index order, without duplicates.
    #[instrument(skip(self))]
    pub fn conflicted_paths(&self) -> Result<Vec<String>, GitError> {
        let index = self.repo.index()?;
        if !index.has_conflicts() {
            debug!("index has no conflicts");
            return Ok(Vec::new());
        }

        let mut paths: Vec<String> = Vec::new();
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            let entry = conflict
                .our
                .as_ref()
                .or(conflict.their.as_ref())
                .or(conflict.ancestor.as_ref());
            if let Some(entry) = entry {
                let path = String::from_utf8_lossy(&entry.path).into_owned();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
        }
        info!(count = paths.len(), "found conflicted paths");
        Ok(paths)
    }

    /// The operation currently in progress.
    pub fn merge_type(&self) -> MergeType {
        MergeType::from(self.repo.state())
    }

    /// Current and incoming branch names.
    pub fn branches(&self) -> BranchNames {
        BranchNames {
            current: self.current_branch().unwrap_or_else(|| "HEAD".to_string()),
            incoming: self
                .incoming_branch()
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    fn current_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(str::to_string)
    }

    /// Name of the commit recorded in the first existing incoming-head file.
    fn incoming_branch(&self) -> Option<String> {
        let git_dir = self.repo.path();
        let head_file = INCOMING_HEAD_FILES
            .iter()
            .map(|name| git_dir.join(name))
            .find(|path| path.exists())?;

        let contents = match std::fs::read_to_string(&head_file) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %head_file.display(), error = %e, "cannot read incoming head");
                return None;
            }
        };
        let oid = Oid::from_str(contents.lines().next()?.trim()).ok()?;
        Some(self.name_commit(oid))
    }

    /// Name a commit by a ref pointing at it: local branch, then remote
    /// branch, then tag. Falls back to the abbreviated id.
    fn name_commit(&self, oid: Oid) -> String {
        let mut best: Option<(u8, String)> = None;

        if let Ok(refs) = self.repo.references() {
            for reference in refs.flatten() {
                if reference.kind() != Some(ReferenceType::Direct) {
                    continue;
                }
                let Some(name) = reference.name() else {
                    continue;
                };
                let rank = if name.starts_with("refs/heads/") {
                    0
                } else if name.starts_with("refs/remotes/") {
                    1
                } else if name.starts_with("refs/tags/") {
                    2
                } else {
                    continue;
                };
                let points_here = reference
                    .peel_to_commit()
                    .map(|c| c.id() == oid)
                    .unwrap_or(false);
                if !points_here {
                    continue;
                }
                let Some(short) = reference.shorthand() else {
                    continue;
                };
                let candidate = (rank, short.to_string());
                if best.as_ref().map_or(true, |b| candidate < *b) {
                    best = Some(candidate);
                }
            }
        }

        match best {
            Some((_, name)) => name,
            None => {
                let mut id = oid.to_string();
                id.truncate(7);
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{RepositoryInitOptions, Signature};

    fn init_repo(dir: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        Repository::init_opts(dir, &opts).unwrap()
    }

    fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().map(|h| h.peel_to_commit().unwrap());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_repo_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitClient::discover(dir.path());
        assert!(matches!(result, Err(GitError::RepositoryNotFound(_))));
    }

    #[test]
    fn test_bare_repo_rejected() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init_bare(dir.path()).unwrap();
        let result = GitClient::discover(dir.path());
        assert!(matches!(result, Err(GitError::BareRepository(_))));
    }

    #[test]
    fn test_clean_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        commit_file(&repo, "a.txt", "hello\n", "initial");

        let client = GitClient::discover(dir.path()).unwrap();
        assert!(client.conflicted_paths().unwrap().is_empty());
        assert_eq!(client.merge_type(), MergeType::Unknown);
        assert_eq!(
            client.branches(),
            BranchNames {
                current: "main".into(),
                incoming: "unknown".into()
            }
        );
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        commit_file(&repo, "a.txt", "hello\n", "initial");
        let sub = dir.path().join("nested/deeper");
        std::fs::create_dir_all(&sub).unwrap();

        let client = GitClient::discover(&sub).unwrap();
        assert_eq!(
            client.workdir().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_detached_head_reports_head() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let oid = commit_file(&repo, "a.txt", "hello\n", "initial");
        repo.set_head_detached(oid).unwrap();

        let client = GitClient::discover(dir.path()).unwrap();
        assert_eq!(client.branches().current, "HEAD");
    }

    #[test]
    fn test_incoming_named_by_branch_then_short_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let first = commit_file(&repo, "a.txt", "one\n", "first");
        let second = commit_file(&repo, "a.txt", "two\n", "second");
        repo.branch("topic", &repo.find_commit(first).unwrap(), false)
            .unwrap();
        repo.tag_lightweight("v1", &repo.find_object(first, None).unwrap(), false)
            .unwrap();

        let client = GitClient::discover(dir.path()).unwrap();
        // Local branch wins over the tag pointing at the same commit.
        assert_eq!(client.name_commit(first), "topic");
        // `main` points at `second`.
        assert_eq!(client.name_commit(second), "main");

        std::fs::write(repo.path().join("CHERRY_PICK_HEAD"), format!("{first}\n")).unwrap();
        assert_eq!(client.branches().incoming, "topic");

        let unnamed = Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert_eq!(client.name_commit(unnamed), "0123456");
    }

    #[test]
    fn test_merge_type_mapping() {
        assert_eq!(MergeType::from(RepositoryState::Merge), MergeType::Merge);
        assert_eq!(
            MergeType::from(RepositoryState::RebaseInteractive),
            MergeType::Rebase
        );
        assert_eq!(
            MergeType::from(RepositoryState::ApplyMailbox),
            MergeType::Rebase
        );
        assert_eq!(
            MergeType::from(RepositoryState::CherryPickSequence),
            MergeType::CherryPick
        );
        assert_eq!(MergeType::from(RepositoryState::Revert), MergeType::Revert);
        assert_eq!(MergeType::from(RepositoryState::Bisect), MergeType::Unknown);
        assert_eq!(
            serde_json::to_string(&MergeType::CherryPick).unwrap(),
            "\"cherry-pick\""
        );
        assert_eq!(MergeType::CherryPick.to_string(), "cherry-pick");
    }
}
