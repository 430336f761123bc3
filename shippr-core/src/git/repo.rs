//! Git repository detection and history inspection

use std::path::{Path, PathBuf};

use git2::{Repository, Sort};

use crate::{Error, Result};

/// Information about a git remote
#[derive(Debug, Clone)]
pub struct RemoteInfo {
    /// Name of the remote (e.g., "origin")
    pub name: String,
    /// URL of the remote
    pub url: String,
}

/// Read-only view of the local repository
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the repository root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// This will search upward from the given path to find the repository root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Config(format!(
                    "Not a git repository: {}. Run shippr from inside a git checkout.",
                    path.display()
                ))
            } else {
                Error::Git(e)
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a remote by name
    pub fn remote(&self, name: &str) -> Result<RemoteInfo> {
        let remote = self.repo.find_remote(name).map_err(|e| {
            Error::Config(format!("Remote '{}' not found: {}", name, e))
        })?;

        let url = remote
            .url()
            .ok_or_else(|| Error::Config(format!("Remote '{}' has no valid URL", name)))?;

        Ok(RemoteInfo {
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    /// Get the current branch name
    ///
    /// Returns `None` for a detached or unborn HEAD.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(e)),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Current branch, refusing detached HEAD and the base branch itself
    pub fn feature_branch(&self, base_branch: &str) -> Result<String> {
        let branch = self.current_branch()?.ok_or(Error::DetachedHead)?;

        if branch == base_branch {
            return Err(Error::OnBaseBranch(branch));
        }

        Ok(branch)
    }

    /// Subjects of the commits on HEAD that are not on `<remote>/<base>`
    ///
    /// Oldest first. The remote tracking branch must exist locally, so fetch
    /// the base branch before calling this.
    pub fn commits_ahead(&self, remote: &str, base: &str) -> Result<Vec<String>> {
        let upstream = format!("refs/remotes/{}/{}", remote, base);
        let base_ref = self.repo.find_reference(&upstream).map_err(|e| {
            Error::Config(format!("Branch '{}/{}' not found: {}", remote, base, e))
        })?;
        let base_oid = base_ref.peel_to_commit()?.id();

        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        walk.push_head()?;
        walk.hide(base_oid)?;

        let mut subjects = Vec::new();
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            subjects.push(commit.summary().unwrap_or_default().to_string());
        }

        tracing::debug!(
            remote,
            base,
            count = subjects.len(),
            "Collected commits ahead of base"
        );

        Ok(subjects)
    }
}
