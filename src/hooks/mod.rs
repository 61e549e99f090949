//! Post-commit hook management.
//!
//! Installs a `post-commit` script into the repository's hook directory
//! that fires an unauthenticated `POST /review-diff` at the local daemon.
//! The script is fire-and-forget: the request is backgrounded, its response
//! discarded, and the hook always exits 0 so a down reviewer never blocks a
//! commit. Git runs hooks through its bundled `sh` on every platform, so a
//! single POSIX script suffices.

use std::path::{Path, PathBuf};
use tracing::info;

/// Marker comment identifying a hook as ours; uninstall refuses to touch a
/// post-commit script that doesn't carry it.
const HOOK_MARKER: &str = "installed by revd";

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("no git repository found at {0} (missing .git/hooks)")]
    NoRepository(String),
    #[error("a post-commit hook not managed by revd already exists at {0} — re-run with --force to overwrite")]
    ForeignHook(PathBuf),
    #[error("hook io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HookStatus {
    NotInstalled,
    /// Our hook is present; `port` is what it currently posts to.
    Installed { port: Option<u16> },
    /// A post-commit hook exists but was not written by revd.
    Foreign,
}

pub fn hook_path(workspace: &Path) -> PathBuf {
    workspace.join(".git").join("hooks").join("post-commit")
}

fn hooks_dir(workspace: &Path) -> Result<PathBuf, HookError> {
    let dir = workspace.join(".git").join("hooks");
    if !dir.is_dir() {
        return Err(HookError::NoRepository(workspace.display().to_string()));
    }
    Ok(dir)
}

fn hook_script(port: u16) -> String {
    format!(
        r#"#!/bin/sh
# post-commit hook {HOOK_MARKER} — posts the new commit for AI review.
# Fire-and-forget: the response is discarded and the commit never blocks.
url="http://127.0.0.1:{port}/review-diff"
( curl -fsS -m 120 -X POST -H "Content-Type: application/json" -d "{{}}" "$url" >/dev/null 2>&1 & )
exit 0
"#
    )
}

/// Write the post-commit hook posting to `port`.
///
/// Overwrites a previous revd hook in place; refuses to clobber a foreign
/// post-commit hook unless `force` is set.
pub fn install(workspace: &Path, port: u16, force: bool) -> Result<PathBuf, HookError> {
    hooks_dir(workspace)?;
    let path = hook_path(workspace);

    if !force && matches!(status(workspace)?, HookStatus::Foreign) {
        return Err(HookError::ForeignHook(path));
    }

    std::fs::write(&path, hook_script(port))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    info!(path = %path.display(), port, "post-commit hook installed");
    Ok(path)
}

/// Remove the hook iff it is ours. Returns whether anything was removed;
/// calling with no hook present is a no-op.
pub fn uninstall(workspace: &Path) -> Result<bool, HookError> {
    hooks_dir(workspace)?;
    let path = hook_path(workspace);

    match status(workspace)? {
        HookStatus::NotInstalled => Ok(false),
        HookStatus::Foreign => Err(HookError::ForeignHook(path)),
        HookStatus::Installed { .. } => {
            std::fs::remove_file(&path)?;
            info!(path = %path.display(), "post-commit hook removed");
            Ok(true)
        }
    }
}

/// Inspect the current post-commit hook.
pub fn status(workspace: &Path) -> Result<HookStatus, HookError> {
    hooks_dir(workspace)?;
    let path = hook_path(workspace);

    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(HookStatus::NotInstalled)
        }
        Err(e) => return Err(e.into()),
    };

    if !contents.contains(HOOK_MARKER) {
        return Ok(HookStatus::Foreign);
    }

    Ok(HookStatus::Installed {
        port: parse_hook_port(&contents),
    })
}

/// Pull the port back out of the installed script's url line.
fn parse_hook_port(contents: &str) -> Option<u16> {
    let url_line = contents
        .lines()
        .find(|l| l.trim_start().starts_with("url="))?;
    let rest = url_line.rsplit(':').next()?;
    rest.split('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hook_port_roundtrip() {
        assert_eq!(parse_hook_port(&hook_script(3001)), Some(3001));
        assert_eq!(parse_hook_port(&hook_script(65535)), Some(65535));
        assert_eq!(parse_hook_port("#!/bin/sh\nexit 0\n"), None);
    }
}
