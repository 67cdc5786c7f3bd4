//! Read-only access to files in the agent workspace.
//!
//! Requests name files relative to a sandbox root. Paths are resolved
//! lexically first, so `..` components never reach the filesystem, and
//! then canonicalized when the target exists, so a symlink inside the
//! sandbox cannot point out of it either.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` at the root of an absolute path is dropped; a relative path keeps
/// leading `..` components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(component),
            },
            Component::CurDir => {}
            _ => result.push(component),
        }
    }

    result
}

/// Resolve `requested` against `root`, refusing anything outside `root`.
///
/// Fails with [`Error::PathEscape`] for absolute paths, traversal out of
/// the root and symlinks leading elsewhere. The returned path may not
/// exist.
pub fn resolve_sandboxed(root: &Path, requested: &str) -> Result<PathBuf> {
    let escape = || Error::PathEscape(requested.to_string());

    let relative = Path::new(requested);
    if relative.has_root() || relative.is_absolute() {
        return Err(escape());
    }

    let root = normalize_path(root);
    let resolved = normalize_path(&root.join(relative));
    if !resolved.starts_with(&root) || resolved == root {
        return Err(escape());
    }

    if resolved.exists() {
        let real_root = root.canonicalize()?;
        let real = resolved.canonicalize()?;
        if !real.starts_with(&real_root) {
            tracing::warn!(requested, "symlink leads out of the sandbox");
            return Err(escape());
        }
    }

    Ok(resolved)
}

/// Read a UTF-8 text file; `Ok(None)` if it does not exist.
pub fn read_text(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read a file under `root` named by an untrusted relative path.
pub fn read_sandboxed(root: &Path, requested: &str) -> Result<Option<String>> {
    let path = resolve_sandboxed(root, requested)?;
    read_text(&path)
}

/// Goals Markdown, or `None` when the file is missing or unreadable.
pub fn read_goals(path: &Path) -> Option<String> {
    match read_text(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "goals file unreadable");
            None
        }
    }
}
