use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
///
/// An existing file keeps its permissions; a new file gets the usual
/// `0644` instead of the tempfile's private mode.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    match std::fs::metadata(path) {
        Ok(meta) => std::fs::set_permissions(tmp.path(), meta.permissions())?,
        Err(_) => set_default_mode(tmp.path())?,
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_default_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_default_mode(_path: &Path) -> Result<()> {
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Recursively copy `src` into `dst`, preserving directory structure and
/// file permissions. Existing files in `dst` are replaced. Copied
/// directories stay writable by the owner so the copy can be rewritten.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst)?;
    set_dir_mode(dst, std::fs::metadata(src)?.permissions())?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if std::fs::metadata(&from)?.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            // A read-only file left by an earlier copy cannot be opened for
            // writing, but it can be unlinked.
            if std::fs::symlink_metadata(&to).is_ok() {
                std::fs::remove_file(&to)?;
            }
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

/// Replace `dst` with a fresh copy of `src`, dropping files that no longer
/// exist in `src`.
pub fn replace_dir(src: &Path, dst: &Path) -> Result<()> {
    if dst.is_dir() {
        make_owner_writable(dst)?;
        std::fs::remove_dir_all(dst)?;
    }
    copy_dir(src, dst)
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path, perms: std::fs::Permissions) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = perms.mode() | 0o700;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_dir_mode(dir: &Path, mut perms: std::fs::Permissions) -> Result<()> {
    perms.set_readonly(false);
    std::fs::set_permissions(dir, perms)?;
    Ok(())
}

/// Add owner write permission to every directory under `dir`.
fn make_owner_writable(dir: &Path) -> Result<()> {
    let perms = std::fs::metadata(dir)?.permissions();
    set_dir_mode(dir, perms)?;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            make_owner_writable(&entry.path())?;
        }
    }
    Ok(())
}

/// Apply `rewrite` to the file at `path` and write it back only if the
/// content changed. Returns true if the file was rewritten.
pub fn rewrite_file<F>(path: &Path, rewrite: F) -> Result<bool>
where
    F: FnOnce(&str) -> String,
{
    let original = std::fs::read_to_string(path)?;
    let updated = rewrite(&original);
    if updated == original {
        return Ok(false);
    }
    atomic_write(path, updated.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/test.yaml");
        atomic_write(&path, b"data").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "data");
    }

    #[cfg(unix)]
    #[test]
    fn atomic_write_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        atomic_write(&path, b"new").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn copy_dir_preserves_tree_and_modes() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("nested/deeper")).unwrap();
        std::fs::write(src.join("top.yaml"), "top").unwrap();
        std::fs::write(src.join("nested/deeper/hook.sh"), "#!/bin/sh").unwrap();
        std::fs::set_permissions(
            src.join("nested/deeper/hook.sh"),
            std::fs::Permissions::from_mode(0o750),
        )
        .unwrap();

        let dst = dir.path().join("dst");
        copy_dir(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("top.yaml")).unwrap(), "top");
        let mode = std::fs::metadata(dst.join("nested/deeper/hook.sh"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn copy_dir_handles_read_only_sources_twice() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("gitops.yaml"), "v1").unwrap();
        std::fs::set_permissions(src.join("gitops.yaml"), std::fs::Permissions::from_mode(0o444))
            .unwrap();
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o555)).unwrap();

        let dst = dir.path().join("dst");
        copy_dir(&src, &dst).unwrap();
        // The copy can still be templated in place.
        atomic_write(&dst.join("gitops.yaml"), b"templated").unwrap();
        copy_dir(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("gitops.yaml")).unwrap(), "v1");
        let file_mode = std::fs::metadata(dst.join("gitops.yaml")).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o444);
        let dir_mode = std::fs::metadata(&dst).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o755);

        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn replace_dir_drops_stale_files() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("infrastructure")).unwrap();
        std::fs::write(src.join("gitops.yaml"), "new").unwrap();

        let dst = dir.path().join("dst");
        std::fs::create_dir_all(dst.join("old")).unwrap();
        std::fs::write(dst.join("old/removed.yaml"), "stale").unwrap();
        std::fs::write(dst.join("gitops.yaml"), "old").unwrap();

        replace_dir(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(dst.join("gitops.yaml")).unwrap(), "new");
        assert!(dst.join("infrastructure").is_dir());
        assert!(!dst.join("old").exists());
    }

    #[test]
    fn rewrite_file_skips_unchanged_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.yaml");
        std::fs::write(&path, "region: eu-west-1\n").unwrap();

        assert!(!rewrite_file(&path, |s| s.to_string()).unwrap());
        assert!(rewrite_file(&path, |s| s.replace("eu-west-1", "us-east-1")).unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "region: us-east-1\n"
        );
    }
}
