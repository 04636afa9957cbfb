use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Returns the directory of the running executable, falling back to the
/// current directory.
pub fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_path(path_str: &str) -> PathBuf {
    if path_str.starts_with('~') {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from);

        if let Some(mut home_path) = home {
            if path_str == "~" {
                return home_path;
            }
            if let Some(rest) = path_str
                .strip_prefix("~/")
                .or_else(|| path_str.strip_prefix("~\\"))
            {
                home_path.push(rest);
                return home_path;
            }
        }
    }
    PathBuf::from(path_str)
}

/// Resolves a configured filename: `~` expands, relative paths are joined
/// onto `base`, absolute paths are kept.
pub fn resolve(base: &Path, value: &str) -> PathBuf {
    let expanded = expand_path(value);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Creates the parent directory of `path` if it is missing.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
