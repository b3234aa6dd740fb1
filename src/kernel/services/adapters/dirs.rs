//! 日志放在数据目录，设置放在缓存目录（见 `settings`）。

use std::path::PathBuf;

const APP_NAME: &str = "zsg";

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn home_join(rel: &str) -> Option<PathBuf> {
    env_path("HOME").map(|home| home.join(rel))
}

/// $XDG_CACHE_HOME、~/Library/Caches 或 %LOCALAPPDATA%
pub fn get_cache_dir() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        home_join("Library/Caches")
    } else if cfg!(windows) {
        env_path("LOCALAPPDATA").or_else(|| env_path("APPDATA"))
    } else {
        env_path("XDG_CACHE_HOME").or_else(|| home_join(".cache"))
    }
}

pub fn get_log_dir() -> Option<PathBuf> {
    let data = if cfg!(target_os = "macos") {
        home_join("Library/Application Support")
    } else if cfg!(windows) {
        env_path("APPDATA")
    } else {
        env_path("XDG_DATA_HOME").or_else(|| home_join(".local/share"))
    };
    data.map(|dir| dir.join(APP_NAME).join("logs"))
}

pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    let dir = get_log_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "cannot determine log directory")
    })?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
