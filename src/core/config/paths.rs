use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub episodic_db_path: PathBuf,
    pub env_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self::with_data_dir(None)
    }

    /// `data_dir` overrides the discovered user data directory (the
    /// `--data-dir` flag). `REPURAGENT_DATA_DIR` still wins over discovery
    /// when no explicit override is given.
    pub fn with_data_dir(data_dir: Option<PathBuf>) -> Self {
        let project_root = discover_project_root();
        let user_data_dir =
            data_dir.unwrap_or_else(|| discover_user_data_dir(&project_root));
        let log_dir = user_data_dir.join("logs");
        let db_path = user_data_dir.join("repuragent_memory.db");
        let episodic_db_path = user_data_dir.join("episodic_memory.db");
        let env_path = project_root.join(".env");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            db_path,
            episodic_db_path,
            env_path,
        }
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("REPURAGENT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("REPURAGENT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("RepurAgent");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("RepurAgent");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("repuragent")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
