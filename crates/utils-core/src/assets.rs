use std::path::PathBuf;

use directories::ProjectDirs;

pub const ASSET_DIR_ENV: &str = "TUTORDESK_ASSET_DIR";

/// Directory holding the sqlite database and uploaded attachment binaries.
/// Overridable via `TUTORDESK_ASSET_DIR` (tests point it at a temp dir).
pub fn asset_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ASSET_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("com", "tutordesk", "tutordesk")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("tutordesk"))
}
