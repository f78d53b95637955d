use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "TUBEGRAB_DATA_DIR";

pub trait AppPaths: Send + Sync {
    fn data_dir(&self) -> PathBuf;
    fn profiles_dir(&self) -> PathBuf;
}

pub struct DesktopPaths;

impl AppPaths for DesktopPaths {
    fn data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::data_dir()
            .map(|d| d.join("tubegrab"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Scratch space for throwaway browser profiles.
    fn profiles_dir(&self) -> PathBuf {
        std::env::temp_dir().join("tubegrab-profiles")
    }
}
