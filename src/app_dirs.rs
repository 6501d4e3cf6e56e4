use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "parlance")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("parlance_config.json"))
    }

    /// Default location of the learned-progress file
    pub fn data_path() -> PathBuf {
        ProjectDirs::from("", "", "parlance")
            .map(|proj_dirs| proj_dirs.data_local_dir().join("learned.json"))
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    PathBuf::from(home)
                        .join(".local")
                        .join("share")
                        .join("parlance")
                        .join("learned.json")
                })
            })
            .unwrap_or_else(|| PathBuf::from("learned.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_end_with_expected_file_names() {
        assert!(AppDirs::config_path().ends_with("config.json"));
        assert!(AppDirs::data_path().ends_with("learned.json"));
    }

    #[test]
    fn data_path_uses_platform_data_dir() {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "parlance") {
            assert_eq!(
                AppDirs::data_path(),
                proj_dirs.data_local_dir().join("learned.json")
            );
        }
    }
}
