use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MediArchive";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the archive database inside the data directory.
pub const DATABASE_FILE_NAME: &str = "MediArchive.db";

/// Get the application data directory.
/// Platform data dir (falling back to home) joined with `MediArchive`.
/// `None` when neither can be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|base| base.join(APP_NAME))
}

/// Default location of the archive database.
pub fn database_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(DATABASE_FILE_NAME))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "mediarchive=debug,warn"
    } else {
        "mediarchive=info,warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_under_app_data() {
        if let (Some(dir), Some(db)) = (app_data_dir(), database_path()) {
            assert!(db.starts_with(&dir));
            assert!(dir.ends_with(APP_NAME));
            assert!(db.ends_with(DATABASE_FILE_NAME));
        }
    }

    #[test]
    fn app_name_is_mediarchive() {
        assert_eq!(APP_NAME, "MediArchive");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn log_filter_targets_crate() {
        assert!(default_log_filter().starts_with("mediarchive="));
    }
}
