use std::path::{Path, PathBuf};

use uuid::Uuid;

/// The user container files are copied in and out as.
///
/// Scratch containers run as the invoking user; `$USER` is what the
/// environment says that is.
pub(crate) fn current_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}

/// A uniquely named path under `dir`; nothing is created.
pub(crate) fn unique_temp_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}-{}", Uuid::new_v4()))
}
