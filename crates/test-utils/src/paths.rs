//! Path utilities for locating test data and fonts.

use std::path::PathBuf;

/// Font file looked up by tests that measure or draw text.
pub const TEST_FONT: &str = "DejaVuSans.ttf";

/// Bold companion of [`TEST_FONT`].
pub const TEST_FONT_BOLD: &str = "DejaVuSans-Bold.ttf";

/// Two levels above this crate's manifest.
fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Searches for a test file in multiple locations.
///
/// This function checks the following locations in order:
/// 1. Environment variable `TEST_DATA_DIR` (if set)
/// 2. `testdata/` at the workspace root
/// 3. The system DejaVu font directories
///
/// # Returns
///
/// `Some(PathBuf)` if the file is found, `None` otherwise.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    candidates.extend([
        workspace_root().join("testdata").join(name),
        PathBuf::from("/usr/share/fonts/truetype/dejavu").join(name),
        PathBuf::from("/usr/share/fonts/TTF").join(name),
        PathBuf::from("/usr/share/fonts/dejavu").join(name),
    ]);

    candidates.into_iter().find(|path| path.exists())
}

/// Regular and bold test fonts, when installed.
pub fn find_test_fonts() -> Option<(PathBuf, Option<PathBuf>)> {
    let regular = find_test_file(TEST_FONT)?;
    Some((regular, find_test_file(TEST_FONT_BOLD)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").is_file());
    }

    #[test]
    fn test_missing_file_not_found() {
        assert!(find_test_file("no-such-file.ttf").is_none());
    }
}
