use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Turns an item id into a file stem that is safe on every platform.
pub fn file_stem_for(id: &str) -> String {
    let id: String = id.nfc().collect();
    let cleaned = sanitize_filename::sanitize_with_options(
        id.trim(),
        sanitize_filename::Options {
            windows: true,
            truncate: true,
            replacement: "_",
        },
    );
    let cleaned = cleaned.trim_end_matches(['.', ' ']).to_string();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

pub fn output_path(dir: &Path, id: &str, extension: &str) -> PathBuf {
    let ext = extension.trim_start_matches('.');
    if ext.is_empty() {
        dir.join(file_stem_for(id))
    } else {
        dir.join(format!("{}.{}", file_stem_for(id), ext))
    }
}

pub fn part_path_for(output: &Path) -> PathBuf {
    let mut part = output.as_os_str().to_owned();
    part.push(".part");
    PathBuf::from(part)
}
