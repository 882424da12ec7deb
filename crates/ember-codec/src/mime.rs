use std::collections::HashMap;
use std::path::Path;

/// Lower-cased extension of `path`, if it has one.
pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Looks the extension of `path` up in `table`, falling back to `default`.
pub fn mime_for<'a>(table: &'a HashMap<String, String>, path: &Path, default: &'a str) -> &'a str {
    extension(path)
        .and_then(|ext| table.get(&ext))
        .map(String::as_str)
        .unwrap_or(default)
}
