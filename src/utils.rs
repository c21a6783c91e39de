/// Folder name used when a title yields nothing usable
pub const FALLBACK_FOLDER_NAME: &str = "untitled";

const MAX_SEGMENT_LEN: usize = 100;

/// Derive the archive folder name from a listing title
///
/// Takes the first two whitespace-separated words joined by `_`.
pub fn folder_name_from_title(title: &str) -> String {
    let joined = title.split_whitespace().take(2).collect::<Vec<_>>().join("_");
    let name = sanitize_path_segment(&joined);

    if name.is_empty() {
        FALLBACK_FOLDER_NAME.to_string()
    } else {
        name
    }
}

/// Convert a string to a single safe path segment
pub fn sanitize_path_segment(raw: &str) -> String {
    let name = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    // No hidden files, no "." or ".."
    let name = name.trim_start_matches('.');

    // Limit length
    name.chars().take(MAX_SEGMENT_LEN).collect()
}
