/// Cuts `value` after `max_chars` characters and marks the cut with `...`.
///
/// Text at or under the limit is returned unchanged. The cut always lands on
/// a character boundary.
pub fn clip_text(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

/// Collapses runs of whitespace into single spaces and clips the result.
pub fn preview_text(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    clip_text(&collapsed, max_chars)
}
