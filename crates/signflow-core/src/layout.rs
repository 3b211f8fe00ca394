//! Greedy line layout for replacement text

use crate::font::BaseFont;

/// Distance between successive baselines as a multiple of the font size.
pub const LEADING_FACTOR: f32 = 1.2;

/// Baseline-to-baseline distance for `font_size`.
pub fn leading(font_size: f32) -> f32 {
    font_size * LEADING_FACTOR
}

/// Break `text` into lines no wider than `max_width` points.
///
/// Explicit newlines always end the current line, even an empty one. Other
/// whitespace only separates words, which are re-joined with single spaces.
/// A word wider than `max_width` gets a line of its own and is never split.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32, font: &BaseFont) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    let mut current = String::new();

    for (i, segment) in normalized.split('\n').enumerate() {
        if i > 0 {
            lines.push(std::mem::take(&mut current));
        }

        for word in segment.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }

            let candidate_width = font.string_width(&current, font_size)
                + font.string_width(" ", font_size)
                + font.string_width(word, font_size);

            if candidate_width > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current.push(' ');
                current.push_str(word);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
