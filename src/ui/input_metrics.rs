use unicode_width::UnicodeWidthChar;

/// Display columns of one char; control chars render as nothing.
pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Largest char-boundary index at or below `idx`.
pub fn clamp_to_char_boundary_left(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Wrap input text into display rows of at most `width` columns, breaking on
/// explicit newlines first and then on width.
pub fn wrap_input_lines(input: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in input.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;
        for ch in line.chars() {
            let ch_width = char_display_width(ch);
            if current_width + ch_width > width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }
        rows.push(current);
    }

    if rows.is_empty() {
        rows.push(String::new());
    }
    rows
}

/// Visual (row, column) of the cursor at byte index `cursor_byte`, under the
/// same wrapping rules as `wrap_input_lines`.
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);

    let mut row = 0;
    let mut col = 0;
    for (idx, ch) in input.char_indices() {
        if idx >= cursor_byte {
            break;
        }
        if ch == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let ch_width = char_display_width(ch);
        if col + ch_width > width {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }
    (row, col)
}

/// Truncate to at most `width` display columns.
pub fn truncate_to_display_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width_and_newlines() {
        let rows = wrap_input_lines("abcd\nef", 2);
        assert_eq!(rows, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn test_wrap_empty_input_is_one_row() {
        assert_eq!(wrap_input_lines("", 10), vec![String::new()]);
    }

    #[test]
    fn test_cursor_position_tracks_wrapping() {
        assert_eq!(cursor_row_col("abcd", 3, 2), (1, 1));
        assert_eq!(cursor_row_col("ab\ncd", 3, 10), (1, 0));
        assert_eq!(cursor_row_col("", 0, 10), (0, 0));
    }

    #[test]
    fn test_clamp_lands_on_char_boundary() {
        let text = "héllo";
        // Byte 2 is inside the two-byte é.
        assert_eq!(clamp_to_char_boundary_left(text, 2), 1);
        assert_eq!(clamp_to_char_boundary_left(text, 99), text.len());
    }

    #[test]
    fn test_truncate_counts_wide_chars() {
        // CJK chars are two columns each.
        assert_eq!(truncate_to_display_width("你好吗", 4), "你好");
        assert_eq!(truncate_to_display_width("abc", 99), "abc");
    }
}
