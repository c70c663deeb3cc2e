use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct Panes {
    pub history: Rect,
    pub status: Rect,
    pub input: Rect,
}

/// History over a one-line status bar over the input editor. The input pane
/// grows with its wrapped content up to a third of the screen.
pub fn split_chat_layout(area: Rect, input_rows: u16) -> Panes {
    let max_input_height = (area.height / 3).max(1);
    let input_height = input_rows.clamp(1, max_input_height);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_height),
        ])
        .split(area);

    Panes {
        history: chunks[0],
        status: chunks[1],
        input: chunks[2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_keeps_one_status_row() {
        let panes = split_chat_layout(Rect::new(0, 0, 80, 24), 1);
        assert_eq!(panes.status.height, 1);
        assert_eq!(panes.input.height, 1);
        assert_eq!(panes.history.height, 22);
    }

    #[test]
    fn test_input_height_is_capped() {
        let panes = split_chat_layout(Rect::new(0, 0, 80, 24), 40);
        assert!(panes.input.height <= 8);
    }
}
