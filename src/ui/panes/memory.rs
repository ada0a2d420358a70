//! Memory pane rendering
//!
//! Lists every set cell of the address space in ascending address order.
//! The `sp` row is always shown, even when the cell is unset, and the rows
//! under `sp` and `fp` are highlighted.

use super::utils::{clamp_scroll, inner_height, pane_block};
use crate::memory::{Address, Cell};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Scroll state for the memory pane
pub struct MemoryScrollState {
    pub offset: usize,
    /// Keep the `sp` row in view while stepping
    pub follow_sp: bool,
}

impl Default for MemoryScrollState {
    fn default() -> Self {
        MemoryScrollState {
            offset: 0,
            follow_sp: true,
        }
    }
}

/// Data needed to render the memory pane
pub struct MemoryRenderData<'a> {
    pub cells: &'a [Cell],
    pub sp: Address,
    pub fp: Address,
}

/// Addresses to show: set cells plus the `sp` slot
fn visible_rows(data: &MemoryRenderData) -> Vec<(Address, Cell)> {
    let mut rows: Vec<(Address, Cell)> = data
        .cells
        .iter()
        .enumerate()
        .filter(|(address, cell)| cell.is_some() || *address == data.sp)
        .map(|(address, cell)| (address, *cell))
        .collect();
    if rows.is_empty() {
        rows.push((data.sp, None));
    }
    rows
}

/// Render the memory pane
pub fn render_memory_pane(
    frame: &mut Frame,
    area: Rect,
    data: MemoryRenderData,
    is_focused: bool,
    scroll_state: &mut MemoryScrollState,
) {
    let block = pane_block(" Memory ", is_focused);
    let rows = visible_rows(&data);
    let visible_height = inner_height(area.height);

    if scroll_state.follow_sp {
        if let Some(sp_row) = rows.iter().position(|(address, _)| *address == data.sp) {
            // Keep sp a third of the way down so the frame above it shows
            scroll_state.offset = sp_row.saturating_sub(visible_height / 3);
        }
    }
    clamp_scroll(&mut scroll_state.offset, rows.len(), visible_height);

    let items: Vec<ListItem> = rows
        .iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|&(address, cell)| memory_row(address, cell, &data))
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn memory_row<'a>(address: Address, cell: Cell, data: &MemoryRenderData) -> ListItem<'a> {
    let highlight = if address == data.sp {
        Some((DEFAULT_THEME.sp_row, " ◂ sp"))
    } else if address == data.fp {
        Some((DEFAULT_THEME.fp_row, " ◂ fp"))
    } else {
        None
    };

    let value = match cell {
        Some(value) => format!("{:>11}", value),
        None => format!("{:>11}", "·"),
    };

    let line = match highlight {
        Some((color, marker)) => Line::from(vec![
            Span::styled(
                format!("{:>6} ", address),
                Style::default()
                    .bg(color)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(value, Style::default().fg(DEFAULT_THEME.number)),
            Span::styled(marker, Style::default().fg(color)),
        ]),
        None => Line::from(vec![
            Span::styled(
                format!("{:>6} ", address),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(value, Style::default().fg(DEFAULT_THEME.fg)),
        ]),
    };
    ListItem::new(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_include_unset_sp() {
        let cells = vec![Some(1), None, None, Some(4), None];
        let data = MemoryRenderData {
            cells: &cells,
            sp: 2,
            fp: 3,
        };
        let rows = visible_rows(&data);
        assert_eq!(rows, vec![(0, Some(1)), (2, None), (3, Some(4))]);
    }
}
