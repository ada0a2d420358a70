//! Frames pane rendering
//!
//! Shows the active call frames, innermost first, with the arguments and
//! locals read from the address space at the current replay position.

use super::utils::{clamp_scroll, inner_height, pane_block};
use crate::memory::{Address, Cell};
use crate::program::Program;
use crate::snapshot::FrameView;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Data needed to render the frames pane
pub struct FramesRenderData<'a> {
    pub frames: &'a [FrameView],
    pub program: &'a Program,
    pub cells: &'a [Cell],
}

fn cell_text(cells: &[Cell], address: Address) -> String {
    match cells.get(address).copied().flatten() {
        Some(value) => value.to_string(),
        None => "·".to_string(),
    }
}

/// Render the frames pane
pub fn render_frames_pane(
    frame: &mut Frame,
    area: Rect,
    data: FramesRenderData,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Call Frames ", is_focused);
    let mut all_items = Vec::new();

    if data.frames.is_empty() {
        all_items.push(
            ListItem::new("(no active frames)").style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }

    for (depth, view) in data.frames.iter().enumerate() {
        let function = data.program.functions.get(view.function);
        let name = function
            .map(|f| f.label())
            .unwrap_or_else(|| "?".to_string());
        let name_style = if depth == 0 {
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.muted_function)
        };

        all_items.push(ListItem::new(Line::from(vec![
            Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(
                format!("Frame {} ", depth),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled("│ ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(format!("{}()", name), name_style),
            Span::styled(
                format!("  fp={}", view.fp),
                Style::default().fg(DEFAULT_THEME.fp_row),
            ),
        ])));

        let Some(function) = function else {
            continue;
        };
        for j in 0..function.params {
            let address = view.fp + function.locals + function.params - j;
            all_items.push(slot_item(
                format!("arg {}", j),
                address,
                cell_text(data.cells, address),
            ));
        }
        for k in 1..=function.locals {
            let address = view.fp + k;
            all_items.push(slot_item(
                format!("local {}", k),
                address,
                cell_text(data.cells, address),
            ));
        }
        let saved = match view.saved_fp {
            Some(value) => value.to_string(),
            None => "·".to_string(),
        };
        all_items.push(slot_item("saved fp".to_string(), view.fp, saved));
    }

    let visible_height = inner_height(area.height);
    clamp_scroll(scroll_offset, all_items.len(), visible_height);
    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

fn slot_item<'a>(label: String, address: Address, value: String) -> ListItem<'a> {
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("    {:<9}", label),
            Style::default().fg(DEFAULT_THEME.primary),
        ),
        Span::styled(
            format!("@{:<6} ", address),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
        Span::styled(value, Style::default().fg(DEFAULT_THEME.number)),
    ]))
}
