use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use ratatui_image::{Resize, StatefulImage};
// Use Popup from tui-widgets to render the loading notice
use tui_widgets::popup::Popup;

use crate::config::RgbColor;

use super::app::{App, Focus, LoadState, Portrait};
use super::gallery::Card;
use super::modal::{ModalState, CONTACT_ROWS};

const GALLERY_HELP: &str = "h/l: move  j/k: row  Enter: open  /: search  ?: help  q: quit";
const SEARCH_HELP_INPUT: &str = "Type to filter  Enter: apply  Esc: back to cards";
const MODAL_HELP: &str = "h/l: prev/next  Esc/q: close";
const HELP_MODAL_FOOTER: &str = "Esc/q: close";
const HELP_RULE_WIDTH: usize = 24;

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_search(frame, layout[1], app);
    draw_gallery(frame, layout[2], app);
    draw_footer(frame, layout[3], app);
    draw_notice(frame, layout[2], app);
    draw_detail_modal(frame, size, app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let state = match &app.load_state {
        LoadState::Pending => "Fetching users...".to_string(),
        LoadState::Loaded(count) => format!(
            "{} of {} shown",
            app.session.gallery().visible_count(),
            count
        ),
        LoadState::Failed(_) => "Fetch failed".to_string(),
    };
    let line = Line::from(vec![
        Span::styled(" USERDECK ", selection_style(app).add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(app.source().to_string(), header_text_style(app)),
        Span::raw("  "),
        Span::raw(state),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    app.search_area = area;
    let active = app.focus == Focus::Search;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active))
        .title("Search");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let value = app.search.value();
    let paragraph = if value.is_empty() && !active {
        Paragraph::new(Span::styled("name...", header_text_style(app)))
    } else {
        // Keep the cursor in view for long queries
        let scroll = app
            .search
            .visual_cursor()
            .saturating_sub(inner.width.saturating_sub(1) as usize);
        Paragraph::new(value.to_string()).scroll((0, scroll as u16))
    };
    frame.render_widget(paragraph, inner);

    if active {
        let visual = app.search.visual_cursor() as u16;
        let x = inner.x + visual.min(inner.width.saturating_sub(1));
        frame.set_cursor_position((x, inner.y));
    }
}

fn draw_gallery(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    app.card_areas.clear();

    if area.width == 0 || area.height == 0 {
        return;
    }

    let cards: Vec<Card> = app.session.gallery().visible().cloned().collect();
    if cards.is_empty() {
        if matches!(app.load_state, LoadState::Loaded(_)) {
            render_placeholder(frame, area, "NO MATCHES");
        }
        return;
    }

    let gallery = &app.config().ui.gallery;
    let columns = gallery.columns.max(1);
    let card_height = gallery.card_height;
    let rows_fit = usize::from((area.height / card_height).max(1));

    let cursor_position = app
        .cursor
        .and_then(|handle| cards.iter().position(|card| card.handle == handle));
    if let Some(position) = cursor_position {
        let cursor_row = position / usize::from(columns);
        app.gallery_scroll = scroll_to_row(app.gallery_scroll, cursor_row, rows_fit);
    }

    for (index, rect) in grid_layout(area, cards.len(), columns, card_height, app.gallery_scroll) {
        let card = &cards[index];
        let selected = Some(index) == cursor_position;
        draw_card(frame, rect, app, card, selected);
        app.card_areas.push((rect, card.handle));
    }
}

fn draw_card(frame: &mut Frame<'_>, area: Rect, app: &mut App, card: &Card, selected: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if selected {
            selection_style(app)
        } else {
            border_style(app, false)
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let portrait_width = portrait_width(inner);
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(portrait_width), Constraint::Min(0)])
        .split(inner);

    draw_portrait(frame, layout[0], app, &card.image_url);

    let name_style = if selected {
        selection_style(app).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let lines = vec![
        Line::from(Span::styled(card.name.clone(), name_style)),
        Line::from(Span::styled(card.email.clone(), header_text_style(app))),
        Line::from(card.location.clone()),
    ];
    let text_area = pad_left(layout[1], 1);
    frame.render_widget(Paragraph::new(lines), text_area);
}

fn draw_portrait(frame: &mut Frame<'_>, area: Rect, app: &mut App, url: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    match app.portrait_mut(url) {
        Some(Portrait::Ready(state)) => {
            let widget = StatefulImage::new(None).resize(Resize::Fit);
            frame.render_stateful_widget(widget, area, state);
        }
        Some(Portrait::Pending) => render_placeholder(frame, area, "LOADING"),
        Some(Portrait::Missing) | None => render_placeholder(frame, area, "NO IMAGE"),
    }
}

/// Notice over the empty gallery while users are loading or after the fetch
/// failed.
fn draw_notice(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if !app.session.gallery().is_empty() || app.session.modal().is_visible() {
        return;
    }

    let (title, body) = match &app.load_state {
        LoadState::Pending => ("Loading", vec![Line::from("Fetching users...")]),
        LoadState::Failed(message) => (
            "Fetch failed",
            vec![
                Line::from(message.clone()),
                Line::from(""),
                Line::from("q: quit"),
            ],
        ),
        LoadState::Loaded(_) => ("Empty", vec![Line::from("No users returned")]),
    };

    let title_line = Line::from(Span::styled(format!(" {title} "), header_text_style(app)));
    let popup = Popup::new(Text::from(body))
        .title(title_line)
        .border_style(border_style(app, true));

    frame.render_stateful_widget_ref(popup, area, &mut app.notice_popup);
}

fn draw_detail_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let ModalState::Visible(index) = app.session.modal().state() else {
        return;
    };
    let Some(detail) = app.session.modal().detail().cloned() else {
        return;
    };
    let total = app.session.store().len();

    let width = area.width.saturating_mul(2).saturating_div(3).max(50);
    let modal_area = centered(area, width, 16);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let title = Line::from(Span::styled(
        format!(" {} ", detail.heading),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    let footer = Line::from(Span::styled(
        format!(" {} of {}  {} ", index + 1, total, MODAL_HELP),
        header_style,
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, true))
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(portrait_width(inner)), Constraint::Min(0)])
        .split(inner);

    draw_portrait(frame, layout[0], app, &detail.image_url);

    let text_area = pad_left(layout[1], 2);
    let label_width = detail
        .rows()
        .iter()
        .map(|(label, _)| label.len() + 1)
        .max()
        .unwrap_or(0);

    let mut lines: Vec<Line> = Vec::new();
    for (row, (label, value)) in detail.rows().iter().enumerate() {
        if row == CONTACT_ROWS {
            lines.push(Line::from(Span::styled(
                LINE.horizontal.repeat(text_area.width as usize),
                separator_style(app),
            )));
        }
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<width$} ", format!("{label}:"), width = label_width),
                header_style,
            ),
            Span::raw(value.to_string()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines), text_area);
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if !app.show_help {
        return;
    }

    let header_style = header_text_style(app);
    let sections = app.help_entries();
    let action_width = sections
        .iter()
        .flat_map(|section| section.entries.iter())
        .map(|entry| entry.action.len())
        .max()
        .unwrap_or(0)
        + 3;

    let mut lines: Vec<Line> = vec![
        Line::from(vec![
            Span::styled("Settings: ", header_style),
            Span::raw(app.config().origin()),
        ]),
        Line::from(""),
    ];
    for section in &sections {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", section.title), header_style.add_modifier(Modifier::BOLD)),
            Span::styled(LINE.horizontal.repeat(HELP_RULE_WIDTH), separator_style(app)),
        ]));
        for entry in &section.entries {
            lines.push(Line::from(vec![
                Span::raw(format!("  {:<width$}", entry.action, width = action_width)),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }
    }

    let content_width = lines.iter().map(Line::width).max().unwrap_or(0);
    let modal_area = centered(area, content_width as u16 + 4, lines.len() as u16 + 2);
    frame.render_widget(Clear, modal_area);

    let footer = Line::from(Span::styled(format!(" {} ", HELP_MODAL_FOOTER), header_style));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, true))
        .title(Span::styled(" HELP ", header_style))
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = pad_left(block.inner(modal_area), 1);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message: String = if app.show_help {
        HELP_MODAL_FOOTER.to_string()
    } else if app.session.modal().is_visible() {
        app.status.clone().unwrap_or_else(|| MODAL_HELP.to_string())
    } else if app.focus == Focus::Search {
        SEARCH_HELP_INPUT.to_string()
    } else {
        match &app.status {
            Some(status) => format!("{status}  |  {GALLERY_HELP}"),
            None => GALLERY_HELP.to_string(),
        }
    };

    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));
    frame.render_widget(Paragraph::new(Line::from(message)).style(style), area);
}

/// Lay out `count` cards in rows of `columns`, starting at grid row
/// `scroll_row`. Returns (card position, cell) for every card that fits.
pub fn grid_layout(
    area: Rect,
    count: usize,
    columns: u16,
    card_height: u16,
    scroll_row: usize,
) -> Vec<(usize, Rect)> {
    let columns = columns.max(1);
    let card_width = area.width / columns;
    if count == 0 || card_width == 0 || card_height == 0 {
        return Vec::new();
    }

    let rows_fit = area.height / card_height;
    let mut cells = Vec::new();
    for row in 0..rows_fit {
        for col in 0..columns {
            let index = (scroll_row + usize::from(row)) * usize::from(columns) + usize::from(col);
            if index >= count {
                return cells;
            }
            // Last column absorbs the rounding remainder
            let width = if col + 1 == columns {
                area.width - card_width * (columns - 1)
            } else {
                card_width
            };
            cells.push((
                index,
                Rect::new(
                    area.x + col * card_width,
                    area.y + row * card_height,
                    width,
                    card_height,
                ),
            ));
        }
    }
    cells
}

/// Smallest change to `scroll` that keeps `row` inside a window of `rows_fit`
/// rows.
pub fn scroll_to_row(scroll: usize, row: usize, rows_fit: usize) -> usize {
    let rows_fit = rows_fit.max(1);
    if row < scroll {
        row
    } else if row >= scroll + rows_fit {
        row + 1 - rows_fit
    } else {
        scroll
    }
}

/// Portrait column width: roughly square cells, never more than a third of
/// the area.
fn portrait_width(area: Rect) -> u16 {
    area.height.saturating_mul(2).min(area.width / 3)
}

fn pad_left(area: Rect, padding: u16) -> Rect {
    let padding = padding.min(area.width);
    Rect {
        x: area.x + padding,
        width: area.width - padding,
        ..area
    }
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App, active: bool) -> Style {
    let colors = app.ui_colors();
    if active {
        Style::default().fg(color(colors.selection_bg))
    } else {
        Style::default().fg(color(colors.border))
    }
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// One short message, wrapped to `area` and centred both ways.
fn render_placeholder(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 || text.is_empty() {
        return;
    }

    let rows = text.len().div_ceil(usize::from(area.width)).min(usize::from(area.height));
    let target = centered(area, area.width, rows as u16);
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, target);
}

/// A `width` x `height` rectangle in the middle of `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_fills_rows_left_to_right() {
        let cells = grid_layout(Rect::new(0, 4, 30, 16), 5, 3, 8, 0);
        let rects: Vec<Rect> = cells.iter().map(|(_, rect)| *rect).collect();
        assert_eq!(cells.len(), 5);
        assert_eq!(rects[0], Rect::new(0, 4, 10, 8));
        assert_eq!(rects[2], Rect::new(20, 4, 10, 8));
        assert_eq!(rects[3], Rect::new(0, 12, 10, 8));
        assert_eq!(cells[4].0, 4);
    }

    #[test]
    fn grid_stops_at_the_bottom_and_honours_scroll() {
        let cells = grid_layout(Rect::new(0, 0, 20, 10), 12, 2, 5, 1);
        let indices: Vec<usize> = cells.iter().map(|(index, _)| *index).collect();
        assert_eq!(indices, vec![2, 3, 4, 5]);
        assert_eq!(cells[0].1.y, 0);
    }

    #[test]
    fn last_column_takes_the_remainder() {
        let cells = grid_layout(Rect::new(0, 0, 31, 8), 3, 3, 8, 0);
        assert_eq!(cells[2].1, Rect::new(20, 0, 11, 8));
    }

    #[test]
    fn grid_of_nothing_is_empty() {
        assert!(grid_layout(Rect::new(0, 0, 30, 30), 0, 3, 8, 0).is_empty());
        assert!(grid_layout(Rect::new(0, 0, 2, 30), 4, 3, 8, 0).is_empty());
        assert!(grid_layout(Rect::new(0, 0, 30, 4), 4, 3, 8, 0).is_empty());
    }

    #[test]
    fn centered_rect_sits_in_the_middle_and_fits() {
        let area = Rect::new(2, 1, 40, 20);
        assert_eq!(centered(area, 10, 4), Rect::new(17, 9, 10, 4));
        assert_eq!(centered(area, 100, 50), area);
        assert_eq!(centered(area, 0, 0), Rect::new(22, 11, 0, 0));
    }

    #[test]
    fn scroll_follows_the_cursor_row() {
        assert_eq!(scroll_to_row(0, 1, 2), 0);
        assert_eq!(scroll_to_row(0, 2, 2), 1);
        assert_eq!(scroll_to_row(3, 1, 2), 1);
        assert_eq!(scroll_to_row(0, 5, 0), 5);
    }
}
