use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use seo_core::{Image, LintStatus, page_position};

use crate::api::ImageSource;
use crate::app::{App, Mode};

pub fn draw<S: ImageSource>(frame: &mut ratatui::Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.size());

    frame.render_widget(render_header(app), chunks[0]);
    match app.mode {
        Mode::Help => frame.render_widget(render_help(), chunks[1]),
        Mode::Edit => render_edit(frame, app, chunks[1]),
        Mode::Browse | Mode::Search => render_list(frame, app, chunks[1]),
    }
    frame.render_widget(render_status(app), chunks[2]);
    frame.render_widget(render_footer(app), chunks[3]);
}

fn render_header<S: ImageSource>(app: &App<S>) -> Paragraph<'_> {
    let search_style = if app.mode == Mode::Search {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let cursor = if app.mode == Mode::Search { "_" } else { "" };
    let line = Line::from(vec![
        Span::raw("Search: "),
        Span::styled(format!("{}{cursor}", app.search_input), search_style),
        Span::raw(format!(
            "   filter: {}   sort: {}",
            app.filter.label(),
            app.sort.label()
        )),
    ]);
    Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Alt Text SEO"))
}

fn status_style(status: LintStatus) -> Style {
    match status {
        LintStatus::Missing => Style::default().fg(Color::Red),
        LintStatus::Short | LintStatus::Long => Style::default().fg(Color::Yellow),
        LintStatus::Ok => Style::default().fg(Color::Green),
    }
}

fn image_line<'a, S: ImageSource>(app: &App<S>, image: &'a Image, selected: bool) -> Line<'a> {
    let lint = app.report.lint(&image.id);
    let created = image
        .created_at
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let score = image
        .score
        .map(|score| format!("{score:.2}"))
        .unwrap_or_else(|| " -- ".to_string());
    let alt = if image.alt().trim().is_empty() {
        "(no alt text)"
    } else {
        image.alt()
    };

    let row_style = if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(if selected { "> " } else { "  " }, row_style),
        Span::styled(format!("{:<10}", lint.label), status_style(lint.status)),
        Span::styled(
            if app.report.is_duplicate(&image.id) { "dup " } else { "    " },
            Style::default().fg(Color::Magenta),
        ),
        Span::raw(format!("{created} {score} ")),
        Span::styled(format!("[{}] ", image.id), row_style),
        Span::styled(alt, row_style),
    ])
}

fn render_list<S: ImageSource>(frame: &mut ratatui::Frame, app: &App<S>, area: Rect) {
    let visible = app.visible();
    let mut text = Text::default();
    if visible.is_empty() {
        let empty = if app.list.loading {
            "Loading..."
        } else if app.list.images.is_empty() {
            "No images found"
        } else {
            "No images match this filter"
        };
        text.lines.push(Line::from(empty));
    } else {
        let rows = area.height.saturating_sub(2) as usize;
        let total = visible.len();
        let mut start = app.selection.saturating_sub(rows / 2);
        if rows > 0 && start + rows > total {
            start = total.saturating_sub(rows);
        }
        let end = (start + rows).min(total);
        for (idx, image) in visible[start..end].iter().enumerate() {
            text.lines
                .push(image_line(app, image, start + idx == app.selection));
        }
    }

    let position = page_position(app.list.offset, app.list.limit, app.list.total);
    let title = format!(
        "Images - page {}/{} ({} total){}",
        position.page,
        position.total_pages.max(1),
        app.list.total,
        if app.list.loading { " - loading" } else { "" }
    );
    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn render_edit<S: ImageSource>(frame: &mut ratatui::Frame, app: &App<S>, area: Rect) {
    let lint = seo_core::classify(Some(&app.edit_input));
    let mut text = Text::default();
    text.lines.push(Line::from(format!("{}_", app.edit_input)));
    text.lines.push(Line::from(""));
    text.lines.push(Line::from(vec![
        Span::raw(format!("{} chars  ", app.edit_input.trim().chars().count())),
        Span::styled(lint.label, status_style(lint.status)),
    ]));
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Edit alt text"))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_help() -> Paragraph<'static> {
    let lines = [
        "/      search (debounced)",
        "n p    next / previous page",
        "+ -    grow / shrink page size",
        "f      cycle lint filter",
        "s      cycle sort",
        "e      edit alt text of selected image",
        "u      undo last edit",
        "c      copy alt text to clipboard",
        "r      refresh",
        "q      quit",
    ];
    let text = Text::from(lines.iter().map(|line| Line::from(*line)).collect::<Vec<_>>());
    Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help"))
}

fn render_status<S: ImageSource>(app: &App<S>) -> Paragraph<'_> {
    let counts = app.report.counts;
    let summary = format!(
        "missing {}  short {}  long {}  ok {}  duplicates {}  similar pairs {}  undo {}",
        counts.missing,
        counts.short,
        counts.long,
        counts.ok,
        app.report.duplicates.len(),
        app.near_duplicates,
        app.undo_depth()
    );
    let message = app.message.clone().unwrap_or(summary);
    Paragraph::new(message)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .wrap(Wrap { trim: true })
}

fn render_footer<S: ImageSource>(app: &App<S>) -> Paragraph<'_> {
    let info = match app.mode {
        Mode::Browse => "Up/Down or j/k move | / search | n/p page | f filter | s sort | e edit | u undo | c copy | r refresh | ? help | q quit",
        Mode::Search => "Type to search | Enter search now | Esc back",
        Mode::Edit => "Enter save | Esc cancel",
        Mode::Help => "Any key back",
    };
    Paragraph::new(info).block(Block::default().borders(Borders::ALL).title("Keys"))
}
