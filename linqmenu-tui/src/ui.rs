use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};
use serde_json::Value;

use linqmenu_core::{model::MenuDay, pictures::is_entree};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    // Title / header: the sensor value itself
    let header = Paragraph::new(app.sensor.native_value())
        .block(Block::default().borders(Borders::ALL).title(app.title.as_str()));
    frame.render_widget(header, *header_area);

    match app.screen {
        Screen::Days => draw_days(frame, app, *content_area),
        Screen::DayDetail => draw_day_detail(frame, app, *content_area),
        Screen::Attributes => draw_attributes(frame, app, *content_area),
    }

    let nav_hint = match app.screen {
        Screen::Days => "↑/↓ move · Enter open day · a/Tab attributes · q/Ctrl-C quit",
        Screen::DayDetail => "↑/↓ other day · Esc/←/b back · q/Ctrl-C quit",
        Screen::Attributes => "↑/↓/PgUp/PgDn scroll · Esc/Tab back · q/Ctrl-C quit",
    };

    let status_text = if app.is_loading {
        format!("Loading… · {nav_hint}")
    } else if let Some(err) = app.sensor.last_error() {
        format!("Unavailable ({err}) · showing last good data · {nav_hint}")
    } else {
        let updated = app
            .sensor
            .snapshot()
            .map_or_else(String::new, |snapshot| {
                format!("updated {} · ", snapshot.last_updated.format("%H:%M"))
            });
        format!("{updated}{nav_hint}")
    };

    let status_style = if !app.sensor.available() {
        Style::default().fg(Color::Red)
    } else if app.is_loading {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_days(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let days = app.days();

    let items = if days.is_empty() {
        vec![ListItem::new(if app.is_loading {
            "Fetching menu…"
        } else {
            "No menu days in the current window."
        })]
    } else {
        days.iter()
            .enumerate()
            .map(|(idx, day)| {
                let prefix = if idx == app.day_index { "> " } else { "  " };
                ListItem::new(format!(
                    "{prefix}{} · {} · {} items in {} categories",
                    day.date, day.session, day.item_count, day.category_count
                ))
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Menu days (↑/↓, Enter)"),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !days.is_empty() {
        state.select(Some(app.day_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_day_detail(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let Some(day) = app.selected_day() else {
        let paragraph = Paragraph::new("No menu for this day.")
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    };

    let title = format!("{} · {} · {} (Esc/←/b to go back)", day.date, day.session, day.plan);
    let rows = day_rows(day).into_iter().map(|(category, name, picture)| {
        let style = if is_entree(&category) {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(vec![Cell::from(category), Cell::from(name), Cell::from(picture)]).style(style)
    });

    let column_widths = [
        Constraint::Length(20),
        Constraint::Min(20),
        Constraint::Length(40),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Category", "Item", "Picture"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn day_rows(day: &MenuDay) -> Vec<(String, String, String)> {
    day.categories
        .iter()
        .flat_map(|(category, items)| {
            items.iter().map(move |item| {
                (
                    category.clone(),
                    item.name.clone(),
                    item.picture_url.clone().unwrap_or_default(),
                )
            })
        })
        .collect()
}

fn draw_attributes(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let lines: Vec<String> = app
        .sensor
        .attributes()
        .iter()
        .map(|(key, value)| format!("{key}: {}", attribute_text(value)))
        .collect();

    let offset = app.attribute_offset.min(lines.len().saturating_sub(1));
    let items: Vec<ListItem<'_>> = lines
        .into_iter()
        .skip(offset)
        .map(ListItem::new)
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Attributes of {}", app.sensor.unique_id())),
    );
    frame.render_widget(list, area);
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
