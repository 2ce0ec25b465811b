use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Sparkline},
    Frame,
};

use rivercache_core::models::{ReadingStatus, Resource, StationReadings};
use rivercache_core::utils::{format_reading, truncate_string};

use super::{entry_notice, panel_title};
use crate::app::{App, Panel};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_station_list(frame, app, chunks[0]);
    render_readings(frame, app, chunks[1]);
}

fn render_station_list(frame: &mut Frame, app: &App, area: Rect) {
    let entry = app.dashboard.stations();
    let stations = app.dashboard.visible_stations();
    let name_width = (area.width as usize).saturating_sub(6);

    let mut items: Vec<ListItem> = Vec::new();
    if let Some(notice) = entry_notice(&entry) {
        items.push(ListItem::new(notice));
    }
    let offset = items.len();

    items.extend(stations.iter().enumerate().map(|(i, station)| {
        let readings = app.dashboard.readings(&station.id);
        let marker = match readings.data.as_ref().and_then(Resource::as_readings) {
            Some(r) => status_marker(r.status.flow),
            None => "·",
        };
        let style = if i == app.station_selection {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        ListItem::new(Line::from(format!(
            " {} {}",
            marker,
            truncate_string(&station.name, name_width)
        )))
        .style(style)
    }));

    if stations.is_empty() && entry.data.is_some() {
        items.push(ListItem::new(Line::from(Span::styled(
            " No stations on this river",
            styles::muted_style(),
        ))));
    }

    let focused = app.focus == Panel::Stations;
    let block = Block::default()
        .title(panel_title(
            &format!("Stations ({})", stations.len()),
            &entry,
            app.dashboard.is_stale_snapshot(&entry.key),
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    if !stations.is_empty() {
        state.select(Some(app.station_selection + offset));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn status_marker(status: ReadingStatus) -> &'static str {
    match status {
        ReadingStatus::High => "▲",
        ReadingStatus::Low => "▼",
        ReadingStatus::Normal => "●",
        ReadingStatus::Unknown => "·",
    }
}

fn render_readings(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Panel::Stations;
    let Some(station) = app.selected_station() else {
        let block = Block::default()
            .title(" Readings ")
            .title_style(styles::title_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(focused));
        let paragraph = Paragraph::new(Line::from(Span::styled(
            "Select a station from the list",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let entry = app.dashboard.readings(&station.id);
    let block = Block::default()
        .title(panel_title(
            &station.name,
            &entry,
            app.dashboard.is_stale_snapshot(&entry.key),
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(5)])
        .split(inner);

    let mut lines = Vec::new();
    if let Some(notice) = entry_notice(&entry) {
        lines.push(notice);
        lines.push(Line::from(""));
    }

    let readings = entry.data.as_ref().and_then(Resource::as_readings);
    if let Some(readings) = readings {
        lines.extend(reading_lines(readings));
    }
    lines.push(Line::from(Span::styled(
        format!("River: {}  ({:.4}, {:.4})", station.river, station.lat, station.lng),
        styles::muted_style(),
    )));
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    if let Some(readings) = readings {
        // Sparkline wants integers; flows are whole cfs.
        let series: Vec<u64> = readings
            .flow_series()
            .iter()
            .map(|flow| flow.max(0.0).round() as u64)
            .collect();
        if !series.is_empty() {
            let sparkline = Sparkline::default()
                .block(
                    Block::default()
                        .title(" Flow, last 7 days ")
                        .title_style(styles::muted_style()),
                )
                .data(&series)
                .style(styles::highlight_style());
            frame.render_widget(sparkline, chunks[1]);
        }
    }
}

fn reading_lines(readings: &StationReadings) -> Vec<Line<'static>> {
    let current = &readings.current;
    let status = &readings.status;
    let row = |label: &'static str, value: String, status: ReadingStatus| {
        Line::from(vec![
            Span::styled(format!("{:<14}", label), styles::highlight_style()),
            Span::raw(format!("{:<12}", value)),
            Span::styled(status.label(), styles::reading_style(status)),
        ])
    };

    let mut lines = vec![
        row("Flow", format_reading(current.flow, "cfs"), status.flow),
        row("Gauge height", format_reading(current.height, "ft"), status.height),
        row(
            "Water temp",
            format_reading(current.temperature, "°F"),
            status.temperature,
        ),
    ];
    if let Some(updated) = current.updated {
        lines.push(Line::from(Span::styled(
            format!("Gauge reported {}", updated.format("%b %-d %H:%M UTC")),
            styles::muted_style(),
        )));
    }
    lines.push(Line::from(""));
    lines
}
