use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use rivercache_core::models::{condition_icon, Resource};

use super::{entry_notice, panel_title};
use crate::app::{App, Panel};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let entry = app.dashboard.weather();
    let coordinates = app.dashboard.coordinates();

    let mut lines = Vec::new();
    if let Some(notice) = entry_notice(&entry) {
        lines.push(notice);
    }

    if let Some(report) = entry.data.as_ref().and_then(Resource::as_weather) {
        let current = &report.current;
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} {:.0}°F ", condition_icon(&current.condition), current.temp),
                styles::title_style(),
            ),
            Span::raw(current.condition.clone()),
        ]));
        lines.push(Line::from(Span::styled(
            format!("Precip {}  Wind {}", current.precipitation, current.wind),
            styles::muted_style(),
        )));
        lines.push(Line::from(""));
        for day in &report.forecast {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<5}", day.day), styles::highlight_style()),
                Span::raw(format!(
                    "{} {:>3.0}°/{:<3.0}° ",
                    condition_icon(&day.condition),
                    day.high,
                    day.low
                )),
                Span::styled(day.precipitation.clone(), styles::muted_style()),
            ]));
        }
    } else if entry.error.is_none() {
        lines.push(Line::from(Span::styled(
            format!("Weather for {:.2}, {:.2}", coordinates.lat, coordinates.lng),
            styles::muted_style(),
        )));
    }

    let block = Block::default()
        .title(panel_title(
            "Weather",
            &entry,
            app.dashboard.is_stale_snapshot(&entry.key),
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.focus == Panel::Weather));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
