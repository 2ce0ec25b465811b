use chrono::Utc;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use rivercache_core::models::{active_alerts, Resource};

use super::{entry_notice, panel_title};
use crate::app::{App, Panel};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let entry = app.dashboard.alerts();
    let now = Utc::now();

    let mut lines = Vec::new();
    if let Some(notice) = entry_notice(&entry) {
        lines.push(notice);
    }

    let alerts = entry.data.as_ref().and_then(Resource::as_alerts).unwrap_or(&[]);
    let active = active_alerts(alerts, now);
    for alert in &active {
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", alert.severity.label()),
                styles::severity_style(alert.severity),
            ),
            Span::styled(alert.river.clone(), styles::highlight_style()),
            Span::styled(
                format!("  until {}", alert.expires.format("%b %-d %H:%M")),
                styles::muted_style(),
            ),
        ]));
        lines.push(Line::from(format!("  {}", alert.message)));
    }
    if active.is_empty() && entry.data.is_some() {
        lines.push(Line::from(Span::styled(
            "No active alerts",
            styles::success_style(),
        )));
    }

    let block = Block::default()
        .title(panel_title(
            &format!("Alerts ({})", active.len()),
            &entry,
            app.dashboard.is_stale_snapshot(&entry.key),
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.focus == Panel::Alerts));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
