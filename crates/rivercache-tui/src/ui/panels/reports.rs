use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use rivercache_core::models::Resource;

use super::{entry_notice, panel_title};
use crate::app::{App, Panel};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let entry = app.dashboard.fishing_reports();
    let focused = app.focus == Panel::Reports;

    let mut lines = Vec::new();
    if let Some(notice) = entry_notice(&entry) {
        lines.push(notice);
    }

    let reports = entry
        .data
        .as_ref()
        .and_then(Resource::as_fishing_reports)
        .unwrap_or(&[]);

    for (i, report) in reports.iter().enumerate() {
        let selected = focused && i == app.report_selection;
        let title_style = if selected {
            styles::selected_style()
        } else {
            styles::highlight_style()
        };
        lines.push(Line::from(vec![
            Span::styled(report.title(), title_style),
            Span::styled(format!("  {}", report.date), styles::muted_style()),
        ]));
        // Only the selected report is expanded.
        if selected {
            lines.push(Line::from(report.report.clone()));
            if !report.flies.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Flies: ", styles::help_key_style()),
                    Span::raw(report.flies.join(", ")),
                ]));
            }
            lines.push(Line::from(""));
        }
    }

    let block = Block::default()
        .title(panel_title(
            &format!("Fishing Reports ({})", reports.len()),
            &entry,
            app.dashboard.is_stale_snapshot(&entry.key),
        ))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
