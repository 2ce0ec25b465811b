/// Human-readable age for a timestamp `minutes` in the past.
/// Rounds to the nearest hour or day once past those thresholds.
pub fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

/// Format an optional gauge value with its unit, or "N/A" when the gauge
/// did not report it.
pub fn format_reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() >= 100.0 => format!("{:.0} {}", v, unit),
        Some(v) => format!("{:.1} {}", v, unit),
        None => "N/A".to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
