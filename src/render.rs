use std::fmt::Write;

use crate::reminder::{Reminder, UvIndexThreshold};
use crate::state::ReminderSettingsState;

/// Renders the whole component as plain text.
pub fn render(state: &ReminderSettingsState) -> String {
    let mut out = String::new();

    out.push_str("Reminder Settings\n");
    if let Some(user_id) = &state.user_id {
        let _ = writeln!(out, "User: {}", user_id);
    }
    if state.is_loading() {
        out.push_str("Loading reminders...\n");
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "Error: {}", error);
    }

    for reminder in &state.reminders {
        out.push('\n');
        out.push_str(&display_reminder(reminder));
    }

    out.push_str("\nAdd New Reminder\n");
    let draft = &state.draft;
    let _ = writeln!(out, "Frequency: {}", draft.frequency);
    for (i, time) in draft.times.iter().enumerate() {
        let _ = writeln!(out, "Time {}: {}", i, time);
    }
    let _ = writeln!(out, "UV Index Threshold: {}", threshold_or_none(&draft.uv_index_threshold));
    let _ = writeln!(out, "Temperature Alert: {}", yes_no(draft.temp_alert));

    out
}

fn display_reminder(reminder: &Reminder) -> String {
    let mut out = format!(
        "Reminder {}\nFrequency: {}\n",
        reminder.id, reminder.frequency
    );
    for time in &reminder.times {
        let _ = writeln!(out, "Time: {}", time);
    }
    let _ = writeln!(
        out,
        "UV Index Threshold: {}",
        threshold_or_none(&reminder.uv_index_threshold)
    );
    let _ = writeln!(out, "Temperature Alert: {}", yes_no(reminder.temp_alert));

    out
}

/// Both an empty threshold and a zero one read as "None".
fn threshold_or_none(threshold: &UvIndexThreshold) -> String {
    let zero = matches!(threshold, UvIndexThreshold::Number(n) if *n == 0.0);
    if threshold.is_empty() || zero {
        "None".to_string()
    } else {
        threshold.to_string()
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}
