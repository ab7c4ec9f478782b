use serde::Serialize;

use crate::reminder::{ReminderFrequency, UvIndexThreshold};

pub const DEFAULT_REMINDER_TIME: &str = "10:00";

/// A reminder being composed locally. Serializes to the create request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderDraft {
    #[serde(rename = "ssreminder_freq")]
    pub frequency: ReminderFrequency,
    #[serde(rename = "ssreminder_time")]
    pub times: Vec<String>,
    pub uv_index_threshold: UvIndexThreshold,
    pub temp_alert: bool,
}

impl Default for ReminderDraft {
    fn default() -> Self {
        Self {
            frequency: ReminderFrequency::Daily,
            times: vec![DEFAULT_REMINDER_TIME.to_string()],
            uv_index_threshold: UvIndexThreshold::empty(),
            temp_alert: false,
        }
    }
}

impl ReminderDraft {
    pub fn add_time(&mut self) {
        self.times.push(DEFAULT_REMINDER_TIME.to_string());
    }

    /// Returns `false` when `index` is out of range; the draft is left as is.
    pub fn change_time(&mut self, index: usize, time: impl Into<String>) -> bool {
        match self.times.get_mut(index) {
            Some(slot) => {
                *slot = time.into();
                true
            }
            None => false,
        }
    }

    /// Removing the last entry leaves an empty list.
    pub fn remove_time(&mut self, index: usize) -> bool {
        if index < self.times.len() {
            self.times.remove(index);
            true
        } else {
            false
        }
    }
}
