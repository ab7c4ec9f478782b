use std::fmt;

use crate::draft::ReminderDraft;
use crate::reminder::{
    Reminder, ReminderFrequency, ReminderId, ReminderPatch, UserId, UvIndexThreshold,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReminderOperation {
    List,
    Create,
    Update,
    Delete,
}

impl ReminderOperation {
    pub fn failure_message(&self) -> &'static str {
        match self {
            ReminderOperation::List => "Failed to fetch reminders",
            ReminderOperation::Create => "Failed to add reminder",
            ReminderOperation::Update => "Failed to update reminder",
            ReminderOperation::Delete => "Failed to delete reminder",
        }
    }
}

/// The single error slot shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub operation: ReminderOperation,
    pub message: String,
}

impl OperationError {
    pub fn new(operation: ReminderOperation, error: &anyhow::Error) -> Self {
        Self {
            operation,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReminderSettingsState {
    pub user_id: Option<UserId>,
    pub reminders: Vec<Reminder>,
    /// Number of requests issued and not yet answered.
    pub in_flight: usize,
    pub error: Option<OperationError>,
    pub draft: ReminderDraft,
}

impl ReminderSettingsState {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    fn is_current_user(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Everything that can change [`ReminderSettingsState`]. Completion actions carry
/// the user they were issued for.
#[derive(Debug, Clone, PartialEq)]
pub enum StateAction {
    UserChanged(UserId),
    OperationStarted(ReminderOperation),
    Loaded {
        user_id: UserId,
        reminders: Vec<Reminder>,
    },
    Created {
        user_id: UserId,
        reminder: Reminder,
    },
    Updated {
        user_id: UserId,
        id: ReminderId,
        patch: ReminderPatch,
    },
    Deleted {
        user_id: UserId,
        id: ReminderId,
    },
    Failed {
        user_id: UserId,
        error: OperationError,
    },
    AddDraftTime,
    ChangeDraftTime {
        index: usize,
        time: String,
    },
    RemoveDraftTime(usize),
    SetDraftFrequency(ReminderFrequency),
    SetDraftUvThreshold(UvIndexThreshold),
    SetDraftTempAlert(bool),
}

pub fn reduce(mut state: ReminderSettingsState, action: StateAction) -> ReminderSettingsState {
    match action {
        StateAction::UserChanged(user_id) => {
            log::info!("Switching reminder settings to user. [user_id = {}]", user_id);
            state.user_id = Some(user_id);
            state.reminders.clear();
            state.error = None;
        }
        StateAction::OperationStarted(operation) => {
            log::debug!("Operation started. [operation = {:?}]", operation);
            state.in_flight += 1;
        }
        StateAction::Loaded { user_id, reminders } => {
            finish_operation(&mut state);
            if accept_response(&state, &user_id) {
                state.reminders = reminders;
                state.error = None;
            }
        }
        StateAction::Created { user_id, reminder } => {
            finish_operation(&mut state);
            if accept_response(&state, &user_id) {
                log::info!("Reminder created. [reminder_id = {}]", reminder.id);
                state.reminders.push(reminder);
                state.draft = ReminderDraft::default();
                state.error = None;
            }
        }
        StateAction::Updated { user_id, id, patch } => {
            finish_operation(&mut state);
            if accept_response(&state, &user_id) {
                if let Some(reminder) = state.reminders.iter_mut().find(|r| r.id == id) {
                    reminder.apply_patch(&patch);
                }
                state.error = None;
            }
        }
        StateAction::Deleted { user_id, id } => {
            finish_operation(&mut state);
            if accept_response(&state, &user_id) {
                state.reminders.retain(|r| r.id != id);
                state.error = None;
            }
        }
        StateAction::Failed { user_id, error } => {
            finish_operation(&mut state);
            if accept_response(&state, &user_id) {
                state.error = Some(error);
            }
        }
        StateAction::AddDraftTime => state.draft.add_time(),
        StateAction::ChangeDraftTime { index, time } => {
            if !state.draft.change_time(index, time) {
                log::warn!("No draft time to change. [index = {}]", index);
            }
        }
        StateAction::RemoveDraftTime(index) => {
            if !state.draft.remove_time(index) {
                log::warn!("No draft time to remove. [index = {}]", index);
            }
        }
        StateAction::SetDraftFrequency(frequency) => state.draft.frequency = frequency,
        StateAction::SetDraftUvThreshold(threshold) => state.draft.uv_index_threshold = threshold,
        StateAction::SetDraftTempAlert(temp_alert) => state.draft.temp_alert = temp_alert,
    }

    state
}

fn finish_operation(state: &mut ReminderSettingsState) {
    state.in_flight = state.in_flight.saturating_sub(1);
}

fn accept_response(state: &ReminderSettingsState, user_id: &str) -> bool {
    let current = state.is_current_user(user_id);
    if !current {
        log::debug!(
            "Dropping response issued for a previous user. [user_id = {}, current_user_id = {:?}]",
            user_id,
            state.user_id
        );
    }
    current
}
