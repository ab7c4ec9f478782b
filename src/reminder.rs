use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type UserId = String;

/// Backend-assigned reminder identifier. Numbers and strings are both accepted and sent
/// back in the shape they arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReminderId {
    Number(i64),
    Text(String),
}

impl From<i64> for ReminderId {
    fn from(value: i64) -> Self {
        ReminderId::Number(value)
    }
}

/// Integral input becomes a numeric id, anything else a textual one.
impl From<&str> for ReminderId {
    fn from(value: &str) -> Self {
        match value.parse::<i64>() {
            Ok(number) => ReminderId::Number(number),
            Err(_) => ReminderId::Text(value.to_string()),
        }
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderId::Number(value) => write!(f, "{}", value),
            ReminderId::Text(value) => f.write_str(value),
        }
    }
}

/// How often a reminder fires. Values the client does not know about are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReminderFrequency {
    #[default]
    Daily,
    Weekly,
    Other(String),
}

impl ReminderFrequency {
    pub fn as_str(&self) -> &str {
        match self {
            ReminderFrequency::Daily => "daily",
            ReminderFrequency::Weekly => "weekly",
            ReminderFrequency::Other(value) => value,
        }
    }
}

impl From<String> for ReminderFrequency {
    fn from(value: String) -> Self {
        match value.as_str() {
            "daily" => ReminderFrequency::Daily,
            "weekly" => ReminderFrequency::Weekly,
            _ => ReminderFrequency::Other(value),
        }
    }
}

impl From<&str> for ReminderFrequency {
    fn from(value: &str) -> Self {
        ReminderFrequency::from(value.to_string())
    }
}

impl From<ReminderFrequency> for String {
    fn from(value: ReminderFrequency) -> Self {
        match value {
            ReminderFrequency::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ReminderFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UV index above which the backend should alert. Either a number or free text,
/// where the empty string means "no threshold".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UvIndexThreshold {
    Number(f64),
    Text(String),
}

impl UvIndexThreshold {
    pub fn empty() -> Self {
        UvIndexThreshold::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, UvIndexThreshold::Text(text) if text.is_empty())
    }
}

impl Default for UvIndexThreshold {
    fn default() -> Self {
        UvIndexThreshold::empty()
    }
}

impl From<f64> for UvIndexThreshold {
    fn from(value: f64) -> Self {
        UvIndexThreshold::Number(value)
    }
}

impl From<&str> for UvIndexThreshold {
    fn from(value: &str) -> Self {
        UvIndexThreshold::Text(value.to_string())
    }
}

impl fmt::Display for UvIndexThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UvIndexThreshold::Number(value) => write!(f, "{}", value),
            UvIndexThreshold::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(rename = "ssreminder_id")]
    pub id: ReminderId,
    #[serde(
        rename = "ssreminder_freq",
        default,
        deserialize_with = "null_as_default"
    )]
    pub frequency: ReminderFrequency,
    #[serde(
        rename = "ssreminder_time",
        default,
        deserialize_with = "null_as_default"
    )]
    pub times: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uv_index_threshold: UvIndexThreshold,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub temp_alert: bool,
    /// Fields the backend sends that this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reminder {
    /// Overwrites exactly the fields present in `patch`.
    pub fn apply_patch(&mut self, patch: &ReminderPatch) {
        if let Some(frequency) = &patch.frequency {
            self.frequency = frequency.clone();
        }
        if let Some(times) = &patch.times {
            self.times = times.clone();
        }
        if let Some(threshold) = &patch.uv_index_threshold {
            self.uv_index_threshold = threshold.clone();
        }
        if let Some(temp_alert) = patch.temp_alert {
            self.temp_alert = temp_alert;
        }
    }
}

/// Partial reminder body sent on update. Absent fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderPatch {
    #[serde(rename = "ssreminder_freq", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<ReminderFrequency>,
    #[serde(rename = "ssreminder_time", skip_serializing_if = "Option::is_none")]
    pub times: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_index_threshold: Option<UvIndexThreshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_alert: Option<bool>,
}

impl ReminderPatch {
    pub fn is_empty(&self) -> bool {
        self.frequency.is_none()
            && self.times.is_none()
            && self.uv_index_threshold.is_none()
            && self.temp_alert.is_none()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `true`/`false`, `0`/`1` style integers and `null` (read as `false`).
fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<BoolOrInt>::deserialize(deserializer)? {
        Some(BoolOrInt::Bool(value)) => value,
        Some(BoolOrInt::Int(value)) => value != 0,
        None => false,
    })
}
