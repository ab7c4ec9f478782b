use std::str::FromStr;

use anyhow::{Context, bail};

use crate::reminder::{ReminderFrequency, ReminderId, ReminderPatch, UserId, UvIndexThreshold};

pub const HELP: &str = "These commands are supported:
  show                      print the current state
  reload                    fetch reminders again
  user <id>                 switch to another user
  freq <value>              set the draft frequency
  uv <value>                set the draft UV index threshold (\"\" clears it)
  alert on|off              set the draft temperature alert
  add-time                  append a time to the draft
  time <index> <value>      change a draft time
  remove-time <index>       remove a draft time
  submit                    create a reminder from the draft
  edit <id> key=value...    update a reminder (keys: freq, times, uv, alert)
  delete <id>               delete a reminder
  help                      show this message
  quit                      exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Reload,
    User(UserId),
    Frequency(ReminderFrequency),
    UvThreshold(UvIndexThreshold),
    TempAlert(bool),
    AddTime,
    ChangeTime { index: usize, time: String },
    RemoveTime(usize),
    Submit,
    Edit { id: ReminderId, patch: ReminderPatch },
    Delete(ReminderId),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            bail!("Empty command");
        };
        let args: Vec<&str> = parts.collect();

        let command = match (name, args.as_slice()) {
            ("show", []) => Command::Show,
            ("reload", []) => Command::Reload,
            ("user", [id]) => Command::User(id.to_string()),
            ("freq", [value]) => Command::Frequency(ReminderFrequency::from(*value)),
            ("uv", []) => Command::UvThreshold(UvIndexThreshold::empty()),
            ("uv", [value]) => Command::UvThreshold(parse_threshold(value)),
            ("alert", [value]) => Command::TempAlert(parse_switch(value)?),
            ("add-time", []) => Command::AddTime,
            ("time", [index, time]) => Command::ChangeTime {
                index: parse_index(index)?,
                time: time.to_string(),
            },
            ("remove-time", [index]) => Command::RemoveTime(parse_index(index)?),
            ("submit", []) => Command::Submit,
            ("edit", [id, fields @ ..]) if !fields.is_empty() => Command::Edit {
                id: ReminderId::from(*id),
                patch: parse_patch(fields)?,
            },
            ("delete", [id]) => Command::Delete(ReminderId::from(*id)),
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => bail!("Unknown command \"{}\". Type help to see supported commands.", line.trim()),
        };

        Ok(command)
    }
}

fn parse_index(value: &str) -> anyhow::Result<usize> {
    value
        .parse()
        .with_context(|| format!("Could not parse index \"{}\"", value))
}

fn parse_switch(value: &str) -> anyhow::Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => bail!("Expected on or off, got \"{}\"", value),
    }
}

/// Numbers are sent as JSON numbers, anything else verbatim. `""` means no threshold.
fn parse_threshold(value: &str) -> UvIndexThreshold {
    if value == "\"\"" {
        return UvIndexThreshold::empty();
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => UvIndexThreshold::Number(number),
        _ => UvIndexThreshold::from(value),
    }
}

fn parse_patch(fields: &[&str]) -> anyhow::Result<ReminderPatch> {
    let mut patch = ReminderPatch::default();
    for field in fields {
        let (key, value) = field
            .split_once('=')
            .with_context(|| format!("Expected key=value, got \"{}\"", field))?;
        match key {
            "freq" => patch.frequency = Some(ReminderFrequency::from(value)),
            "times" => {
                patch.times = Some(
                    value
                        .split(',')
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect(),
                )
            }
            "uv" => patch.uv_index_threshold = Some(parse_threshold(value)),
            "alert" => patch.temp_alert = Some(parse_switch(value)?),
            _ => bail!("Unknown reminder field \"{}\"", key),
        }
    }

    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_draft_commands() {
        assert_eq!("add-time".parse::<Command>().unwrap(), Command::AddTime);
        assert_eq!(
            "time 1 12:00".parse::<Command>().unwrap(),
            Command::ChangeTime {
                index: 1,
                time: "12:00".to_string()
            }
        );
        assert_eq!(
            "remove-time 0".parse::<Command>().unwrap(),
            Command::RemoveTime(0)
        );
        assert_eq!(
            "freq weekly".parse::<Command>().unwrap(),
            Command::Frequency(ReminderFrequency::Weekly)
        );
        assert_eq!(
            "alert on".parse::<Command>().unwrap(),
            Command::TempAlert(true)
        );
    }

    #[test]
    fn parses_uv_threshold() {
        assert_eq!(
            "uv 6".parse::<Command>().unwrap(),
            Command::UvThreshold(UvIndexThreshold::Number(6.0))
        );
        assert_eq!(
            "uv high".parse::<Command>().unwrap(),
            Command::UvThreshold(UvIndexThreshold::from("high"))
        );
        assert_eq!(
            "uv".parse::<Command>().unwrap(),
            Command::UvThreshold(UvIndexThreshold::empty())
        );
        assert_eq!(
            "uv \"\"".parse::<Command>().unwrap(),
            Command::UvThreshold(UvIndexThreshold::empty())
        );
    }

    #[test]
    fn parses_edit_into_patch() {
        let command: Command = "edit 3 alert=on times=08:00,12:00".parse().unwrap();

        assert_eq!(
            command,
            Command::Edit {
                id: 3.into(),
                patch: ReminderPatch {
                    times: Some(vec!["08:00".to_string(), "12:00".to_string()]),
                    temp_alert: Some(true),
                    ..Default::default()
                }
            }
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!("".parse::<Command>().is_err());
        assert!("delete".parse::<Command>().is_err());
        assert!("edit 3".parse::<Command>().is_err());
        assert!("edit 3 colour=red".parse::<Command>().is_err());
        assert!("alert maybe".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
