use sunscreen_reminders::{
    api,
    appsettings::AppSettings,
    command::{Command, HELP},
    reminder_settings::{self, ReminderSettingsHandle},
    render::render,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = AppSettings::load()?;
    log::info!(
        "Starting sunscreen reminder settings. [user_id = {:?}]",
        settings.user.id
    );

    let api = api::from_settings(&settings.backend)?;
    let handle = reminder_settings::start(api, settings.user.id);

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            println!("{}", render(&state));
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => dispatch(&handle, command)?,
            Err(e) => println!("{}", e),
        }
    }

    handle.shutdown().await;
    printer.abort();
    Ok(())
}

fn dispatch(handle: &ReminderSettingsHandle, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show => println!("{}", render(&handle.state())),
        Command::Help => println!("{}", HELP),
        Command::Reload => handle.reload()?,
        Command::User(user_id) => handle.set_user_id(user_id),
        Command::Frequency(frequency) => handle.set_draft_frequency(frequency)?,
        Command::UvThreshold(threshold) => handle.set_draft_uv_threshold(threshold)?,
        Command::TempAlert(temp_alert) => handle.set_draft_temp_alert(temp_alert)?,
        Command::AddTime => handle.add_draft_time()?,
        Command::ChangeTime { index, time } => handle.change_draft_time(index, time)?,
        Command::RemoveTime(index) => handle.remove_draft_time(index)?,
        Command::Submit => handle.submit_draft()?,
        Command::Edit { id, patch } => handle.update_reminder(id, patch)?,
        Command::Delete(id) => handle.delete_reminder(id)?,
        Command::Quit => {}
    }

    Ok(())
}
