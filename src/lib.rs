pub mod api;
pub mod appsettings;
pub mod command;
pub mod draft;
pub mod reminder;
pub mod reminder_settings;
pub mod render;
pub mod state;
