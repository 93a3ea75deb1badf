pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod loading;
pub mod notify;
pub mod panel;
pub mod prefs;
pub mod types;
pub mod view;
pub mod webhook;
