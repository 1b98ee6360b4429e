pub mod config;
pub mod console_display;
pub mod controls;
pub mod coordinator;
pub mod engine;
pub mod layout;
pub mod mapping;
pub mod note_store;
pub mod profile;
pub mod render;
pub mod scheduler;
pub mod separation;
pub mod simulator;
pub mod types;

#[cfg(feature = "midi")]
pub mod midi_input;
