// Configuration loading

pub mod settings;

pub use settings::{DisplayPreference, Settings};
