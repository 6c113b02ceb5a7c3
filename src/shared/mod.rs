pub mod errors;
pub mod events;
pub mod settings;
pub mod types;
