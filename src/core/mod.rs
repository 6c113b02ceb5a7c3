pub mod clipboard;
pub mod history;
pub mod screenshot;
pub mod store;
