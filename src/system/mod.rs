pub mod gesture;
pub mod pasteboard;
pub mod permissions;
