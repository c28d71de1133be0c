pub mod filesystem;
pub mod helper;
pub mod linux;
pub mod lock;
pub mod module;
pub mod privilege;
pub mod signal;
pub mod swap;
