pub mod logging;
pub mod runtime;
pub mod status;
pub mod traits;
pub mod types;
