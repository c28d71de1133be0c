//! This file is part of zram-governor.
//! Licensed under the GNU GPL v3 or later.

#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod common;
pub mod config;
pub mod controllers;
pub mod daemon;
pub mod hal;
pub mod monitors;
pub mod utils;

pub use algorithms::sizing_math::{DecisionReason, ScalingDecision, SizingPolicy};
pub use config::settings::GovernorConfig;
pub use controllers::zram_controller::{ControllerState, TickOutcome, ZramController};
pub use daemon::traits::{DeviceControl, StatusSink, StopSignal, SystemProbe, ZramSystem};
pub use daemon::types::*;
