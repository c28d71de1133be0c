pub mod applier;
pub mod zram_controller;
