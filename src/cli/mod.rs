pub mod preview;
pub mod setup;
pub mod ui;
