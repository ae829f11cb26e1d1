//! Binary-side presentation: terminal setup and the live progress display.

pub(crate) mod progress;
pub(crate) mod terminal;
