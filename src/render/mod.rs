//! Render module - terminal UI components for visualization
//!
//! This module provides:
//! - Line-chart oscilloscope widget
//! - Its persisted display settings

mod oscilloscope;

pub use oscilloscope::{DisplaySettings, Oscilloscope, PlotMode};
