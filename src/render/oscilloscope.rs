//! Terminal oscilloscope widget
//!
//! Plots one channel of the module's signal as a line chart across the
//! full terminal, one sample per column.
//!
//! ## Coordinate System
//!
//! Samples are unsigned bytes:
//! - X: sample index, 0 = left edge
//! - Y: 0 = bottom edge, 255 = top edge (128 is the resting level)

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Padding};
use ratatui::Frame;
use serde::{Deserialize, Serialize};

/// Full scale of an 8-bit sample
const Y_MAX: f64 = u8::MAX as f64;

/// How points are drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    /// One dot per cell
    #[default]
    Dot,
    /// Braille patterns, 2x4 points per cell
    Braille,
}

impl PlotMode {
    fn marker(self) -> Marker {
        match self {
            PlotMode::Dot => Marker::Dot,
            PlotMode::Braille => Marker::Braille,
        }
    }
}

/// Display settings for the oscilloscope
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Draw a border around the chart
    pub show_border: bool,

    /// Blank columns left of the chart
    pub padding_left: u16,

    pub mode: PlotMode,

    /// Trace color
    pub color: Color,

    /// Swap trace foreground and background
    pub reverse: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_border: false,
            padding_left: 2,
            mode: PlotMode::Dot,
            color: Color::Cyan,
            reverse: true,
        }
    }
}

/// Line chart of a single-channel sample series
#[derive(Clone, Debug, Default)]
pub struct Oscilloscope {
    pub settings: DisplaySettings,
}

impl Oscilloscope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: DisplaySettings) -> Self {
        Self { settings }
    }

    fn trace_style(&self) -> Style {
        let style = Style::default().fg(self.settings.color);
        if self.settings.reverse {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style
        }
    }

    /// Draw `points` (`(index, value)` pairs) into `area`
    pub fn render(&self, frame: &mut Frame, area: Rect, points: &[(f64, f64)]) {
        let borders = if self.settings.show_border {
            Borders::ALL
        } else {
            Borders::NONE
        };
        let block = Block::default()
            .borders(borders)
            .padding(Padding::left(self.settings.padding_left));

        let dataset = Dataset::default()
            .marker(self.settings.mode.marker())
            .graph_type(GraphType::Line)
            .style(self.trace_style())
            .data(points);

        // Keep a non-empty x range so an empty series still draws
        let x_max = (points.len().saturating_sub(1) as f64).max(1.0);
        let chart = Chart::new(vec![dataset])
            .block(block)
            .x_axis(Axis::default().bounds([0.0, x_max]))
            .y_axis(Axis::default().bounds([0.0, Y_MAX]));

        frame.render_widget(chart, area);
    }
}
