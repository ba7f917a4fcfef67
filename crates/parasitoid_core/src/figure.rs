//! Plain data handed to an external renderer.
//!
//! A figure is a list of panels; each panel carries its axis labels, the
//! series to draw and free-standing text placed in axes-fraction coordinates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dotted,
    DashDot,
    /// Markers only.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    None,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub color: Color,
    pub line: LineStyle,
    pub marker: Marker,
    pub width: f64,
}

impl Style {
    /// Solid line without markers.
    pub const fn line(color: Color, width: f64) -> Self {
        Self {
            color,
            line: LineStyle::Solid,
            marker: Marker::None,
            width,
        }
    }

    /// Solid line through circular markers, the default look of a trajectory.
    pub const fn trajectory(color: Color) -> Self {
        Self {
            color,
            line: LineStyle::Solid,
            marker: Marker::Circle,
            width: 3.0,
        }
    }

    /// A single highlighted point (the initial condition of a phase plot).
    pub const fn point(color: Color) -> Self {
        Self {
            color,
            line: LineStyle::None,
            marker: Marker::Circle,
            width: 2.0,
        }
    }

    pub const fn dashed(self, line: LineStyle) -> Self {
        Self { line, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub style: Style,
    pub points: Vec<[f64; 2]>,
}

impl Series {
    pub fn new(label: impl Into<String>, style: Style, points: Vec<[f64; 2]>) -> Self {
        Self {
            label: label.into(),
            style,
            points,
        }
    }
}

/// Text at `(x, y)` in axes-fraction coordinates (`0..1` across the panel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
    pub annotations: Vec<Annotation>,
    pub y_limits: Option<[f64; 2]>,
}

impl Panel {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
            annotations: Vec::new(),
            y_limits: None,
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    pub fn annotate(mut self, text: impl Into<String>, x: f64, y: f64) -> Self {
        self.annotations.push(Annotation {
            text: text.into(),
            x,
            y,
        });
        self
    }

    pub fn with_y_limits(mut self, low: f64, high: f64) -> Self {
        self.y_limits = Some([low, high]);
        self
    }

    pub fn find_series(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: String,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            panels: Vec::new(),
        }
    }

    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }
}
