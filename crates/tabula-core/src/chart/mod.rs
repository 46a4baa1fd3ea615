//! Chart types
//!
//! A chart is anchored to a rectangle of sheet cells and plots series read
//! from ranges on a data-source sheet (the owning sheet unless set).
//!
//! ```rust
//! use tabula_core::chart::{Chart, LineOptions, MarkerStyle, Series};
//! use tabula_core::CellRange;
//!
//! let chart = Chart::line(LineOptions { marker: MarkerStyle::Circle, smooth: true })
//!     .with_title("Revenue")
//!     .with_position(CellRange::from_bounds(4, 0, 11, 15))
//!     .with_series(Series::new(
//!         CellRange::parse("A2:A13").unwrap(),
//!         CellRange::parse("B2:B13").unwrap(),
//!     ));
//! assert_eq!(chart.series.len(), 1);
//! ```

mod series;

pub use series::Series;

use crate::cell::CellRange;

/// Chart family and family-specific options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Bar or column chart
    Bar(BarDirection),
    /// Line chart
    Line(LineOptions),
    /// Pie chart
    Pie,
    /// XY scatter chart; series ranges are X and Y values
    Scatter(MarkerStyle),
}

impl ChartKind {
    /// Element name of the plot in the chart part
    pub fn xlsx_element(&self) -> &'static str {
        match self {
            ChartKind::Bar(_) => "barChart",
            ChartKind::Line(_) => "lineChart",
            ChartKind::Pie => "pieChart",
            ChartKind::Scatter(_) => "scatterChart",
        }
    }
}

/// Orientation of bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarDirection {
    /// Vertical bars
    #[default]
    Column,
    /// Horizontal bars
    Bar,
}

impl BarDirection {
    pub fn as_xlsx(&self) -> &'static str {
        match self {
            BarDirection::Column => "col",
            BarDirection::Bar => "bar",
        }
    }

    pub fn from_xlsx(s: &str) -> Self {
        if s == "bar" {
            BarDirection::Bar
        } else {
            BarDirection::Column
        }
    }
}

/// Line chart options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOptions {
    /// Point marker
    pub marker: MarkerStyle,
    /// Draw smoothed curves
    pub smooth: bool,
}

/// Point marker shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerStyle {
    #[default]
    None,
    Circle,
    Diamond,
    Square,
    Triangle,
    X,
    Star,
}

impl MarkerStyle {
    pub fn as_xlsx(&self) -> &'static str {
        match self {
            MarkerStyle::None => "none",
            MarkerStyle::Circle => "circle",
            MarkerStyle::Diamond => "diamond",
            MarkerStyle::Square => "square",
            MarkerStyle::Triangle => "triangle",
            MarkerStyle::X => "x",
            MarkerStyle::Star => "star",
        }
    }

    pub fn from_xlsx(s: &str) -> Self {
        match s {
            "circle" => MarkerStyle::Circle,
            "diamond" => MarkerStyle::Diamond,
            "square" => MarkerStyle::Square,
            "triangle" => MarkerStyle::Triangle,
            "x" => MarkerStyle::X,
            "star" => MarkerStyle::Star,
            _ => MarkerStyle::None,
        }
    }
}

/// Chart definition
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Chart family
    pub kind: ChartKind,
    /// Chart title
    pub title: Option<String>,
    /// Inclusive cell rectangle the chart covers
    pub position: CellRange,
    /// Sheet the series ranges refer to; `None` means the owning sheet
    pub data_sheet: Option<String>,
    /// Data series, in plot order
    pub series: Vec<Series>,
}

impl Chart {
    /// Create a chart of the given kind, anchored at A1:H15
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            title: None,
            position: CellRange::from_bounds(0, 0, 7, 14),
            data_sheet: None,
            series: Vec::new(),
        }
    }

    /// Column chart
    pub fn bar() -> Self {
        Self::new(ChartKind::Bar(BarDirection::Column))
    }

    /// Line chart
    pub fn line(options: LineOptions) -> Self {
        Self::new(ChartKind::Line(options))
    }

    /// Pie chart
    pub fn pie() -> Self {
        Self::new(ChartKind::Pie)
    }

    /// Scatter chart
    pub fn scatter(marker: MarkerStyle) -> Self {
        Self::new(ChartKind::Scatter(marker))
    }

    /// Set chart title
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the anchor rectangle
    pub fn with_position(mut self, position: CellRange) -> Self {
        self.position = position;
        self
    }

    /// Read series data from another sheet
    pub fn with_data_sheet<S: Into<String>>(mut self, sheet: S) -> Self {
        self.data_sheet = Some(sheet.into());
        self
    }

    /// Append a data series
    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Add a data series
    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Data-source sheet name, falling back to the owning sheet
    pub fn data_sheet_or<'a>(&'a self, owner: &'a str) -> &'a str {
        self.data_sheet.as_deref().unwrap_or(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let chart = Chart::pie();
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(chart.position.to_a1_string(), "A1:H15");
        assert_eq!(chart.data_sheet_or("Sheet1"), "Sheet1");
        assert_eq!(chart.with_data_sheet("Data").data_sheet_or("Sheet1"), "Data");
    }

    #[test]
    fn test_marker_names() {
        for marker in [
            MarkerStyle::None,
            MarkerStyle::Circle,
            MarkerStyle::Diamond,
            MarkerStyle::Square,
            MarkerStyle::Triangle,
            MarkerStyle::X,
            MarkerStyle::Star,
        ] {
            assert_eq!(MarkerStyle::from_xlsx(marker.as_xlsx()), marker);
        }
    }
}
