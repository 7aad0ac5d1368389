//! Visualization utilities for ukf_sensor_fusion
//!
//! Collects trajectories and diagnostic series and renders them with gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{FusionError, FusionResult, Point2D};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const ESTIMATED: &str = "#35C788";
    pub const GROUND_TRUTH: &str = BLUE;
    pub const LIDAR: &str = "#DD3355";
    pub const RADAR: &str = "#FFA500";
    pub const THRESHOLD: &str = GRAY;
}

/// Style for line rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Line(Vec<f64>, Vec<f64>, PathStyle),
    Points(Vec<f64>, Vec<f64>, PointStyle),
}

/// Main visualizer struct; every series is drawn on one set of axes
pub struct Visualizer {
    figure: Figure,
    series: Vec<Series>,
    title: String,
    x_label: String,
    y_label: String,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            series: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            aspect_ratio: Some(1.0),
        }
    }

    /// Set the plot title
    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Set axis labels
    pub fn set_labels(&mut self, x_label: &str, y_label: &str) -> &mut Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Number of series queued for rendering
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Plot a line from x,y vectors
    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.series.push(Series::Line(x.to_vec(), y.to_vec(), style.clone()));
        self
    }

    /// Plot a sequence of points as a line
    pub fn plot_track(&mut self, points: &[Point2D], style: &PathStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();
        self.series.push(Series::Line(x, y, style.clone()));
        self
    }

    /// Plot individual points
    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();
        self.series.push(Series::Points(x, y, style.clone()));
        self
    }

    /// Finalize and show the plot
    pub fn show(&mut self) -> FusionResult<()> {
        self.render();
        self.figure
            .show()
            .map(|_| ())
            .map_err(|e| FusionError::VisualizationError(e.to_string()))
    }

    /// Save plot to PNG file
    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> FusionResult<()> {
        self.render();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| FusionError::VisualizationError(e.to_string()))
    }

    fn render(&mut self) {
        self.figure.clear_axes();
        let axes = self.figure.axes2d();

        for series in &self.series {
            match series {
                Series::Line(x, y, style) => {
                    axes.lines(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        LineWidth(style.line_width),
                    ]);
                }
                Series::Points(x, y, style) => {
                    axes.points(x, y, &[
                        Caption(&style.caption),
                        Color(&style.color),
                        PointSymbol(style.symbol),
                        PointSize(style.size),
                    ]);
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Ground truth, estimates and measurements on one plot
pub fn quick_plot_tracking(
    ground_truth: &[Point2D],
    estimates: &[Point2D],
    lidar: &[Point2D],
    radar: &[Point2D],
    title: &str,
) -> Visualizer {
    let mut vis = Visualizer::new();
    vis.set_title(title);
    vis.plot_points(lidar, &PointStyle::new(colors::LIDAR, "Lidar").with_size(0.5));
    vis.plot_points(
        radar,
        &PointStyle::new(colors::RADAR, "Radar").with_size(0.5).with_symbol('x'),
    );
    vis.plot_track(ground_truth, &PathStyle::new(colors::GROUND_TRUTH, "Ground truth"));
    vis.plot_track(estimates, &PathStyle::new(colors::ESTIMATED, "UKF estimate"));
    vis
}

/// NIS series against its 95% chi-squared threshold
pub fn nis_plot(samples: &[f64], threshold: f64, title: &str) -> Visualizer {
    let x: Vec<f64> = (0..samples.len()).map(|i| i as f64).collect();
    let mut vis = Visualizer::new();
    vis.set_title(title)
        .set_labels("update", "NIS")
        .set_aspect_ratio(None);
    vis.plot_path_xy(&x, samples, &PathStyle::new(colors::RED, "NIS").with_line_width(1.0));
    if !samples.is_empty() {
        let last = (samples.len() - 1) as f64;
        vis.plot_path_xy(
            &[0.0, last],
            &[threshold, threshold],
            &PathStyle::new(colors::THRESHOLD, "95% threshold").with_line_width(1.0),
        );
    }
    vis
}
