use crate::error::{ProcessingError, Result};
use crate::models::{BinMean, BinnedMeans};
use crate::utils::constants::{DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH};
use plotters::chart::SeriesLabelPosition;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::Path;

const GREY: RGBColor = RGBColor(128, 128, 128);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesAxis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Circle,
    Square,
    Triangle,
    Cross,
}

/// One line of the diagnostic chart, x = mean u* of each bin
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: &'static str,
    pub axis: SeriesAxis,
    pub marker: Marker,
    pub points: Vec<(f64, f64)>,
}

impl ChartSeries {
    fn style(&self) -> ShapeStyle {
        match self.label {
            APPARENT_LABEL => GREY.stroke_width(2),
            TEMPERATURE_LABEL => RED.stroke_width(1),
            _ => BLACK.stroke_width(1),
        }
    }
}

pub const FLUX_LABEL: &str = "Turbulent flux";
pub const STORAGE_LABEL: &str = "Storage";
pub const APPARENT_LABEL: &str = "Apparent NEE";
pub const TEMPERATURE_LABEL: &str = "Air temperature";

/// Bin-mean flux against bin-mean friction velocity
#[derive(Debug, Clone)]
pub struct UstarChart {
    series: Vec<ChartSeries>,
    threshold: Option<f64>,
    title: Option<String>,
    width: u32,
    height: u32,
}

impl UstarChart {
    pub fn from_means(means: &BinnedMeans) -> Self {
        let mut series = vec![ChartSeries {
            label: FLUX_LABEL,
            axis: SeriesAxis::Primary,
            marker: Marker::Circle,
            points: points(means, |b| Some(b.flux)),
        }];

        if means.has_storage {
            series.push(ChartSeries {
                label: STORAGE_LABEL,
                axis: SeriesAxis::Primary,
                marker: Marker::Square,
                points: points(means, |b| b.storage),
            });
            series.push(ChartSeries {
                label: APPARENT_LABEL,
                axis: SeriesAxis::Primary,
                marker: Marker::Triangle,
                points: points(means, BinMean::apparent_flux),
            });
        }

        if means.has_temperature {
            series.push(ChartSeries {
                label: TEMPERATURE_LABEL,
                axis: SeriesAxis::Secondary,
                marker: Marker::Cross,
                points: points(means, |b| b.temperature),
            });
        }

        Self {
            series,
            threshold: None,
            title: None,
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
        }
    }

    /// Mark an estimated u* threshold with a vertical line
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold.filter(|t| t.is_finite());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Change one side, keeping the other at its current value
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn series(&self) -> &[ChartSeries] {
        &self.series
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn has_secondary_axis(&self) -> bool {
        self.series.iter().any(|s| s.axis == SeriesAxis::Secondary)
    }

    pub fn render_svg(&self) -> Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                .into_drawing_area();
            self.draw(&root)
                .map_err(|e| ProcessingError::Plot(e.to_string()))?;
        }
        Ok(svg)
    }

    pub fn save_svg(&self, path: &Path) -> Result<()> {
        let svg = self.render_svg()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, svg)?;
        Ok(())
    }

    fn axis_range(&self, axis: SeriesAxis) -> Option<(f64, f64)> {
        let mut values = self
            .series
            .iter()
            .filter(|s| s.axis == axis)
            .flat_map(|s| s.points.iter().map(|(_, y)| *y));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    fn x_range(&self) -> Option<(f64, f64)> {
        let mut values = self
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(x, _)| *x))
            .chain(self.threshold);
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    fn draw(&self, root: &DrawingArea<SVGBackend, Shift>) -> std::result::Result<(), Box<dyn Error>> {
        let (x_min, x_max) = padded(self.x_range().ok_or("no bins to plot")?);
        let (y_min, y_max) = padded(self.axis_range(SeriesAxis::Primary).ok_or("no bins to plot")?);
        let (t_min, t_max) = padded(self.axis_range(SeriesAxis::Secondary).unwrap_or((0.0, 1.0)));

        root.fill(&WHITE)?;

        let mut builder = ChartBuilder::on(root);
        builder
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .right_y_label_area_size(if self.has_secondary_axis() { 80 } else { 0 });
        if let Some(title) = &self.title {
            builder.caption(title, ("sans-serif", 24));
        }

        let mut chart = builder
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?
            .set_secondary_coord(x_min..x_max, t_min..t_max);

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("u* (m s-1)")
            .y_desc("Re (umol m-2 s-1)")
            .axis_desc_style(("sans-serif", 22))
            .label_style(("sans-serif", 14))
            .draw()?;

        if self.has_secondary_axis() {
            chart
                .configure_secondary_axes()
                .y_desc("Ta (degC)")
                .draw()?;
        }

        if let Some(threshold) = self.threshold {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(threshold, y_min), (threshold, y_max)],
                BLACK.stroke_width(1),
            )))?;
        }

        for series in &self.series {
            let style = series.style();
            let line = LineSeries::new(series.points.iter().copied(), style);
            let anno = match series.axis {
                SeriesAxis::Primary => chart.draw_series(line)?,
                SeriesAxis::Secondary => chart.draw_secondary_series(line)?,
            };
            anno.label(series.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));

            let markers = series.points.iter().copied();
            match (series.axis, series.marker) {
                (SeriesAxis::Secondary, _) => {
                    chart.draw_secondary_series(markers.map(|p| Cross::new(p, 4, style)))?;
                }
                (SeriesAxis::Primary, Marker::Circle) => {
                    chart.draw_series(markers.map(|p| Circle::new(p, 4, style)))?;
                }
                (SeriesAxis::Primary, Marker::Square) => {
                    chart.draw_series(markers.map(|p| {
                        EmptyElement::at(p) + Rectangle::new([(-4, -4), (4, 4)], style)
                    }))?;
                }
                (SeriesAxis::Primary, Marker::Triangle) => {
                    chart.draw_series(
                        markers.map(|p| TriangleMarker::new(p, 5, style.color.filled())),
                    )?;
                }
                (SeriesAxis::Primary, Marker::Cross) => {
                    chart.draw_series(markers.map(|p| Cross::new(p, 4, style)))?;
                }
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", 14))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

fn points(means: &BinnedMeans, value: impl Fn(&BinMean) -> Option<f64>) -> Vec<(f64, f64)> {
    means
        .bins
        .iter()
        .filter_map(|b| value(b).map(|y| (b.friction_velocity, y)))
        .collect()
}

/// Widen a data range by 5% each side so markers stay inside the plot
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(1.0) {
        let pad = lo.abs().max(1.0) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - span * 0.05, hi + span * 0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn means(has_storage: bool, has_temperature: bool) -> BinnedMeans {
        let bins = (1..=3)
            .map(|i| BinMean {
                bin: i,
                count: 10,
                flux: i as f64,
                storage: has_storage.then_some(0.5),
                friction_velocity: 0.1 * i as f64,
                temperature: has_temperature.then_some(12.0 + i as f64),
            })
            .collect();

        BinnedMeans {
            bins,
            has_storage,
            has_temperature,
            num_cats: 3,
            light_threshold: 10.0,
            edges: vec![0.05, 0.15, 0.25, 0.35],
            nighttime_rows: 30,
            complete_rows: 30,
        }
    }

    fn labels(chart: &UstarChart) -> Vec<&'static str> {
        chart.series().iter().map(|s| s.label).collect()
    }

    #[test]
    fn test_flux_only_without_storage() {
        let chart = UstarChart::from_means(&means(false, false));
        assert_eq!(labels(&chart), vec![FLUX_LABEL]);
        assert!(!chart.has_secondary_axis());
    }

    #[test]
    fn test_storage_adds_apparent_flux() {
        let chart = UstarChart::from_means(&means(true, false));
        assert_eq!(labels(&chart), vec![FLUX_LABEL, STORAGE_LABEL, APPARENT_LABEL]);

        let apparent = &chart.series()[2];
        assert_eq!(apparent.points[0], (0.1, 1.5));
    }

    #[test]
    fn test_temperature_on_secondary_axis() {
        let chart = UstarChart::from_means(&means(false, true));
        let temperature = chart.series().last().unwrap();
        assert_eq!(temperature.label, TEMPERATURE_LABEL);
        assert_eq!(temperature.axis, SeriesAxis::Secondary);
        assert!(chart.has_secondary_axis());
    }

    #[test]
    fn test_threshold_extends_x_range() {
        let chart = UstarChart::from_means(&means(false, false)).with_threshold(Some(0.6));
        assert_eq!(chart.threshold(), Some(0.6));
        let (_, x_max) = chart.x_range().unwrap();
        assert_eq!(x_max, 0.6);

        let ignored = UstarChart::from_means(&means(false, false)).with_threshold(Some(f64::NAN));
        assert_eq!(ignored.threshold(), None);
    }

    #[test]
    fn test_render_svg() {
        let svg = UstarChart::from_means(&means(true, true))
            .with_threshold(Some(0.2))
            .with_title("Test site")
            .render_svg()
            .unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains(FLUX_LABEL));
        assert!(svg.contains(APPARENT_LABEL));
    }

    #[test]
    fn test_single_side_resize_keeps_default() {
        let wide = UstarChart::from_means(&means(false, false)).with_width(640);
        assert_eq!(wide.size(), (640, DEFAULT_CHART_HEIGHT));

        let tall = UstarChart::from_means(&means(false, false)).with_height(480);
        assert_eq!(tall.size(), (DEFAULT_CHART_WIDTH, 480));

        let svg = wide.render_svg().unwrap();
        assert!(svg.contains("width=\"640\""));
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded((0.0, 10.0)), (-0.5, 10.5));
        let (lo, hi) = padded((2.0, 2.0));
        assert!(lo < 2.0 && hi > 2.0);
    }
}
