//! SVG timeline pages - one file per rendered day
//!
//! Each (entity, channel) row is a horizontal band; the primary band is
//! drawn three times as tall as the secondary one. Intervals are coloured
//! by display category, soft boundaries get a hairline separator, and the
//! legend lists only the categories present that day.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::types::{Channel, DisplayCategory};
use crate::services::timeline::{DayTimeline, TimelineRow};
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Layout constants
const MARGIN: f64 = 20.0;
const TITLE_HEIGHT: f64 = 30.0;
const LABEL_WIDTH: f64 = 110.0;
const PLOT_WIDTH: f64 = 720.0;
const LEGEND_WIDTH: f64 = 150.0;
const UNIT: f64 = 6.0;
const ENTITY_GAP: f64 = 2.0 * UNIT;
const AXIS_HEIGHT: f64 = 30.0;
const TICK_MINUTES: i64 = 120;

// Qualitative palette, assigned to categories in sorted order
const PALETTE: [&str; 12] = [
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
];

mod colors {
    pub const TEXT: &str = "#333";
    pub const MUTED: &str = "grey";
    pub const AXIS: &str = "#999";
    pub const SEPARATOR: &str = "black";
}

/// Fixed category -> colour assignment shared by every page of a run
#[derive(Debug, Clone)]
pub struct CategoryPalette {
    colors: BTreeMap<DisplayCategory, &'static str>,
}

impl CategoryPalette {
    pub fn new<'a>(categories: impl IntoIterator<Item = &'a DisplayCategory>) -> Self {
        let mut sorted: Vec<&DisplayCategory> = categories.into_iter().collect();
        sorted.sort();
        sorted.dedup();
        let colors = sorted
            .into_iter()
            .enumerate()
            .map(|(i, category)| (category.clone(), PALETTE[i % PALETTE.len()]))
            .collect();
        Self { colors }
    }

    pub fn color(&self, category: &DisplayCategory) -> &'static str {
        self.colors.get(category).copied().unwrap_or(PALETTE[PALETTE.len() - 1])
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Band height in layout units: primary 3, secondary 1
fn band_units(channel: Channel) -> f64 {
    match channel {
        Channel::Primary => 3.0,
        Channel::Secondary => 1.0,
    }
}

struct TimeScale {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeScale {
    fn x(&self, t: NaiveDateTime) -> f64 {
        let t = t.clamp(self.start, self.end);
        let span = (self.end - self.start).num_seconds().max(1) as f64;
        MARGIN + LABEL_WIDTH + PLOT_WIDTH * (t - self.start).num_seconds() as f64 / span
    }
}

fn render_row(
    svg: &mut String,
    row: &TimelineRow,
    y: f64,
    scale: &TimeScale,
    palette: &CategoryPalette,
) {
    let height = band_units(row.channel) * UNIT;

    for interval in &row.intervals {
        if interval.end <= scale.start || interval.start >= scale.end {
            continue;
        }
        let x0 = scale.x(interval.start);
        let x1 = scale.x(interval.end);
        let color = palette.color(&interval.category);
        svg.push_str(&format!(
            r#"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="0.8"><title>{} {}-{}</title></rect>
"#,
            x0,
            y,
            (x1 - x0).max(0.5),
            height,
            color,
            color,
            escape(&interval.room),
            interval.start.format("%H:%M"),
            interval.end.format("%H:%M")
        ));
    }

    for &boundary in &row.soft_boundaries {
        if boundary <= scale.start || boundary >= scale.end {
            continue;
        }
        let x = scale.x(boundary);
        svg.push_str(&format!(
            r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="0.3"/>
"#,
            x,
            y,
            x,
            y + height,
            colors::SEPARATOR
        ));
    }
}

/// Render one day as a standalone SVG document
pub fn render_day(timeline: &DayTimeline, palette: &CategoryPalette) -> String {
    let scale = TimeScale { start: timeline.window_start, end: timeline.window_end };

    // Lay rows out top to bottom, leaving a gap between entities
    let mut positions = Vec::with_capacity(timeline.rows.len());
    let mut y = MARGIN + TITLE_HEIGHT;
    let mut previous = None;
    for row in &timeline.rows {
        if previous.is_some_and(|id| id != row.entity_id) {
            y += ENTITY_GAP;
        }
        positions.push(y);
        y += 1.5 * band_units(row.channel) * UNIT;
        previous = Some(row.entity_id);
    }

    let plot_bottom = y;
    let legend_height = MARGIN + 16.0 * timeline.legend.len() as f64;
    let height = (plot_bottom + AXIS_HEIGHT).max(MARGIN + TITLE_HEIGHT + legend_height) + MARGIN;
    let width = MARGIN * 2.0 + LABEL_WIDTH + PLOT_WIDTH + LEGEND_WIDTH;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" font-family="monospace" font-size="9">
  <rect width="100%" height="100%" fill="white"/>
  <text x="{:.2}" y="{:.2}" font-size="14" fill="{}" text-anchor="middle">{}</text>
"#,
        width,
        height,
        MARGIN + LABEL_WIDTH + PLOT_WIDTH / 2.0,
        MARGIN + 14.0,
        colors::TEXT,
        timeline.day.format("%Y-%m-%d")
    );

    let mut labelled = None;
    for (row, &row_y) in timeline.rows.iter().zip(&positions) {
        if labelled != Some(row.entity_id) {
            if let Some(provider_type) = &row.provider_type {
                svg.push_str(&format!(
                    r#"  <text x="{:.2}" y="{:.2}" fill="{}">{}</text>
"#,
                    MARGIN,
                    row_y + 2.0 * UNIT,
                    colors::MUTED,
                    escape(provider_type)
                ));
            }
            labelled = Some(row.entity_id);
        }
        render_row(&mut svg, row, row_y, &scale, palette);
    }

    // Time axis with a tick every two hours
    let axis_y = plot_bottom + 6.0;
    svg.push_str(&format!(
        r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>
"#,
        scale.x(scale.start),
        axis_y,
        scale.x(scale.end),
        axis_y,
        colors::AXIS
    ));
    let mut tick = scale.start;
    while tick <= scale.end {
        let x = scale.x(tick);
        svg.push_str(&format!(
            r#"  <line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>
  <text x="{:.2}" y="{:.2}" fill="{}" text-anchor="middle">{}</text>
"#,
            x,
            axis_y,
            x,
            axis_y + 4.0,
            colors::AXIS,
            x,
            axis_y + 15.0,
            colors::TEXT,
            tick.format("%H:%M")
        ));
        tick += TimeDelta::minutes(TICK_MINUTES);
    }

    // Legend: categories present today, sorted
    let legend_x = MARGIN + LABEL_WIDTH + PLOT_WIDTH + MARGIN;
    let mut legend_y = MARGIN + TITLE_HEIGHT;
    for category in &timeline.legend {
        svg.push_str(&format!(
            r#"  <rect x="{:.2}" y="{:.2}" width="16" height="8" fill="{}"/>
  <text x="{:.2}" y="{:.2}" fill="{}">{}</text>
"#,
            legend_x,
            legend_y,
            palette.color(category),
            legend_x + 22.0,
            legend_y + 8.0,
            colors::TEXT,
            escape(category.as_str())
        ));
        legend_y += 16.0;
    }

    svg.push_str("</svg>\n");
    svg
}

/// File name for a day's page, e.g. `provider_locs_2016-03-01.svg`
pub fn page_file_name(prefix: &str, timeline: &DayTimeline) -> String {
    format!("{}_locs_{}.svg", prefix, timeline.day.format("%Y-%m-%d"))
}

/// Render and write one day's page into `dir`
pub fn write_day(
    dir: &Path,
    prefix: &str,
    timeline: &DayTimeline,
    palette: &CategoryPalette,
) -> PipelineResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let path = dir.join(page_file_name(prefix, timeline));
    fs::write(&path, render_day(timeline, palette)).map_err(|e| PipelineError::io(&path, e))?;

    info!(
        day = %timeline.day,
        file = %path.display(),
        rows = timeline.rows.len(),
        intervals = timeline.interval_count(),
        "timeline_written"
    );
    Ok(path)
}
