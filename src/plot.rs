use std::io::Write;

use crate::error::{ClusterError, Result};
use crate::kmeans::Centroid;
use crate::output::AugmentedRecord;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const MARGIN: f64 = 70.0;
const LEGEND_WIDTH: f64 = 170.0;
const POINT_RADIUS: f64 = 3.5;

/// Anchor colours of the diverging pink/yellow-green map, low to high
const PIYG: [(u8, u8, u8); 11] = [
    (0x8e, 0x01, 0x52),
    (0xc5, 0x1b, 0x7d),
    (0xde, 0x77, 0xae),
    (0xf1, 0xb6, 0xda),
    (0xfd, 0xe0, 0xef),
    (0xf7, 0xf7, 0xf7),
    (0xe6, 0xf5, 0xd0),
    (0xb8, 0xe1, 0x86),
    (0x7f, 0xbc, 0x41),
    (0x4d, 0x92, 0x21),
    (0x27, 0x64, 0x19),
];

pub struct ScatterPlot<'a> {
    pub x_col: usize,
    pub y_col: usize,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub centroids: &'a [Centroid],
}

/// Colour at `t` in [0, 1], linear between anchors
fn piyg(t: f64) -> (u8, u8, u8) {
    let pos = t.clamp(0.0, 1.0) * (PIYG.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(PIYG.len() - 1);
    let frac = pos - lo as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (PIYG[lo], PIYG[hi]);
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// `k` evenly spaced colours from the map, as hex strings
pub fn palette(k: usize) -> Vec<String> {
    (0..k)
        .map(|j| {
            let t = if k > 1 { j as f64 / (k - 1) as f64 } else { 0.0 };
            let (r, g, b) = piyg(t);
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        })
        .collect()
}

/// Min and max of one column, widened when the range is empty
fn bounds(records: &[AugmentedRecord], col: usize) -> (f64, f64) {
    let (lo, hi) = records
        .iter()
        .map(|r| r.fields[col])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    if hi - lo == 0.0 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo, hi)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Data ranges and the pixel area they map onto
struct Frame {
    x: (f64, f64),
    y: (f64, f64),
    width: f64,
    height: f64,
}

impl Frame {
    fn new(records: &[AugmentedRecord], x_col: usize, y_col: usize) -> Self {
        Frame {
            x: bounds(records, x_col),
            y: bounds(records, y_col),
            width: WIDTH - LEGEND_WIDTH - 2.0 * MARGIN,
            height: HEIGHT - 2.0 * MARGIN,
        }
    }

    fn px(&self, x: f64) -> f64 {
        MARGIN + (x - self.x.0) / (self.x.1 - self.x.0) * self.width
    }

    fn py(&self, y: f64) -> f64 {
        HEIGHT - MARGIN - (y - self.y.0) / (self.y.1 - self.y.0) * self.height
    }
}

impl ScatterPlot<'_> {
    pub fn render<W: Write>(&self, out: &mut W, records: &[AugmentedRecord]) -> Result<()> {
        if let Some(record) = records.first() {
            let width = record.fields.len();
            for column in [self.x_col, self.y_col] {
                if column >= width {
                    return Err(ClusterError::ColumnOutOfRange { column, width });
                }
            }
        }

        let colors = palette(self.centroids.len());
        let frame = Frame::new(records, self.x_col, self.y_col);

        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" font-family="sans-serif" font-size="12">"#,
            WIDTH, HEIGHT
        )?;
        writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
        self.write_axes(out, &frame)?;
        self.write_points(out, &frame, records, &colors)?;
        self.write_legend(out, &frame, &colors)?;
        writeln!(out, "</svg>")?;
        Ok(())
    }

    fn write_axes<W: Write>(&self, out: &mut W, frame: &Frame) -> Result<()> {
        let (x_lo, x_hi) = frame.x;
        let (y_lo, y_hi) = frame.y;
        let bottom = HEIGHT - MARGIN;
        writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="black"/>"#,
            MARGIN, MARGIN, frame.width, frame.height
        )?;

        // Ticks at the ends of each axis
        writeln!(out, r#"<text x="{}" y="{}" text-anchor="start">{}</text>"#, MARGIN, bottom + 16.0, x_lo)?;
        writeln!(out, r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#, MARGIN + frame.width, bottom + 16.0, x_hi)?;
        writeln!(out, r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#, MARGIN - 6.0, bottom, y_lo)?;
        writeln!(out, r#"<text x="{}" y="{}" text-anchor="end">{}</text>"#, MARGIN - 6.0, MARGIN + 10.0, y_hi)?;

        writeln!(
            out,
            r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
            MARGIN + frame.width / 2.0,
            HEIGHT - MARGIN / 3.0,
            escape(self.x_label)
        )?;
        writeln!(
            out,
            r#"<text x="{x}" y="{y}" text-anchor="middle" transform="rotate(-90 {x} {y})">{}</text>"#,
            escape(self.y_label),
            x = MARGIN / 3.0,
            y = MARGIN + frame.height / 2.0
        )?;
        Ok(())
    }

    fn write_points<W: Write>(
        &self,
        out: &mut W,
        frame: &Frame,
        records: &[AugmentedRecord],
        colors: &[String],
    ) -> Result<()> {
        writeln!(out, "<g>")?;
        for record in records {
            writeln!(
                out,
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" stroke="#333" stroke-width="0.3"/>"##,
                frame.px(record.fields[self.x_col]),
                frame.py(record.fields[self.y_col]),
                POINT_RADIUS,
                colors[record.cluster]
            )?;
        }
        writeln!(out, "</g>")?;
        Ok(())
    }

    fn write_legend<W: Write>(&self, out: &mut W, frame: &Frame, colors: &[String]) -> Result<()> {
        let legend_x = WIDTH - LEGEND_WIDTH - MARGIN / 2.0;
        let row_h = (frame.height / self.centroids.len().max(1) as f64).min(22.0);
        writeln!(out, r#"<g class="legend">"#)?;
        for (j, (centroid, color)) in self.centroids.iter().zip(colors).enumerate() {
            let y = MARGIN + j as f64 * row_h;
            writeln!(
                out,
                r#"<rect x="{}" y="{:.2}" width="14" height="{:.2}" fill="{}"/>"#,
                legend_x,
                y,
                row_h * 0.8,
                color
            )?;
            writeln!(
                out,
                r#"<text x="{}" y="{:.2}">{} ({:.3})</text>"#,
                legend_x + 20.0,
                y + row_h * 0.6,
                j,
                centroid
            )?;
        }
        writeln!(out, "</g>")?;
        Ok(())
    }
}
