use std::fmt::Write;

use anyhow::Result;

use super::escape;

const WIDTH: f64 = 1040.0;
const HEIGHT: f64 = 800.0;
const LEFT: f64 = 90.0;
const RIGHT: f64 = 30.0;
const TOP: f64 = 60.0;
const BOTTOM: f64 = 70.0;

/// Tukey box: quartiles by linear interpolation, whiskers reach the furthest
/// values within 1.5 IQR of the box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub low: f64,
    pub high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    pub fn new(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let (inside, outliers): (Vec<f64>, Vec<f64>) = sorted
            .iter()
            .partition(|x| (lo_fence..=hi_fence).contains(*x));
        Some(Self {
            count: sorted.len(),
            q1,
            median,
            q3,
            low: inside.first().copied().unwrap_or(q1),
            high: inside.last().copied().unwrap_or(q3),
            outliers,
        })
    }

    fn top(&self) -> f64 {
        self.outliers.iter().copied().fold(self.high, f64::max)
    }
}

fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    match sorted.get(i + 1) {
        Some(next) => sorted[i] + (next - sorted[i]) * (pos - i as f64),
        None => sorted[i],
    }
}

// 1, 2 or 5 times a power of ten
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powi(raw.log10().floor() as i32);
    let x = raw / magnitude;
    let factor = if x <= 1.0 {
        1.0
    } else if x <= 2.0 {
        2.0
    } else if x <= 5.0 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

/// SVG chart with one box per series. `y_max` caps the axis; anything above
/// it is clipped.
pub fn boxplot(title: &str, series: &[(&str, &str, Vec<f64>)], y_max: Option<f64>) -> Result<String> {
    let stats: Vec<_> = series.iter().map(|(_, _, x)| BoxStats::new(x)).collect();
    let top = y_max.unwrap_or_else(|| {
        stats
            .iter()
            .flatten()
            .map(BoxStats::top)
            .fold(0.0, f64::max)
            * 1.05
    });
    let top = if top > 0.0 { top } else { 1.0 };

    let plot_w = WIDTH - LEFT - RIGHT;
    let plot_h = HEIGHT - TOP - BOTTOM;
    let y = |v: f64| TOP + plot_h - v.clamp(0.0, top) / top * plot_h;

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="32" font-size="18" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    )?;

    // y axis and grid
    let step = nice_step(top / 10.0);
    let ticks = (top / step + 1e-9).floor() as usize;
    for i in 0..=ticks {
        let tick = step * i as f64;
        let ty = y(tick);
        writeln!(
            svg,
            r##"<line x1="{LEFT}" x2="{}" y1="{ty:.1}" y2="{ty:.1}" stroke="#e0e0e0"/>"##,
            LEFT + plot_w
        )?;
        writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" font-size="12" text-anchor="end">{tick}</text>"#,
            LEFT - 8.0,
            ty + 4.0
        )?;
    }
    writeln!(
        svg,
        r#"<rect x="{LEFT}" y="{TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
    )?;
    writeln!(
        svg,
        r#"<text transform="translate(24 {}) rotate(-90)" font-size="14" text-anchor="middle">Distance (Feet)</text>"#,
        TOP + plot_h / 2.0
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" font-size="14" text-anchor="middle">Geocoding Service</text>"#,
        LEFT + plot_w / 2.0,
        HEIGHT - 20.0
    )?;

    let slot = plot_w / series.len().max(1) as f64;
    for (i, ((label, color, _), stats)) in series.iter().zip(&stats).enumerate() {
        let cx = LEFT + slot * (i as f64 + 0.5);
        writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
            TOP + plot_h + 22.0,
            escape(label)
        )?;

        let Some(b) = stats else {
            continue;
        };
        let half = slot * 0.3;
        let cap = slot * 0.15;
        writeln!(
            svg,
            r#"<line x1="{cx:.1}" x2="{cx:.1}" y1="{:.1}" y2="{:.1}" stroke="black"/>"#,
            y(b.low),
            y(b.high)
        )?;
        for v in [b.low, b.high] {
            writeln!(
                svg,
                r#"<line x1="{:.1}" x2="{:.1}" y1="{:.1}" y2="{:.1}" stroke="black"/>"#,
                cx - cap,
                cx + cap,
                y(v),
                y(v)
            )?;
        }
        writeln!(
            svg,
            r#"<rect class="box" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{color}" stroke="black"/>"#,
            cx - half,
            y(b.q3),
            half * 2.0,
            y(b.q1) - y(b.q3)
        )?;
        writeln!(
            svg,
            r#"<line x1="{:.1}" x2="{:.1}" y1="{:.1}" y2="{:.1}" stroke="black" stroke-width="2"/>"#,
            cx - half,
            cx + half,
            y(b.median),
            y(b.median)
        )?;
        for v in b.outliers.iter().filter(|v| **v <= top) {
            writeln!(
                svg,
                r#"<circle cx="{cx:.1}" cy="{:.1}" r="3" fill="none" stroke="black"/>"#,
                y(*v)
            )?;
        }
    }
    writeln!(svg, "</svg>")?;

    Ok(svg)
}
