//! Contour line (isoline) rendering using the marching squares algorithm.
//!
//! Fields are traced in grid-index space. Cells with a masked corner are
//! skipped, so no line ever runs through missing data. The traced polylines
//! are then scaled to the output raster and stroked with anti-aliasing.

use crate::colormap::ColorRamp;
use crate::raster::RgbaRaster;
use ocean_common::{ColorScale, ScalarField, TileError, TileResult};

/// Typographic points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Resolution tiles are drawn at when line widths are given in points.
pub const TILE_DPI: f32 = 64.0;

/// Convert a line width in points to pixels at `dpi`.
pub fn points_to_pixels(points: f32, dpi: f32) -> f32 {
    points * dpi / POINTS_PER_INCH
}

/// A point in grid-index or pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two points
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A complete contour line (polyline)
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f64,
    pub color: [u8; 4],
    pub points: Vec<Point>,
    pub closed: bool,
}

/// A level to trace and the color its line is stroked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourLevel {
    pub value: f64,
    pub color: [u8; 4],
}

/// `count` equally spaced levels above `scale.min` (the last exactly
/// `scale.max`), each colored by the ramp at its normalized position.
pub fn quantized_levels(scale: &ColorScale, ramp: &ColorRamp, count: usize) -> Vec<ContourLevel> {
    scale
        .quantized_levels(count)
        .into_iter()
        .map(|value| ContourLevel {
            value,
            color: ramp.rgba8(scale.normalize(value)),
        })
        .collect()
}

/// Explicit levels colored through an arbitrary normalization.
pub fn levels_with_norm<N>(values: &[f64], ramp: &ColorRamp, norm: N) -> Vec<ContourLevel>
where
    N: Fn(f64) -> f64,
{
    values
        .iter()
        .map(|&value| ContourLevel {
            value,
            color: ramp.rgba8(norm(value)),
        })
        .collect()
}

/// Marching squares over a masked field.
///
/// `fill` replaces masked values before classification; any cell with a
/// masked corner produces no segments.
pub fn march_squares(field: &ScalarField, fill: f64, level: f64) -> Vec<Segment> {
    let (height, width) = field.shape();
    if width < 2 || height < 2 {
        return vec![];
    }

    let data = field.filled_with(fill);
    let mask = field.mask();
    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl_i = y * width + x;
            let tr_i = tl_i + 1;
            let bl_i = tl_i + width;
            let br_i = bl_i + 1;

            if mask[tl_i] || mask[tr_i] || mask[bl_i] || mask[br_i] {
                continue;
            }

            let tl = data[tl_i];
            let tr = data[tr_i];
            let bl = data[bl_i];
            let br = data[br_i];

            // Calculate cell index (0-15) based on which corners are above the threshold
            let mut cell_index = 0u8;
            if tl >= level {
                cell_index |= 1;
            }
            if tr >= level {
                cell_index |= 2;
            }
            if br >= level {
                cell_index |= 4;
            }
            if bl >= level {
                cell_index |= 8;
            }

            segments.extend(get_cell_segments(
                cell_index, x as f32, y as f32, tl, tr, br, bl, level,
            ));
        }
    }

    segments
}

/// Get line segments for a marching squares cell
#[allow(clippy::too_many_arguments)]
fn get_cell_segments(
    cell_index: u8,
    x: f32,
    y: f32,
    tl: f64,
    tr: f64,
    br: f64,
    bl: f64,
    level: f64,
) -> Vec<Segment> {
    let top = interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = interpolate_edge(x, y, x, y + 1.0, tl, bl, level);

    match cell_index {
        0 | 15 => vec![],
        1 | 14 => vec![Segment { start: left, end: top }],
        2 | 13 => vec![Segment { start: top, end: right }],
        3 | 12 => vec![Segment { start: left, end: right }],
        4 | 11 => vec![Segment { start: right, end: bottom }],
        5 => vec![
            // Saddle
            Segment { start: left, end: top },
            Segment { start: right, end: bottom },
        ],
        6 | 9 => vec![Segment { start: top, end: bottom }],
        7 | 8 => vec![Segment { start: left, end: bottom }],
        10 => vec![
            // Saddle
            Segment { start: top, end: right },
            Segment { start: left, end: bottom },
        ],
        _ => vec![],
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    val1: f64,
    val2: f64,
    level: f64,
) -> Point {
    if (val2 - val1).abs() < 1e-12 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0) as f32;

    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Connect unordered segments into continuous polylines.
pub fn connect_segments(segments: Vec<Segment>, level: &ContourLevel) -> Vec<Contour> {
    const EPSILON: f32 = 0.001;

    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        let mut points = vec![segments[start_idx].start, segments[start_idx].end];
        used[start_idx] = true;

        let mut changed = true;
        while changed {
            changed = false;
            let current_end = points[points.len() - 1];

            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if seg.start.distance(&current_end) < EPSILON {
                    points.push(seg.end);
                } else if seg.end.distance(&current_end) < EPSILON {
                    points.push(seg.start);
                } else {
                    continue;
                }
                used[i] = true;
                changed = true;
                break;
            }
        }

        let closed = points[0].distance(&points[points.len() - 1]) < EPSILON;
        contours.push(Contour {
            level: level.value,
            color: level.color,
            points,
            closed,
        });
    }

    contours
}

/// Trace every level of a field into polylines in grid-index space.
pub fn trace_contours(field: &ScalarField, fill: f64, levels: &[ContourLevel]) -> Vec<Contour> {
    levels
        .iter()
        .flat_map(|level| connect_segments(march_squares(field, fill, level.value), level))
        .collect()
}

/// Stroke contours onto a transparent `width x height` raster.
///
/// Contour points are in grid-index space of a `grid_width x grid_height`
/// field; index `i` maps to pixel `i * width / (grid_width - 1)` so the first
/// and last samples land on the raster edges.
pub fn render_contours_to_canvas(
    contours: &[Contour],
    grid_width: usize,
    grid_height: usize,
    width: usize,
    height: usize,
    line_width: f32,
) -> TileResult<RgbaRaster> {
    use tiny_skia::*;

    let mut pixmap = Pixmap::new(width as u32, height as u32).ok_or_else(|| {
        TileError::RenderError(format!("cannot allocate {}x{} canvas", width, height))
    })?;
    pixmap.fill(Color::TRANSPARENT);

    let sx = width as f32 / grid_width.saturating_sub(1).max(1) as f32;
    let sy = height as f32 / grid_height.saturating_sub(1).max(1) as f32;

    let mut stroke = Stroke::default();
    stroke.width = line_width;
    stroke.line_cap = LineCap::Round;
    stroke.line_join = LineJoin::Round;

    for contour in contours {
        if contour.points.len() < 2 || contour.color[3] == 0 {
            continue;
        }

        let mut paint = Paint::default();
        let [r, g, b, a] = contour.color;
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;

        let mut pb = PathBuilder::new();
        pb.move_to(contour.points[0].x * sx, contour.points[0].y * sy);
        for point in &contour.points[1..] {
            pb.line_to(point.x * sx, point.y * sy);
        }
        if contour.closed {
            pb.close();
        }

        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    // tiny-skia stores premultiplied pixels
    let mut pixels = Vec::with_capacity(width * height * 4);
    for p in pixmap.pixels() {
        let c = p.demultiply();
        pixels.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaRaster::from_pixels(width, height, pixels)
}

/// Trace and stroke `levels` of `field` onto a transparent raster the size of
/// the field.
pub fn render_contours(
    field: &ScalarField,
    fill: f64,
    levels: &[ContourLevel],
    line_width: f32,
) -> TileResult<RgbaRaster> {
    let (height, width) = field.shape();
    let contours = trace_contours(field, fill, levels);

    tracing::debug!(
        valid_count = field.valid_count(),
        num_levels = levels.len(),
        num_contours = contours.len(),
        total_points = contours.iter().map(|c| c.points.len()).sum::<usize>(),
        "Traced contours"
    );

    render_contours_to_canvas(&contours, width, height, width, height, line_width)
}
