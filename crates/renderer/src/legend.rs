//! Vertical color-scale legend.
//!
//! The legend is a 150x375 opaque image: a color bar on the left third with
//! nicely rounded tick values beside it and the title running bottom to top
//! along the right edge. Text is set in an embedded DejaVu Sans Mono. The
//! title also travels with the PNG as a `Title` text chunk.

use crate::colormap::ColorRamp;
use crate::raster::RgbaRaster;
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use ocean_common::{ColorScale, TileError, TileResult};
use rusttype::{point, Font, Scale};

pub const LEGEND_WIDTH: usize = 150;
pub const LEGEND_HEIGHT: usize = 375;

/// Embedded font data - DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Bar placement as fractions of the image: left, bottom, width, height.
const BAR_RECT: [f32; 4] = [0.05, 0.05, 0.25, 0.9];

const MAX_TICK_INTERVALS: usize = 7;
const TICK_LENGTH: f32 = 5.0;
const TICK_LABEL_GAP: i32 = 4;
const TICK_FONT_SIZE: f32 = 11.0;
const TITLE_FONT_SIZE: f32 = 12.0;
/// Gap between the title column and the right edge.
const TITLE_MARGIN: i32 = 6;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A rendered legend and the title that belongs with it.
#[derive(Debug, Clone)]
pub struct Legend {
    pub raster: RgbaRaster,
    pub title: String,
}

/// Build the legend title: `"<Name> (<unit>)"`.
///
/// Kelvin is shown as Celsius. Anomalies get an " Anomaly" suffix. For two
/// component (vector) variables the directional words are dropped so the
/// title names the magnitude. The name is title-cased.
pub fn legend_title(name: &str, unit: &str, components: usize, anomaly: bool) -> String {
    let unit = if unit.starts_with("Kelvin") {
        "Celsius"
    } else {
        unit
    };

    let mut name = name.to_string();
    if anomaly {
        name = format!("{} Anomaly", name);
    }
    if components == 2 {
        name = strip_directional_words(&name);
    }

    format!("{} ({})", title_case(&name), unit)
}

fn strip_directional_words(name: &str) -> String {
    const TOKENS: [&str; 6] = [" x ", " y ", "zonal ", "meridional ", "northward ", "eastward "];

    let mut out = name.to_string();
    loop {
        let lowered = out.to_lowercase();
        let hit = TOKENS
            .iter()
            .filter_map(|t| lowered.find(t).map(|pos| (pos, t.len())))
            .min_by_key(|(pos, _)| *pos);
        match hit {
            // Lowercasing ASCII tokens keeps byte offsets aligned.
            Some((pos, len)) if out.is_char_boundary(pos) && out.is_char_boundary(pos + len) => {
                out.replace_range(pos..pos + len, " ");
            }
            _ => break,
        }
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut prev_space = false;
    for ch in out.chars() {
        if ch == ' ' {
            if !prev_space {
                collapsed.push(ch);
            }
            prev_space = true;
        } else {
            collapsed.push(ch);
            prev_space = false;
        }
    }
    collapsed.trim().to_string()
}

/// Uppercase the first letter of every word and lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Rounded tick positions within `[min, max]`, stepping by 1, 2, 2.5 or 5
/// times a power of ten.
pub fn nice_ticks(scale: &ColorScale) -> (Vec<f64>, f64) {
    let raw = scale.range() / MAX_TICK_INTERVALS as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw * (1.0 - 1e-9))
        .unwrap_or(10.0 * magnitude);

    let eps = step * 1e-9;
    let first = (scale.min / step - 1e-9).ceil();
    let mut ticks = Vec::new();
    // step >= range / MAX_TICK_INTERVALS, so at most MAX_TICK_INTERVALS + 1 ticks fit
    for i in 0..=MAX_TICK_INTERVALS + 1 {
        let mut value = (first + i as f64) * step;
        if !value.is_finite() || value > scale.max + eps {
            break;
        }
        if value.abs() < eps {
            value = 0.0;
        }
        ticks.push(value);
    }
    (ticks, step)
}

/// Format a tick with just enough decimals to distinguish multiples of `step`.
pub fn format_tick(value: f64, step: f64) -> String {
    let mut decimals = 0usize;
    while decimals < 6 {
        let scaled = step * 10f64.powi(decimals as i32);
        if (scaled - scaled.round()).abs() < 1e-6 * scaled.abs().max(1.0) {
            break;
        }
        decimals += 1;
    }
    format!("{:.*}", decimals, value)
}

/// Render the legend bar for `scale` through `ramp`, titled `title`.
pub fn render_scale(scale: &ColorScale, ramp: &ColorRamp, title: &str) -> TileResult<Legend> {
    let font = Font::try_from_bytes(FONT_DATA)
        .ok_or_else(|| TileError::RenderError("cannot load legend font".to_string()))?;

    let mut img = RgbaImage::from_pixel(LEGEND_WIDTH as u32, LEGEND_HEIGHT as u32, PAPER);

    let w = LEGEND_WIDTH as f32;
    let h = LEGEND_HEIGHT as f32;
    let left = (BAR_RECT[0] * w).round() as i32;
    let bar_w = (BAR_RECT[2] * w).round() as i32;
    let bar_h = (BAR_RECT[3] * h).round() as i32;
    let top = (h - (BAR_RECT[1] + BAR_RECT[3]) * h).round() as i32;
    let bottom = top + bar_h;
    let right = left + bar_w;

    // Bar body, one row at a time from the top (max) down to the bottom (min)
    for i in 0..bar_h {
        let t = 1.0 - ((i as f64 + 0.5) / bar_h as f64);
        draw_filled_rect_mut(
            &mut img,
            Rect::at(left, top + i).of_size(bar_w as u32, 1),
            over_paper(ramp.rgba8(t)),
        );
    }
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(left, top).of_size(bar_w as u32, bar_h as u32),
        INK,
    );

    let tick_scale = Scale::uniform(TICK_FONT_SIZE);
    let (ticks, step) = nice_ticks(scale);
    for value in ticks {
        let y = bottom as f32 - (scale.normalize(value) as f32) * bar_h as f32;
        draw_line_segment_mut(
            &mut img,
            (right as f32, y),
            (right as f32 + TICK_LENGTH, y),
            INK,
        );

        let label = format_tick(value, step);
        let (_, text_h) = text_extent(&font, tick_scale, &label);
        draw_text_mut(
            &mut img,
            INK,
            right + TICK_LENGTH as i32 + TICK_LABEL_GAP,
            y.round() as i32 - text_h / 2,
            tick_scale,
            &font,
            &label,
        );
    }

    draw_title(&mut img, &font, title, top, bar_h);

    Ok(Legend {
        raster: RgbaRaster::from_pixels(LEGEND_WIDTH, LEGEND_HEIGHT, img.into_raw())?,
        title: title.to_string(),
    })
}

/// Set `title` horizontally, turn it to read bottom to top and center it on
/// the bar along the right edge. Long titles shrink to fit the bar height.
fn draw_title(img: &mut RgbaImage, font: &Font, title: &str, top: i32, bar_h: i32) {
    if title.trim().is_empty() {
        return;
    }

    let mut size = TITLE_FONT_SIZE;
    let (width, _) = text_extent(font, Scale::uniform(size), title);
    if width > bar_h {
        size *= bar_h as f32 / width as f32;
    }
    let scale = Scale::uniform(size);
    let (text_w, text_h) = text_extent(font, scale, title);

    let mut label = RgbaImage::new(text_w.max(1) as u32, text_h.max(1) as u32);
    draw_text_mut(&mut label, INK, 0, 0, scale, font, title);
    let label = imageops::rotate270(&label);

    let x = LEGEND_WIDTH as i64 - TITLE_MARGIN as i64 - label.width() as i64;
    let y = top as i64 + (bar_h as i64 - label.height() as i64) / 2;
    imageops::overlay(img, &label, x, y);
}

/// Advance width and line height of `text`, in whole pixels.
fn text_extent(font: &Font, scale: Scale, text: &str) -> (i32, i32) {
    let v = font.v_metrics(scale);
    let width = font
        .layout(text, scale, point(0.0, v.ascent))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);
    (width.ceil() as i32, (v.ascent - v.descent).ceil() as i32)
}

/// Blend a ramp color over the white legend background.
fn over_paper([r, g, b, a]: [u8; 4]) -> Rgba<u8> {
    let alpha = a as f32 / 255.0;
    let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
    Rgba([blend(r), blend(g), blend(b), 255])
}
