//! Maps a caption spec onto concrete ffmpeg filter parameters.
//!
//! All reels share one fixed portrait canvas. Sources of any aspect ratio are
//! scaled to fill it and center-cropped (never letterboxed), so percentage
//! positions always refer to the same pixel grid.

use crate::overlay::caption::CaptionSpec;

/// Output canvas width in pixels
pub const CANVAS_WIDTH: u32 = 1080;
/// Output canvas height in pixels
pub const CANVAS_HEIGHT: u32 = 1920;

/// Concrete encoder parameters for one caption overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayParams {
    /// Horizontal pixel anchor on the canvas; off-canvas values allowed
    pub x: i64,
    /// Vertical pixel anchor on the canvas; off-canvas values allowed
    pub y: i64,
    /// Caption text with filter-language metacharacters escaped
    pub escaped_text: String,
    pub font_size: f64,
    pub font_color: String,
    pub box_color: String,
    /// Overlay enable window start (seconds, encoder timeline)
    pub start_time: f64,
    /// Overlay enable window end (seconds, encoder timeline)
    pub end_time: f64,
}

impl OverlayParams {
    /// Map a caption onto the fixed canvas.
    ///
    /// Percentages are intentionally not clamped: out-of-range input yields
    /// off-canvas anchors and a partially or fully invisible caption.
    pub fn from_caption(caption: &CaptionSpec) -> Self {
        Self {
            x: (caption.x / 100.0 * f64::from(CANVAS_WIDTH)).round() as i64,
            y: (caption.y / 100.0 * f64::from(CANVAS_HEIGHT)).round() as i64,
            escaped_text: escape_drawtext_text(&caption.text),
            font_size: caption.font_size,
            font_color: caption.color.clone(),
            box_color: caption.background_color.clone(),
            start_time: caption.start_time,
            end_time: caption.end_time,
        }
    }

    /// Build the complete `-vf` filter chain for one render job: the caption
    /// drawtext, then scale-to-fill, then center-crop to the canvas.
    pub fn filter_chain(&self) -> String {
        format!(
            "drawtext=text='{}':fontsize={}:fontcolor={}:x={}:y={}\
             :enable='between(t,{},{})':box=1:boxcolor={}:boxborderw=10,\
             scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
            self.escaped_text,
            self.font_size,
            self.font_color,
            self.x,
            self.y,
            self.start_time,
            self.end_time,
            self.box_color,
            w = CANVAS_WIDTH,
            h = CANVAS_HEIGHT,
        )
    }
}

/// Escape characters that are syntactically significant inside a drawtext
/// value. Backslash goes first so already-emitted escapes are not re-escaped.
/// Single quotes would terminate the quoted value; colons would start the
/// next drawtext option.
pub fn escape_drawtext_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            ':' => escaped.push_str("\\:"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::caption::CaptionSpec;

    fn caption(text: &str, x: f64, y: f64, start: f64, end: f64) -> CaptionSpec {
        CaptionSpec {
            text: text.to_string(),
            x,
            y,
            start_time: start,
            end_time: end,
            font_size: 48.0,
            color: String::from("white"),
            background_color: String::from("black"),
            font_weight: String::new(),
            text_align: String::new(),
        }
    }

    #[test]
    fn origin_maps_to_zero_zero() {
        let params = OverlayParams::from_caption(&caption("a", 0.0, 0.0, 0.0, 1.0));
        assert_eq!((params.x, params.y), (0, 0));
    }

    #[test]
    fn full_percent_maps_to_canvas_extent() {
        let params = OverlayParams::from_caption(&caption("a", 100.0, 100.0, 0.0, 1.0));
        assert_eq!((params.x, params.y), (1080, 1920));
    }

    #[test]
    fn midpoint_maps_to_canvas_center() {
        let params = OverlayParams::from_caption(&caption("a", 50.0, 50.0, 0.0, 1.0));
        assert_eq!((params.x, params.y), (540, 960));
    }

    #[test]
    fn out_of_range_percentages_map_off_canvas() {
        let params = OverlayParams::from_caption(&caption("a", -10.0, 150.0, 0.0, 1.0));
        assert_eq!((params.x, params.y), (-108, 2880));
    }

    #[test]
    fn escapes_quotes_colons_and_backslashes() {
        assert_eq!(escape_drawtext_text("it's 5:00"), "it\\'s 5\\:00");
        assert_eq!(escape_drawtext_text("a\\b"), "a\\\\b");
        assert_eq!(escape_drawtext_text("plain text"), "plain text");
    }

    #[test]
    fn backslash_escaped_before_other_escapes() {
        // A literal backslash-quote pair must not collapse into one escape.
        assert_eq!(escape_drawtext_text("\\'"), "\\\\\\'");
    }

    #[test]
    fn filter_chain_carries_enable_window_and_geometry() {
        let params = OverlayParams::from_caption(&caption("hi", 50.0, 25.0, 2.0, 7.5));
        let chain = params.filter_chain();
        assert!(chain.contains("drawtext=text='hi'"));
        assert!(chain.contains(":x=540:y=480"));
        assert!(chain.contains("enable='between(t,2,7.5)'"));
        assert!(chain.contains("scale=1080:1920:force_original_aspect_ratio=increase"));
        assert!(chain.ends_with("crop=1080:1920"));
    }

    #[test]
    fn reversed_interval_is_accepted_verbatim() {
        // endTime < startTime is not rejected; the between() predicate is
        // simply never true, so the overlay never shows.
        let params = OverlayParams::from_caption(&caption("late", 0.0, 0.0, 9.0, 3.0));
        assert!(params.filter_chain().contains("between(t,9,3)"));
    }

    #[test]
    fn hostile_text_cannot_break_out_of_the_text_option() {
        let params = OverlayParams::from_caption(&caption(
            "':x=0:y=0,drawtext=text='pwn",
            10.0,
            10.0,
            0.0,
            1.0,
        ));
        let chain = params.filter_chain();
        // The injected quote and colons stay escaped inside the text value,
        // so the real geometry options are untouched.
        assert!(chain.contains("text='\\'\\:x=0\\:y=0,drawtext=text=\\'pwn'"));
        assert!(chain.contains(":x=108:y=192"));
    }

    #[test]
    fn empty_text_renders_blank_not_error() {
        let params = OverlayParams::from_caption(&caption("", 0.0, 0.0, 0.0, 1.0));
        assert!(params.filter_chain().contains("drawtext=text=''"));
    }
}
