use serde::{Deserialize, Serialize};

/// One text overlay as submitted by the editing UI.
///
/// Positions are percentages of the output canvas, not pixels, and arrive
/// unclamped: values outside [0,100] place the caption partially or fully
/// off-canvas, which is accepted behavior rather than an error. Timing is in
/// source-timeline seconds; a reversed interval is accepted and simply never
/// shows the caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSpec {
    /// Caption text; empty renders a blank box
    #[serde(default)]
    pub text: String,
    /// Horizontal anchor as a percentage of canvas width
    #[serde(default)]
    pub x: f64,
    /// Vertical anchor as a percentage of canvas height
    #[serde(default)]
    pub y: f64,
    /// Overlay becomes visible at this time (seconds)
    #[serde(default)]
    pub start_time: f64,
    /// Overlay disappears after this time (seconds)
    #[serde(default)]
    pub end_time: f64,
    /// Font size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Text color, any ffmpeg color expression ("white", "#ffffff", ...)
    #[serde(default = "default_color")]
    pub color: String,
    /// Fill color of the box behind the text
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Styling only; round-tripped for the editor, no effect on geometry
    #[serde(default)]
    pub font_weight: String,
    /// Styling only; round-tripped for the editor, no effect on geometry
    #[serde(default)]
    pub text_align: String,
}

fn default_font_size() -> f64 {
    48.0
}

fn default_color() -> String {
    String::from("white")
}

fn default_background_color() -> String {
    String::from("black")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_fields() {
        let json = r##"{
            "text": "Hello",
            "x": 50,
            "y": 80,
            "startTime": 1.5,
            "endTime": 4.0,
            "fontSize": 36,
            "color": "#ffcc00",
            "backgroundColor": "black",
            "fontWeight": "bold",
            "textAlign": "center"
        }"##;

        let caption: CaptionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(caption.text, "Hello");
        assert_eq!(caption.x, 50.0);
        assert_eq!(caption.y, 80.0);
        assert_eq!(caption.start_time, 1.5);
        assert_eq!(caption.end_time, 4.0);
        assert_eq!(caption.font_size, 36.0);
        assert_eq!(caption.font_weight, "bold");
        assert_eq!(caption.text_align, "center");
    }

    #[test]
    fn missing_styling_fields_fall_back_to_defaults() {
        let json = r#"{"text": "minimal", "x": 10, "y": 20, "startTime": 0, "endTime": 3}"#;

        let caption: CaptionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(caption.font_size, 48.0);
        assert_eq!(caption.color, "white");
        assert_eq!(caption.background_color, "black");
        assert!(caption.font_weight.is_empty());
    }
}
