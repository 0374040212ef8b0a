pub mod caption;
pub mod mapper;

pub use caption::CaptionSpec;
pub use mapper::{OverlayParams, CANVAS_HEIGHT, CANVAS_WIDTH};
