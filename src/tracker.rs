mod detection;
mod kalman_filter;
mod rect;
mod registry;
mod track_state;

pub use detection::Detection;
pub use kalman_filter::{KalmanEstimator, KalmanParams};
pub use rect::Rect;
pub use registry::{RenderRecord, TrackRegistry, TrackerConfig};
pub use track_state::{TeamLabel, TrackState, TrackStatus, UnknownPolicy};
