pub mod detector;
pub mod errors;
pub mod frame_scheduler;
pub mod motion_predictor;
pub mod track_result;
pub mod track_state;
pub mod tracker_config;
pub mod tracking_stats;
