pub mod domain;
pub mod infrastructure;
pub mod tracking_engine;
