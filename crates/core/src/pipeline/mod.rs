pub mod infrastructure;
pub mod pipeline_logger;
pub mod track_sequence_use_case;
