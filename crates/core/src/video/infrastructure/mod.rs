pub mod annotated_image_writer;
pub mod image_sequence_reader;
