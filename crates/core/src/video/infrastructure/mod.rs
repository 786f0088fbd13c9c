pub mod ffmpeg_reader;
pub mod image_sequence_reader;
