pub mod audio_chunk;
pub mod audio_segment;
pub mod chunk_plan;
pub mod recognized_segment;
pub mod speech_recognizer;
