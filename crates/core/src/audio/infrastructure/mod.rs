pub mod wav_chunker;
pub mod wav_file;
pub mod whisper_recognizer;
