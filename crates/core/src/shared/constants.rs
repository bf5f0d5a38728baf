/// Whisper expects 16 kHz mono input.
pub const TARGET_SAMPLE_RATE: u32 = 16000;
pub const TARGET_CHANNELS: u16 = 1;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi"];

pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_WHISPER_MODEL: &str = "small";
pub const WHISPER_MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

pub const DEFAULT_TARGET_CHUNK_SECONDS: u32 = 600;
pub const DEFAULT_MIN_CHUNK_SECONDS: u32 = 300;
pub const DEFAULT_MAX_CHUNK_SECONDS: u32 = 600;

pub const NORMALIZED_AUDIO_FILENAME: &str = "audio.wav";
pub const CHUNK_DIR_NAME: &str = "chunks";
pub const UPLOAD_DIR_NAME: &str = "uploads";

pub const TRANSCRIPT_FILENAME: &str = "transcription.txt";
pub const SUBTITLE_FILENAME: &str = "transcription.srt";

/// Placeholder text for a chunk whose recognition was given up on.
pub const GAP_MARKER: &str = "[gap]";
