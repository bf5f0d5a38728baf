pub mod audio_extractor;
pub mod normalized_audio;
pub mod source_media;
