pub mod job_result;
pub mod timecode;
pub mod transcript_assembler;
pub mod transcript_entry;
pub mod transcript_renderer;
