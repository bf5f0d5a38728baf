use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::Parser;

use recognbot_core::audio::infrastructure::whisper_recognizer::WhisperRecognizerProvider;
use recognbot_core::pipeline::infrastructure::recognition_pool::RecognitionPool;
use recognbot_core::pipeline::job_observer::{JobObserver, LoggingJobObserver, ObserverSet};
use recognbot_core::pipeline::job_pipeline::JobPipeline;
use recognbot_core::pipeline::job_runner::{JobOutcome, JobRunner};
use recognbot_core::pipeline::job_status::{JobId, JobStatus};
use recognbot_core::pipeline::retry::{BackoffSchedule, RetryPolicy};
use recognbot_core::shared::config::{JobOptions, TranscriptionConfig};
use recognbot_core::shared::constants::{
    DEFAULT_LANGUAGE, DEFAULT_MAX_CHUNK_SECONDS, DEFAULT_MIN_CHUNK_SECONDS,
    DEFAULT_TARGET_CHUNK_SECONDS, DEFAULT_WHISPER_MODEL, UPLOAD_DIR_NAME,
};
use recognbot_core::transcript::domain::job_result::JobResult;
use recognbot_core::video::domain::source_media::stage_source;
use recognbot_core::video::infrastructure::ffmpeg_audio_extractor::FfmpegAudioExtractor;

/// Transcribe Russian speech in a video into a time-coded transcript.
#[derive(Parser, Debug)]
#[command(name = "recognbot")]
struct Cli {
    /// Input video file (mp4, mov, mkv, avi).
    input: PathBuf,

    /// Directory the transcript files are written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Target chunk duration in seconds.
    #[arg(long, env = "CHUNK_DURATION_SECONDS", default_value_t = DEFAULT_TARGET_CHUNK_SECONDS)]
    chunk_duration: u32,

    /// Shortest allowed chunk in seconds.
    #[arg(long, env = "MIN_CHUNK_SECONDS", default_value_t = DEFAULT_MIN_CHUNK_SECONDS)]
    min_chunk: u32,

    /// Longest allowed chunk in seconds.
    #[arg(long, env = "MAX_CHUNK_SECONDS", default_value_t = DEFAULT_MAX_CHUNK_SECONDS)]
    max_chunk: u32,

    /// Also produce an SRT subtitle file.
    #[arg(
        long,
        env = "ENABLE_SRT",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set
    )]
    srt: bool,

    /// Whisper model identifier: tiny, base, small, medium, large-v3.
    #[arg(long, env = "WHISPER_MODEL", default_value = DEFAULT_WHISPER_MODEL)]
    model: String,

    /// Directory searched for ggml model files before the user cache.
    #[arg(long, env = "WHISPER_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Scratch directory for job files.
    #[arg(long, env = "TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Number of chunks recognized in parallel.
    #[arg(long, env = "RECOGNITION_WORKERS", default_value = "2")]
    workers: usize,

    /// Per-chunk recognition timeout in seconds.
    #[arg(long, env = "RECOGNITION_TIMEOUT_SECONDS", default_value = "1200")]
    recognition_timeout: u64,

    /// Retries per chunk after a timeout or engine error.
    #[arg(long, env = "RECOGNITION_RETRIES", default_value = "2")]
    retries: u32,

    /// Language hint passed to the recognizer.
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Print progress as JSON lines on stdout instead of a status line.
    #[arg(long)]
    json_progress: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli);
    let options = build_options(&cli);
    options.validate()?;

    let staged = stage_source(&cli.input, &config.temp_root.join(UPLOAD_DIR_NAME))?;
    log::info!("Staged {} ({} bytes)", cli.input.display(), staged.byte_size());

    let pool = Arc::new(RecognitionPool::new(config.recognition_workers)?);
    let provider = Arc::new(WhisperRecognizerProvider::new(
        cli.model_dir.clone(),
        &config.language,
    ));
    let pipeline = JobPipeline::new(config, Box::new(FfmpegAudioExtractor), provider, pool);

    let logger = Arc::new(LoggingJobObserver::default());
    let observers = ObserverSet::new()
        .with(Arc::clone(&logger) as Arc<dyn JobObserver>)
        .with(progress_printer(cli.json_progress));
    let runner = JobRunner::new(pipeline, Arc::new(observers));

    let handle = runner.submit(staged.path(), options)?;
    let job = handle.id();
    let outcome = handle.wait();
    if !cli.json_progress {
        eprintln!();
    }
    if let Some(summary) = logger.summary_string(job) {
        log::info!("{summary}");
    }

    match outcome {
        JobOutcome::Done(result) => {
            write_artifacts(&result, &cli.output_dir)?;
            log::info!(
                "Transcript covers {:.0}s with {} gap(s)",
                result.covered_duration(),
                result.gap_count()
            );
            Ok(())
        }
        JobOutcome::Failed(failure) => {
            log::error!("Job {job}: {}", failure.detail);
            Err(failure.user_message().into())
        }
    }
}

fn build_config(cli: &Cli) -> TranscriptionConfig {
    let defaults = TranscriptionConfig::default();
    TranscriptionConfig {
        temp_root: cli.temp_dir.clone().unwrap_or(defaults.temp_root),
        recognition_workers: cli.workers,
        recognition_timeout: Duration::from_secs(cli.recognition_timeout),
        retry: RetryPolicy {
            max_retries: cli.retries,
            backoff: BackoffSchedule::default(),
        },
        language: cli.language.clone(),
        ..defaults
    }
}

fn build_options(cli: &Cli) -> JobOptions {
    JobOptions {
        target_chunk_seconds: cli.chunk_duration,
        min_chunk_seconds: cli.min_chunk,
        max_chunk_seconds: cli.max_chunk,
        enable_subtitles: cli.srt,
        recognition_model: cli.model.clone(),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.is_file() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.workers == 0 {
        return Err("Recognition workers must be at least 1".into());
    }
    if cli.recognition_timeout == 0 {
        return Err("Recognition timeout must be positive".into());
    }
    Ok(())
}

fn progress_printer(json: bool) -> Arc<dyn JobObserver> {
    if json {
        Arc::new(|job: JobId, status: &JobStatus| {
            let line = serde_json::json!({ "job": job, "status": status });
            println!("{line}");
        })
    } else {
        Arc::new(|_: JobId, status: &JobStatus| match status {
            JobStatus::Recognizing { completed, total } => {
                eprint!("\rRecognizing chunk {completed}/{total}   ");
            }
            other => eprint!("\r{:<32}", capitalize(other.label())),
        })
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_artifacts(result: &JobResult, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(output_dir)?;
    for artifact in result.artifacts() {
        let path = output_dir.join(&artifact.filename);
        fs::write(&path, &artifact.bytes)?;
        log::info!("Output written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("recognbot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_options_from_flags() {
        let cli = parse(&[
            "talk.mp4",
            "--chunk-duration",
            "450",
            "--srt",
            "off",
            "--model",
            "base",
        ]);
        let options = build_options(&cli);
        assert_eq!(options.target_chunk_seconds, 450);
        assert!(!options.enable_subtitles);
        assert_eq!(options.recognition_model, "base");
    }

    #[test]
    fn test_config_from_flags() {
        let cli = parse(&[
            "talk.mp4",
            "--temp-dir",
            "/tmp/jobs",
            "--workers",
            "4",
            "--recognition-timeout",
            "60",
            "--retries",
            "0",
        ]);
        let config = build_config(&cli);
        assert_eq!(config.temp_root, PathBuf::from("/tmp/jobs"));
        assert_eq!(config.recognition_workers, 4);
        assert_eq!(config.recognition_timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_input() {
        let cli = parse(&["/definitely/not/here.mp4"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_write_artifacts_creates_output_dir() {
        use chrono::Utc;
        use recognbot_core::transcript::domain::job_result::ChunkCoverage;

        let dir = tempfile::tempdir().unwrap();
        let result = JobResult::new(
            Vec::new(),
            vec![ChunkCoverage {
                chunk_index: 0,
                start: 0.0,
                end: 5.0,
                incomplete: false,
            }],
            true,
            Utc::now(),
        );
        let out = dir.path().join("out");

        write_artifacts(&result, &out).unwrap();

        assert!(out.join("transcription.txt").exists());
        assert!(out.join("transcription.srt").exists());
    }

    #[test]
    fn test_capitalize_label() {
        assert_eq!(capitalize("probing"), "Probing");
        assert_eq!(capitalize(""), "");
    }
}
