use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

use voxdub::config::{
    DEFAULT_OUTPUT_DIR, DEFAULT_RECORD_DURATION_SECS, DEFAULT_SOURCE_LANGUAGE,
    DEFAULT_TARGET_LANGUAGE, JobConfig,
};
use voxdub::logging;
use voxdub::models::{Job, MediaSource};
use voxdub::pipeline::Pipeline;
use voxdub::tts::TtsEngine;

#[derive(Parser)]
#[command(
    name = "voxdub",
    version,
    about = "Dub videos into another language with AI voices"
)]
struct Cli {
    /// Video URL or local file to dub
    #[arg(value_name = "VIDEO")]
    video: String,

    /// Source language code
    #[arg(short = 's', long = "source", value_name = "LANG", default_value = DEFAULT_SOURCE_LANGUAGE)]
    source_lang: String,

    /// Target language code
    #[arg(short = 't', long = "target", value_name = "LANG", default_value = DEFAULT_TARGET_LANGUAGE)]
    target_lang: String,

    /// TTS engine: gtts, bark, coqui or voice_clone
    #[arg(long = "tts", default_value = "gtts", value_parser = parse_engine)]
    tts: TtsEngine,

    /// Reference audio file for voice cloning
    #[arg(long, value_name = "FILE", conflicts_with = "record")]
    reference_audio: Option<PathBuf>,

    /// Record the reference sample from the default microphone
    #[arg(short = 'r', long)]
    record: bool,

    /// Duration of the reference recording in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_RECORD_DURATION_SECS)]
    record_duration: u32,

    /// Directory for job artifacts
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,
}

fn parse_engine(raw: &str) -> Result<TtsEngine, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logger();
    let cli = Cli::parse();

    let config = JobConfig::from_env();
    let job = Job {
        source: MediaSource::parse(&cli.video),
        source_language: cli.source_lang,
        target_language: cli.target_lang,
        engine: cli.tts,
        reference_audio: cli.reference_audio,
        record_duration_secs: cli.record.then_some(cli.record_duration),
        work_dir: cli.output_dir,
    };

    info!(
        "Starting dubbing job: {} -> {} ({} engine)",
        job.source_language, job.target_language, job.engine
    );

    let pipeline = Pipeline::new(config);
    match pipeline.run(&job).await {
        Ok(outcome) => {
            info!("Dubbed audio saved to {}", outcome.dubbed_audio.display());
            info!("Dubbed video saved to {}", outcome.dubbed_video.display());
            println!("{}", outcome.dubbed_video.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Dubbing failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
