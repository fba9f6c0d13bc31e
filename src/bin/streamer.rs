//! # Audio Streamer - Client Entry Point
//!
//! One-shot CLI that streams a raw audio file to the capture server at
//! real-time cadence, emulating a live microphone feed:
//!
//! ```text
//! audio-streamer --input preamble.raw --encoding linear16 \
//!     --sample-rate 8000 --channels 1
//! ```
//!
//! Argument validation (file existence, encoding name, positive format
//! values) happens before any connection attempt; failures there are
//! configuration errors with a non-zero exit status.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use audio_capture_backend::audio::encoding::AudioEncoding;
use audio_capture_backend::streamer::{AudioStreamer, StreamerOptions};

/// Stream a raw audio file to the capture server in real time.
#[derive(Debug, Parser)]
#[command(name = "audio-streamer", version, about)]
struct Args {
    /// Path of the raw audio payload to stream
    #[arg(long, default_value = "preamble.raw")]
    input: PathBuf,

    /// Audio encoding: linear16, mulaw, flac, amr-nb, amr-wb, opus, or speex
    #[arg(long, default_value = "linear16")]
    encoding: String,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 8000)]
    sample_rate: u32,

    /// Number of audio channels
    #[arg(long, default_value_t = 1)]
    channels: u16,

    /// WebSocket endpoint of the capture server
    #[arg(long, default_value = "ws://localhost:5000")]
    url: String,

    /// Directory for audio received back over the connection
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let encoding = match args.encoding.parse::<AudioEncoding>() {
        Ok(encoding) => encoding,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let options = StreamerOptions {
        endpoint: args.url,
        input: args.input,
        encoding,
        sample_rate: args.sample_rate,
        channels: args.channels,
        output_dir: args.output_dir,
    };

    let streamer = match AudioStreamer::new(options) {
        Ok(streamer) => streamer,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match streamer.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_capture_backend=info,audio_streamer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
