//! liveview: threaded video capture/display pipeline for smooth playback

use std::sync::Arc;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};

use liveview::capture::{source, Frame, SourceFeed, SourceId};
use liveview::display::DisplaySink;
use liveview::pipeline::resize::resize;
use liveview::pipeline::Driver;
use liveview::{Config, DisplayConfig, PipelineConfig, SourceConfig};

/// Real-time video viewer. Capture and display each run on their own thread
/// so a slow display never stalls the camera; the newest frame always wins.
#[derive(Debug, Parser)]
#[command(name = "liveview", version)]
struct Cli {
    /// Video device index, file path, or stream URL
    #[arg(short, long, default_value = "0")]
    source: String,

    /// Width frames are resized to before display
    #[arg(long, default_value_t = 1080)]
    width: u32,

    /// Key that requests graceful shutdown
    #[arg(long, default_value_t = 'q')]
    exit_key: char,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liveview=info".into()),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let cli = Cli::parse();
    let config = Config {
        source: SourceConfig {
            id: SourceId::resolve(&cli.source),
        },
        display: DisplayConfig {
            exit_key: cli.exit_key,
        },
        pipeline: PipelineConfig {
            target_width: cli.width,
        },
    };

    info!("opening video source: {}", config.source.id);

    // a failed open is terminal for the run and reaches the exit status
    let feed = match source::open(&config.source.id) {
        Ok(src) => SourceFeed::start(src),
        Err(e) => {
            return Err(eyre!(e).wrap_err(format!(
                "cannot open video source {}",
                config.source.id
            )));
        }
    };

    // seed the display with the first captured frame, already at target width
    let seed = feed
        .latest()
        .and_then(|first| resize(&first, config.pipeline.target_width).ok())
        .unwrap_or_else(|| {
            warn!("no usable first frame, seeding display with a blank");
            Frame::blank(
                config.pipeline.target_width,
                config.pipeline.target_width * 9 / 16,
            )
        });

    let sink = DisplaySink::start(seed, config.display.clone());
    let mut driver = Driver::connect(&feed, &sink, config.pipeline.target_width);

    // Ctrl-C behaves like the exit key: stop the sink, let the driver
    // propagate shutdown to the capture side
    {
        let stop = Arc::clone(sink.stop_flag());
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                stop.stop();
            }
        });
    }

    driver.run().await;

    sink.join();
    feed.join();

    info!("liveview shut down");
    Ok(())
}
