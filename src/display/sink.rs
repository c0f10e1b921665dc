//! Display stage: SDL2 window on a dedicated thread, rendering whatever the
//! driver last placed in the next-frame cell.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use color_eyre::{eyre::eyre, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tracing::{error, info, warn};

use crate::capture::frame::Frame;
use crate::pipeline::cell::{FrameCell, StopFlag};
use crate::DisplayConfig;

/// Bounded wait while polling for the exit key, in milliseconds.
const POLL_TIMEOUT_MS: u32 = 5;

pub struct DisplaySink;

/// Live handle to a running (or already stopped) display stage.
pub struct DisplaySinkHandle {
    frames: Arc<FrameCell>,
    stopped: Arc<StopFlag>,
    worker: Option<JoinHandle<()>>,
}

impl DisplaySink {
    /// Spawn the render loop on its own thread, seeded with `initial` so the
    /// first render has valid data before the driver's first handoff.
    ///
    /// SDL2 types are not `Send`, so the context, window and canvas are all
    /// created and destroyed on the spawned thread.
    pub fn start(initial: Frame, config: DisplayConfig) -> DisplaySinkHandle {
        let frames = Arc::new(FrameCell::seeded(initial));
        let stopped = Arc::new(StopFlag::new());

        let worker = {
            let frames = Arc::clone(&frames);
            let stopped = Arc::clone(&stopped);
            thread::Builder::new()
                .name("display-sink".into())
                .spawn(move || {
                    if let Err(e) = render_loop(&frames, &stopped, &config) {
                        error!("display failed: {e}");
                    }
                    // surface (and window) destroyed here, exactly once
                    stopped.stop();
                })
        };

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("failed to spawn display thread: {e}");
                stopped.stop();
                None
            }
        };

        DisplaySinkHandle {
            frames,
            stopped,
            worker,
        }
    }
}

fn render_loop(frames: &FrameCell, stopped: &StopFlag, config: &DisplayConfig) -> Result<()> {
    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

    let seed = frames
        .latest()
        .ok_or_else(|| eyre!("display started without a seed frame"))?;
    let window = video_subsystem
        .window("liveview", seed.width(), seed.height())
        .position_centered()
        .build()?;
    let mut canvas = window.into_canvas().present_vsync().build()?;
    let texture_creator = canvas.texture_creator();
    let mut event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;

    let exit_key = Keycode::from_name(&config.exit_key.to_string());
    info!("render loop running, exit key '{}'", config.exit_key);

    while !stopped.is_stopped() {
        if let Some(frame) = frames.latest() {
            render_frame(&mut canvas, &texture_creator, &frame)?;
        }

        if let Some(event) = event_pump.wait_event_timeout(POLL_TIMEOUT_MS) {
            match event {
                Event::Quit { .. } => {
                    info!("window close requested");
                    stopped.stop();
                }
                Event::KeyDown {
                    keycode: Some(key), ..
                } if Some(key) == exit_key => {
                    info!("exit key pressed");
                    stopped.stop();
                }
                _ => {}
            }
        }
    }

    let (published, observed) = frames.stats();
    info!(published, observed, "render loop exited");
    Ok(())
}

fn render_frame(
    canvas: &mut Canvas<Window>,
    texture_creator: &TextureCreator<WindowContext>,
    frame: &Frame,
) -> Result<()> {
    let (width, height) = (frame.width(), frame.height());
    if frame.is_malformed() {
        // the driver only hands off well-formed frames; the seed might not be
        warn!("skipping malformed {}x{} frame", width, height);
        return Ok(());
    }

    if canvas.window().size() != (width, height) {
        canvas
            .window_mut()
            .set_size(width, height)
            .map_err(|e| eyre!(e))?;
    }

    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
        .map_err(|e| eyre!(e))?;
    texture
        .update(None, &frame.data, (width * 3) as usize)
        .map_err(|e| eyre!(e))?;

    canvas.clear();
    canvas.copy(&texture, None, None).map_err(|e| eyre!(e))?;
    canvas.present();
    Ok(())
}

impl DisplaySinkHandle {
    /// The driver publishes resized frames here; this is the only external
    /// write into the stage besides `stop()`.
    pub fn cell(&self) -> &Arc<FrameCell> {
        &self.frames
    }

    pub fn stop_flag(&self) -> &Arc<StopFlag> {
        &self.stopped
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_stopped()
    }

    /// Request stop. The window is destroyed by the render thread once it
    /// observes the flag.
    pub fn stop(&self) {
        self.stopped.stop();
    }

    /// Wait for the render loop to exit.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
