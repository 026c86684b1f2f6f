use log::info;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::cell::Cell;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};
use crate::gameplay::clock::{TrackClock, WallClock};

/// Plays a track through the default output device and exposes its position as track time.
pub struct AudioPlayback {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    timer: PlaybackTimer,
}

impl AudioPlayback {
    pub fn new() -> Result<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| Error::Playback(e.to_string()))?;

        Ok(Self {
            stream,
            stream_handle,
            sink: None,
            timer: PlaybackTimer::default(),
        })
    }

    /// Queue a file paused at position zero, replacing whatever was loaded.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file).map_err(|e| Error::Decode(e.to_string()))?;
        let sink = Sink::try_new(&self.stream_handle).map_err(|e| Error::Playback(e.to_string()))?;
        sink.append(source);
        sink.pause();

        info!("Loaded audio file for playback: {:?}", path.as_ref());
        self.sink = Some(sink);
        self.timer.reset();
        Ok(())
    }

    pub fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
            self.timer.start();
            info!("Audio playback started");
        }
    }

    pub fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
            self.timer.pause();
            info!("Audio playback paused");
        }
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            info!("Audio playback stopped");
        }
        self.timer.reset();
    }

    pub fn set_volume(&self, volume: f32) {
        if let Some(sink) = &self.sink {
            sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().map_or(false, |sink| !sink.is_paused() && !sink.empty())
    }

    pub fn is_finished(&self) -> bool {
        self.sink.as_ref().map_or(true, |sink| sink.empty())
    }
}

impl TrackClock for AudioPlayback {
    fn track_time(&self) -> f64 {
        self.timer.position(self.is_finished())
    }
}

/// Wall time accumulated while playing. The reading freezes the first time it is taken
/// after the source has drained.
#[derive(Debug, Default)]
struct PlaybackTimer {
    clock: WallClock,
    drained_at: Cell<Option<f64>>,
}

impl PlaybackTimer {
    fn start(&mut self) {
        if self.drained_at.get().is_none() {
            self.clock.start();
        }
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.drained_at.set(None);
    }

    fn position(&self, drained: bool) -> f64 {
        if let Some(frozen) = self.drained_at.get() {
            return frozen;
        }
        let position = self.clock.track_time();
        if drained && self.clock.is_running() {
            self.drained_at.set(Some(position));
        }
        position
    }
}
