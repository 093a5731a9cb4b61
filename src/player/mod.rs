//! FFmpeg + rodio media engine.
//!
//! A decoder thread feeds RGBA frames through a bounded channel and audio
//! samples into a ring read by the rodio sink. The audio clock is the master:
//! [`VideoPlayer::update`] presents whichever frame is due at the clock's
//! position and turns progress into [`EngineEvent`]s.

mod audio;
mod clock;
mod decoder;
mod video;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use egui::{Color32, ColorImage, Context, TextureHandle, TextureOptions};
use log::{debug, info, warn};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::engine::{EngineEvent, EngineState, MediaEngine, MediaStatus, ScaledVolume};
use crate::error::MediaResult;
use audio::{AudioSource, SampleRing};
use clock::{AudioClock, WallClockDriver};
use decoder::{
    probe_media, start_decoder_thread, DecodedVideoFrame, DecoderCommand, DecoderContext, MediaInfo,
};
use video::VideoFrameQueue;

const FRAME_QUEUE_LEN: usize = 30;
/// Within this distance of the duration with no frames left counts as the end
const END_SLACK_MS: u64 = 100;

/// Default audio device, kept alive for the player's lifetime.
struct AudioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

fn open_audio_output() -> MediaResult<AudioOutput> {
    let (stream, handle) = OutputStream::try_default()?;
    Ok(AudioOutput {
        _stream: stream,
        handle,
    })
}

/// Decoder thread and buffers for one opened file.
struct MediaSession {
    info: MediaInfo,
    decoder_handle: Option<JoinHandle<()>>,
    commands: Sender<DecoderCommand>,
    stop_flag: Arc<AtomicBool>,
    sink: Option<Sink>,
    clock: AudioClock,
    /// Present when there is no sink to drive the clock
    wall_clock: Option<WallClockDriver>,
    frame_queue: VideoFrameQueue,
    texture: TextureHandle,
    /// Set while waiting for the first frame after a seek
    seek_target: Option<u64>,
    /// Buffered is reported once the pending seek frame is on screen
    buffering: bool,
}

impl MediaSession {
    fn seek(&mut self, ms: u64) {
        self.seek_target = Some(ms);
        // Hold audio so the clock doesn't run ahead of the new frame
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        if let Some(driver) = self.wall_clock.as_mut() {
            driver.reset();
        }
        self.frame_queue.clear();
        self.clock.set_position_ms(ms);
        let _ = self.commands.send(DecoderCommand::SeekMs(ms));
        // Decode at least one frame even when paused
        let _ = self.commands.send(DecoderCommand::Resume);
    }

    fn show(&mut self, frame: &DecodedVideoFrame) {
        let image = ColorImage::from_rgba_unmultiplied(
            [frame.width as usize, frame.height as usize],
            &frame.rgba,
        );
        self.texture.set(image, TextureOptions::LINEAR);
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let _ = self.commands.try_send(DecoderCommand::Shutdown);
        if let Some(handle) = self.decoder_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Media engine rendering into an egui texture.
pub struct VideoPlayer {
    ctx: Context,
    output: Option<AudioOutput>,
    volume: f32,
    state: EngineState,
    session: Option<MediaSession>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    last_position_ms: Option<u64>,
}

impl VideoPlayer {
    /// Create an idle player. A missing audio device is reported as an
    /// engine error and playback continues silently.
    pub fn new(ctx: Context) -> Self {
        let (events_tx, events_rx) = unbounded();

        let output = match open_audio_output() {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("No audio output: {e}");
                let _ = events_tx.send(EngineEvent::Error(format!("no audio output: {e}")));
                None
            }
        };

        Self {
            ctx,
            output,
            volume: 0.5,
            state: EngineState::Stopped,
            session: None,
            events_tx,
            events_rx,
            last_position_ms: None,
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    fn set_state(&mut self, state: EngineState) {
        if self.state != state {
            self.state = state;
            self.emit(EngineEvent::PlaybackStateChanged(state));
        }
    }

    fn load(&self, path: &Path) -> MediaResult<MediaSession> {
        let info = probe_media(path)?;
        debug!("Probed {}: {info:?}", path.display());

        let clock = AudioClock::new(info.sample_rate, info.channels);
        // About one second of interleaved samples
        let ring = SampleRing::new(info.sample_rate as usize * info.channels as usize * 2);

        let sink = match &self.output {
            Some(output) => {
                let sink = Sink::try_new(&output.handle)?;
                sink.append(AudioSource::new(ring.clone(), clock.clone()));
                sink.pause();
                sink.set_volume(self.volume);
                Some(sink)
            }
            None => None,
        };

        let (video_sender, video_receiver) = bounded(FRAME_QUEUE_LEN);
        let (commands, command_receiver) = bounded(16);
        let stop_flag = Arc::new(AtomicBool::new(false));

        let decoder_handle = start_decoder_thread(DecoderContext {
            path: path.to_path_buf(),
            video_sender,
            audio_ring: ring,
            commands: command_receiver,
            events: self.events_tx.clone(),
            clock: clock.clone(),
            stop_flag: stop_flag.clone(),
        })?;

        let texture = self.ctx.load_texture(
            "video_frame",
            ColorImage::new([info.width as usize, info.height as usize], Color32::BLACK),
            TextureOptions::LINEAR,
        );

        let wall_clock = sink.is_none().then(WallClockDriver::default);

        let mut session = MediaSession {
            info,
            decoder_handle: Some(decoder_handle),
            commands,
            stop_flag,
            sink,
            clock,
            wall_clock,
            frame_queue: VideoFrameQueue::new(video_receiver, FRAME_QUEUE_LEN),
            texture,
            seek_target: None,
            buffering: true,
        };
        session.seek(0);
        Ok(session)
    }

    /// Present due frames and publish progress. Call once per UI frame.
    pub fn update(&mut self) {
        let playing = self.state == EngineState::Playing;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(target) = session.seek_target {
            if let Some(frame) = session.frame_queue.take_seek_frame(target) {
                session.show(&frame);
                session.clock.set_position_ms(frame.pts_ms);
                session.seek_target = None;
                if self.last_position_ms != Some(frame.pts_ms) {
                    self.last_position_ms = Some(frame.pts_ms);
                    let _ = self.events_tx.send(EngineEvent::PositionChanged(frame.pts_ms));
                }
                if playing {
                    if let Some(sink) = &session.sink {
                        sink.play();
                    }
                } else {
                    let _ = session.commands.send(DecoderCommand::Pause);
                }
                if session.buffering {
                    session.buffering = false;
                    let _ = self
                        .events_tx
                        .send(EngineEvent::MediaStatusChanged(MediaStatus::Buffered));
                }
            }
            self.ctx.request_repaint();
            return;
        }

        if !playing {
            if let Some(driver) = session.wall_clock.as_mut() {
                driver.reset();
            }
            return;
        }

        if let Some(driver) = session.wall_clock.as_mut() {
            driver.tick(&session.clock, Instant::now());
        }
        let now = session.clock.position_ms();
        if let Some(frame) = session.frame_queue.take_due_frame(now) {
            session.show(&frame);
        }

        let duration = session.info.duration_ms;
        let position = if duration > 0 { now.min(duration) } else { now };
        let ended =
            session.frame_queue.is_drained() && duration > 0 && now + END_SLACK_MS >= duration;

        if self.last_position_ms != Some(position) {
            self.last_position_ms = Some(position);
            self.emit(EngineEvent::PositionChanged(position));
        }

        if ended {
            info!("End of media");
            self.emit(EngineEvent::MediaStatusChanged(MediaStatus::EndOfMedia));
            self.stop();
        }

        self.ctx.request_repaint();
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.session.as_ref().map(|s| &s.texture)
    }

    /// Width and height of the current video, if one is loaded.
    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|s| (s.info.width, s.info.height))
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == EngineState::Playing
    }
}

impl MediaEngine for VideoPlayer {
    fn open(&mut self, path: &Path) {
        // Dropping the session joins its decoder thread
        self.session = None;
        self.last_position_ms = None;
        self.set_state(EngineState::Stopped);

        self.emit(EngineEvent::MediaStatusChanged(MediaStatus::Loading));
        match self.load(path) {
            Ok(session) => {
                info!("Loaded {} ({} ms)", path.display(), session.info.duration_ms);
                self.emit(EngineEvent::DurationChanged(session.info.duration_ms));
                self.emit(EngineEvent::MediaStatusChanged(MediaStatus::Loaded));
                self.session = Some(session);
            }
            Err(e) => {
                warn!("Failed to open {}: {e}", path.display());
                self.emit(EngineEvent::MediaStatusChanged(MediaStatus::Invalid));
            }
        }
    }

    fn play(&mut self) {
        let Some(session) = self.session.as_ref() else {
            debug!("play: nothing loaded");
            return;
        };
        if self.state == EngineState::Playing {
            return;
        }
        if session.seek_target.is_none() {
            if let Some(sink) = &session.sink {
                sink.play();
            }
        }
        let _ = session.commands.send(DecoderCommand::Resume);
        self.set_state(EngineState::Playing);
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if self.state != EngineState::Playing {
            return;
        }
        if let Some(sink) = &session.sink {
            sink.pause();
        }
        let _ = session.commands.send(DecoderCommand::Pause);
        self.set_state(EngineState::Paused);
    }

    fn stop(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.state == EngineState::Stopped {
            return;
        }
        session.seek(0);
        self.last_position_ms = Some(0);
        self.set_state(EngineState::Stopped);
    }

    fn set_position(&mut self, ms: u64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let duration = session.info.duration_ms;
        let ms = if duration > 0 { ms.min(duration) } else { ms };
        session.seek(ms);
        self.last_position_ms = None;
        if self.state == EngineState::Playing && !session.buffering {
            session.buffering = true;
            self.emit(EngineEvent::MediaStatusChanged(MediaStatus::Buffering));
        }
    }

    fn set_volume(&mut self, volume: ScaledVolume) {
        self.volume = volume.as_unit();
        if let Some(sink) = self.session.as_ref().and_then(|s| s.sink.as_ref()) {
            sink.set_volume(self.volume);
        }
    }

    fn next_event(&mut self) -> Option<EngineEvent> {
        self.events_rx.try_recv().ok()
    }
}
