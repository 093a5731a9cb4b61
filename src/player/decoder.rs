use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame::{Audio as AudioFrame, Video as VideoFrame};
use ffmpeg_next::media::Type;
use ffmpeg_next::software::resampling::Context as ResamplerContext;
use ffmpeg_next::software::scaling::{Context as ScalerContext, Flags};
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;
use ffmpeg_next::{codec, Packet, Rational};
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::audio::SampleRing;
use super::clock::AudioClock;
use crate::engine::EngineEvent;
use crate::error::{MediaError, MediaResult};

const IDLE_WAIT: Duration = Duration::from_millis(10);
/// Layout every audio stream is resampled to
const OUTPUT_LAYOUT: ChannelLayout = ChannelLayout::STEREO;

/// RGBA frame ready for upload.
pub struct DecodedVideoFrame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pts_ms: u64,
}

/// Commands sent to the decoder thread
pub enum DecoderCommand {
    SeekMs(u64),
    Pause,
    Resume,
    Shutdown,
}

/// Stream properties read before decoding starts.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
    pub sample_rate: u32,
    /// Channels in the resampled output, not in the source stream
    pub channels: u16,
}

/// Rate and channel count of the samples the decoder pushes for a source
/// stream running at `source_rate`.
pub fn output_audio_format(source_rate: u32) -> (u32, u16) {
    (source_rate, OUTPUT_LAYOUT.channels() as u16)
}

/// Open `path` and read stream properties without decoding.
pub fn probe_media(path: &Path) -> MediaResult<MediaInfo> {
    let input = ffmpeg_next::format::input(&path)?;

    let video_stream = input
        .streams()
        .best(Type::Video)
        .ok_or(MediaError::NoVideoStream)?;
    let video_decoder = codec::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let (sample_rate, channels) = match input.streams().best(Type::Audio) {
        Some(audio) => {
            let decoder = codec::Context::from_parameters(audio.parameters())?
                .decoder()
                .audio()?;
            output_audio_format(decoder.rate())
        }
        // Silent file, the clock still needs a rate to run at
        None => output_audio_format(44_100),
    };

    // Live or broken containers report no duration
    let duration_ms = u64::try_from(input.duration())
        .map(|us| us * 1000 / ffmpeg_next::ffi::AV_TIME_BASE as u64)
        .unwrap_or(0);

    Ok(MediaInfo {
        width: video_decoder.width(),
        height: video_decoder.height(),
        duration_ms,
        sample_rate,
        channels,
    })
}

/// Everything the decoder thread owns.
pub struct DecoderContext {
    pub path: PathBuf,
    pub video_sender: Sender<DecodedVideoFrame>,
    pub audio_ring: Arc<SampleRing>,
    pub commands: Receiver<DecoderCommand>,
    pub events: Sender<EngineEvent>,
    pub clock: AudioClock,
    pub stop_flag: Arc<AtomicBool>,
}

/// Spawn the decoder thread. Failures inside it are logged and reported as
/// [`EngineEvent::Error`].
pub fn start_decoder_thread(ctx: DecoderContext) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("decoder".into())
        .spawn(move || {
            let events = ctx.events.clone();
            if let Err(e) = decode_loop(ctx) {
                error!("Decoder error: {e:#}");
                let _ = events.send(EngineEvent::Error(format!("{e:#}")));
            }
        })
}

/// What the loop should do after draining commands.
enum Flow {
    Continue,
    Seek(u64),
    Exit,
}

struct DecoderState {
    paused: bool,
    pending_seek: Option<u64>,
}

impl DecoderState {
    fn apply(&mut self, command: DecoderCommand, clock: &AudioClock) -> Flow {
        match command {
            DecoderCommand::Shutdown => return Flow::Exit,
            DecoderCommand::Pause => {
                self.paused = true;
                clock.pause();
            }
            DecoderCommand::Resume => {
                self.paused = false;
                clock.resume();
            }
            DecoderCommand::SeekMs(ms) => return Flow::Seek(ms),
        }
        Flow::Continue
    }

    /// Handle every queued command. Returns false when the thread must exit.
    fn drain(&mut self, commands: &Receiver<DecoderCommand>, clock: &AudioClock) -> bool {
        loop {
            match commands.try_recv() {
                Ok(command) => match self.apply(command, clock) {
                    Flow::Exit => return false,
                    Flow::Seek(ms) => self.pending_seek = Some(ms),
                    Flow::Continue => {}
                },
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }
}

fn pts_to_ms(pts: i64, time_base: Rational) -> u64 {
    let den = i128::from(time_base.denominator());
    if den == 0 {
        return 0;
    }
    let ms = i128::from(pts) * i128::from(time_base.numerator()) * 1000 / den;
    u64::try_from(ms).unwrap_or(0)
}

fn decode_loop(ctx: DecoderContext) -> Result<()> {
    let DecoderContext {
        path,
        video_sender,
        audio_ring,
        commands,
        clock,
        stop_flag,
        ..
    } = ctx;

    let mut input = ffmpeg_next::format::input(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let video_index = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| anyhow!("no video stream"))?
        .index();
    let audio_index = input.streams().best(Type::Audio).map(|s| s.index());

    let video_stream = input
        .stream(video_index)
        .ok_or_else(|| anyhow!("video stream vanished"))?;
    let video_time_base = video_stream.time_base();
    let mut video_decoder = codec::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let mut audio_decoder = match audio_index.and_then(|idx| input.stream(idx)) {
        Some(stream) => Some(
            codec::Context::from_parameters(stream.parameters())?
                .decoder()
                .audio()?,
        ),
        None => None,
    };

    let mut scaler = ScalerContext::get(
        video_decoder.format(),
        video_decoder.width(),
        video_decoder.height(),
        Pixel::RGBA,
        video_decoder.width(),
        video_decoder.height(),
        Flags::BILINEAR,
    )
    .context("failed to create scaler")?;

    // Output is always packed f32 stereo at the clock's rate
    let mut resampler = match audio_decoder.as_ref() {
        Some(decoder) => Some(
            ResamplerContext::get(
                decoder.format(),
                decoder.channel_layout(),
                decoder.rate(),
                Sample::F32(ffmpeg_next::util::format::sample::Type::Packed),
                OUTPUT_LAYOUT,
                clock.sample_rate(),
            )
            .context("failed to create resampler")?,
        ),
        None => None,
    };

    let mut video_frame = VideoFrame::empty();
    let mut audio_frame = AudioFrame::empty();
    let mut rgba_frame = VideoFrame::empty();

    let mut state = DecoderState {
        paused: true,
        pending_seek: None,
    };
    let mut at_eof = false;

    debug!("Decoder started for {}", path.display());

    loop {
        if stop_flag.load(Ordering::Relaxed) || !state.drain(&commands, &clock) {
            break;
        }

        if let Some(ms) = state.pending_seek.take() {
            let target = i64::try_from(ms * 1000).unwrap_or(i64::MAX);
            match input.seek(target, ..target) {
                Ok(()) => {
                    video_decoder.flush();
                    if let Some(decoder) = audio_decoder.as_mut() {
                        decoder.flush();
                    }
                    clock.set_position_ms(ms);
                    at_eof = false;
                }
                Err(e) => debug!("Seek to {ms} ms failed: {e}"),
            }
        }

        // Nothing to do until resumed or sought away from the end
        if state.paused || at_eof {
            thread::sleep(IDLE_WAIT);
            continue;
        }

        let mut packet = Packet::empty();
        match packet.read(&mut input) {
            Ok(()) => {}
            Err(ffmpeg_next::Error::Eof) => {
                debug!("Reached end of input");
                at_eof = true;
                continue;
            }
            // Corrupt packet
            Err(_) => continue,
        }

        if packet.stream() == video_index {
            video_decoder.send_packet(&packet)?;

            'frames: while video_decoder.receive_frame(&mut video_frame).is_ok() {
                scaler.run(&video_frame, &mut rgba_frame)?;

                let mut frame = DecodedVideoFrame {
                    rgba: rgba_frame.data(0).to_vec(),
                    width: rgba_frame.width(),
                    height: rgba_frame.height(),
                    pts_ms: pts_to_ms(video_frame.pts().unwrap_or(0), video_time_base),
                };

                // Keep polling commands while the display side is behind
                loop {
                    if stop_flag.load(Ordering::Relaxed) || !state.drain(&commands, &clock) {
                        return Ok(());
                    }
                    if state.pending_seek.is_some() {
                        break 'frames;
                    }
                    match video_sender.try_send(frame) {
                        Ok(()) => break,
                        Err(TrySendError::Full(f)) => {
                            frame = f;
                            thread::sleep(Duration::from_millis(1));
                        }
                        Err(TrySendError::Disconnected(_)) => return Ok(()),
                    }
                }
            }
        } else if Some(packet.stream()) == audio_index {
            let (Some(decoder), Some(resampler)) = (audio_decoder.as_mut(), resampler.as_mut())
            else {
                continue;
            };
            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut audio_frame).is_ok() {
                let mut resampled = AudioFrame::empty();
                if resampler.run(&audio_frame, &mut resampled).is_err() {
                    continue;
                }
                let data = resampled.data(0);
                let samples: Vec<f32> = data
                    .chunks_exact(4)
                    .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                audio_ring.push_slice(&samples);
            }
        }
    }

    debug!("Decoder stopped for {}", path.display());
    Ok(())
}
