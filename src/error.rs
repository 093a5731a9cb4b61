use thiserror::Error;

/// Failure while opening or probing a media resource.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),
    #[error("no video stream found")]
    NoVideoStream,
    #[error("failed to open audio output: {0}")]
    AudioStream(#[from] rodio::StreamError),
    #[error("failed to create audio sink: {0}")]
    AudioSink(#[from] rodio::PlayError),
    #[error("failed to start decoder thread: {0}")]
    Thread(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;
