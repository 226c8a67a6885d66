/*!
    Elementary streams.

    Every sub-stream of a container becomes a [`Stream`]: a video or audio
    stream when a decoder exists for its codec, an unknown (metadata only)
    stream otherwise. All kinds share the same lifecycle. A stream is closed
    until opened, holds its native decode resources while open, and releases
    all of them when closed.
*/

mod audio;
mod state;
mod video;

use std::sync::Arc;
use std::time::Duration;

use media_types::{CodecDescriptor, Error, Frame, MediaKind, Rational, Result, StreamInfo};

pub use self::audio::AudioStream;
pub(crate) use self::state::StreamCore;
pub use self::video::VideoStream;
use crate::engine::{Backend, NativeStream};
use crate::outcome::Outcome;

/**
    A sub-stream no decoder is available for. It reports metadata and can
    carry a bitstream filter, but can't be opened.
*/
pub struct UnknownStream<B: Backend> {
    pub(crate) core: StreamCore<B>,
}

impl<B: Backend> std::fmt::Debug for UnknownStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownStream")
            .field("core", &self.core)
            .finish()
    }
}

/**
    One elementary sub-stream of a container.
*/
pub enum Stream<B: Backend> {
    Video(VideoStream<B>),
    Audio(AudioStream<B>),
    Unknown(UnknownStream<B>),
}

impl<B: Backend> std::fmt::Debug for Stream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video(stream) => stream.fmt(f),
            Self::Audio(stream) => stream.fmt(f),
            Self::Unknown(stream) => stream.fmt(f),
        }
    }
}

impl<B: Backend> Stream<B> {
    /**
        Classify a discovered sub-stream by whether a decoder exists for its
        codec, then by media type.
    */
    pub(crate) fn classify(backend: Arc<B>, native: NativeStream<B::Parameters>) -> Self {
        let codec = backend.find_decoder(&native.params);
        let kind = native.info.kind;
        let decodable = codec.is_some();
        let core = StreamCore::new(backend, native.info, native.params, codec);

        match kind {
            MediaKind::Video if decodable => Self::Video(VideoStream::new(core)),
            MediaKind::Audio if decodable => Self::Audio(AudioStream::new(core)),
            _ => Self::Unknown(UnknownStream { core }),
        }
    }

    pub(crate) fn core(&self) -> &StreamCore<B> {
        match self {
            Self::Video(stream) => &stream.core,
            Self::Audio(stream) => &stream.core,
            Self::Unknown(stream) => &stream.core,
        }
    }

    pub(crate) fn core_mut(&mut self) -> &mut StreamCore<B> {
        match self {
            Self::Video(stream) => &mut stream.core,
            Self::Audio(stream) => &mut stream.core,
            Self::Unknown(stream) => &mut stream.core,
        }
    }

    /**
        Index of the sub-stream in the container.
    */
    pub fn index(&self) -> usize {
        self.core().index()
    }

    /**
        Media type reported by the container. An unknown stream keeps the
        container's type (subtitle, data, or a video/audio stream without a
        decoder).
    */
    pub fn kind(&self) -> MediaKind {
        self.core().info.kind
    }

    pub fn is_decodable(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn info(&self) -> &StreamInfo {
        &self.core().info
    }

    pub fn codec(&self) -> Option<&CodecDescriptor> {
        self.core().codec.as_ref()
    }

    pub fn codec_name(&self) -> Option<&str> {
        self.codec().map(|c| c.name.as_str())
    }

    pub fn codec_long_name(&self) -> Option<&str> {
        self.codec().map(|c| c.long_name.as_str())
    }

    pub fn bit_rate(&self) -> i64 {
        self.info().bit_rate
    }

    pub fn duration(&self) -> Duration {
        self.info().duration()
    }

    pub fn time_base(&self) -> Rational {
        self.info().time_base
    }

    pub fn frame_rate(&self) -> Rational {
        self.info().frame_rate
    }

    pub fn frame_count(&self) -> i64 {
        self.info().frame_count
    }

    pub fn is_open(&self) -> bool {
        self.core().is_open()
    }

    /**
        Open for decoding with the default output configuration.
    */
    pub fn open(&mut self) -> Result<()> {
        match self {
            Self::Video(stream) => stream.open(),
            Self::Audio(stream) => stream.open(),
            Self::Unknown(stream) => Err(unsupported(&stream.core)),
        }
    }

    /**
        Decode the next frame. See [`VideoStream::read_video_frame`] and
        [`AudioStream::read_audio_frame`].
    */
    pub fn read_frame(&mut self) -> Result<Outcome<Frame>> {
        match self {
            Self::Video(stream) => Ok(stream.read_video_frame()?.map(Frame::Video)),
            Self::Audio(stream) => Ok(stream.read_audio_frame()?.map(Frame::Audio)),
            Self::Unknown(stream) => Err(unsupported(&stream.core)),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Video(stream) => stream.close(),
            Self::Audio(stream) => stream.close(),
            Self::Unknown(stream) => Err(unsupported(&stream.core)),
        }
    }

    /**
        Route every packet of this stream through the bitstream filter chain
        described by `spec` (for example `h264_mp4toannexb`). An already
        applied filter is replaced.
    */
    pub fn apply_filter(&mut self, spec: &str) -> Result<()> {
        self.core_mut().apply_filter(spec)
    }

    /**
        Release the applied bitstream filter. Fails if none is applied.
    */
    pub fn remove_filter(&mut self) -> Result<()> {
        self.core_mut().remove_filter()
    }

    /**
        Chain description of the applied bitstream filter.
    */
    pub fn filter(&self) -> Option<&str> {
        self.core().filter()
    }

    /**
        The position of `offset` in this stream's ticks, as used to rewind
        the container.
    */
    pub fn rewind_position(&self, offset: Duration) -> Result<i64> {
        self.core().rewind_position(offset)
    }

    pub fn as_video(&self) -> Option<&VideoStream<B>> {
        match self {
            Self::Video(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_video_mut(&mut self) -> Option<&mut VideoStream<B>> {
        match self {
            Self::Video(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioStream<B>> {
        match self {
            Self::Audio(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_audio_mut(&mut self) -> Option<&mut AudioStream<B>> {
        match self {
            Self::Audio(stream) => Some(stream),
            _ => None,
        }
    }
}

fn unsupported<B: Backend>(core: &StreamCore<B>) -> Error {
    Error::Unsupported {
        index: core.index(),
        kind: core.info.kind,
    }
}
