/*!
    Decoded and converted frames.
*/

use std::time::Duration;

use image::RgbaImage;

use crate::{MediaKind, Rational};

/**
    Timing and ordering information shared by every frame kind.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInfo {
    /// Presentation timestamp in stream ticks, if the decoder reported one.
    pub pts: Option<i64>,
    /// Time base of the stream the frame was decoded from.
    pub time_base: Rational,
    /// Ordinal of the compressed unit, in bitstream order, whose submission
    /// completed this frame.
    pub index_coded: u64,
    /// Ordinal of the frame in presentation order since the stream was
    /// opened or last rewound.
    pub index_display: u64,
}

impl FrameInfo {
    /**
        Offset since the start of the media at which the frame should be
        presented: `pts * time_base`, computed exactly.

        Returns `None` if the frame has no timestamp or the timestamp is
        negative.
    */
    pub fn presentation_offset(&self) -> Option<Duration> {
        self.time_base.ticks_to_duration(self.pts?)
    }
}

/**
    A decoded video frame converted to packed RGBA.

    The raster is owned by the frame; it stays valid after the stream that
    produced it decodes further frames.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    info: FrameInfo,
    image: RgbaImage,
}

impl VideoFrame {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn new(info: FrameInfo, image: RgbaImage) -> Self {
        Self { info, image }
    }

    /**
        Wrap a tightly packed RGBA buffer. Returns `None` if `data` is shorter
        than `width * height * 4` bytes.
    */
    pub fn from_raw(info: FrameInfo, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self::new(info, image))
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /**
        The RGBA pixels, row-major, without row padding.
    */
    pub fn data(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/**
    A decoded audio frame converted to interleaved stereo signed 16-bit PCM
    at the source sample rate.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    info: FrameInfo,
    sample_rate: u32,
    data: Vec<u8>,
}

impl AudioFrame {
    pub const CHANNELS: u16 = 2;
    pub const BYTES_PER_SAMPLE: usize = 2;

    pub fn new(info: FrameInfo, sample_rate: u32, data: Vec<u8>) -> Self {
        Self {
            info,
            sample_rate,
            data,
        }
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        Self::CHANNELS
    }

    /**
        Number of samples per channel.
    */
    pub fn sample_count(&self) -> usize {
        self.data.len() / (Self::CHANNELS as usize * Self::BYTES_PER_SAMPLE)
    }

    /**
        Raw interleaved PCM bytes in native endianness.
    */
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /**
        Iterates over `[left, right]` sample pairs.
    */
    pub fn samples(&self) -> impl Iterator<Item = [i16; 2]> + '_ {
        self.data.chunks_exact(4).map(|c| {
            [
                i16::from_ne_bytes([c[0], c[1]]),
                i16::from_ne_bytes([c[2], c[3]]),
            ]
        })
    }

    /**
        Playback length of the frame at its sample rate.
    */
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Rational::new(1, self.sample_rate as i32)
            .ticks_to_duration(self.sample_count() as i64)
            .unwrap_or_default()
    }
}

/**
    A decoded frame of either kind.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl Frame {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Video(_) => MediaKind::Video,
            Self::Audio(_) => MediaKind::Audio,
        }
    }

    pub fn info(&self) -> &FrameInfo {
        match self {
            Self::Video(frame) => frame.info(),
            Self::Audio(frame) => frame.info(),
        }
    }

    /**
        The frame payload: RGBA pixels for video, interleaved PCM for audio.
    */
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Video(frame) => frame.data(),
            Self::Audio(frame) => frame.data(),
        }
    }

    pub fn pts(&self) -> Option<i64> {
        self.info().pts
    }

    pub fn index_coded(&self) -> u64 {
        self.info().index_coded
    }

    pub fn index_display(&self) -> u64 {
        self.info().index_display
    }

    pub fn presentation_offset(&self) -> Option<Duration> {
        self.info().presentation_offset()
    }

    pub fn as_video(&self) -> Option<&VideoFrame> {
        match self {
            Self::Video(frame) => Some(frame),
            Self::Audio(_) => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioFrame> {
        match self {
            Self::Audio(frame) => Some(frame),
            Self::Video(_) => None,
        }
    }
}

impl From<VideoFrame> for Frame {
    fn from(frame: VideoFrame) -> Self {
        Self::Video(frame)
    }
}

impl From<AudioFrame> for Frame {
    fn from(frame: AudioFrame) -> Self {
        Self::Audio(frame)
    }
}
