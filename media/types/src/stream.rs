/*!
    Stream information types.
*/

use std::fmt;
use std::time::Duration;

use crate::{PixelFormat, Rational, SampleFormat};

/**
    The media type of a sub-stream, as reported by the container.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    #[default]
    Unknown,
}

impl MediaKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
            Self::Data => "data",
            Self::Attachment => "attachment",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/**
    Names of the decoder found for a stream's codec.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodecDescriptor {
    pub name: String,
    pub long_name: String,
}

/**
    Picture parameters of a video sub-stream.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    /// Source pixel format, if it is one of the formats we name.
    pub pixel_format: Option<PixelFormat>,
    /// Sample aspect ratio (0/1 if unknown).
    pub sample_aspect_ratio: Rational,
}

/**
    Sample parameters of an audio sub-stream.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: Option<SampleFormat>,
    /// Number of samples per channel in one audio frame (0 if variable).
    pub frame_size: u32,
}

/**
    Metadata of one container sub-stream, gathered during stream discovery.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamInfo {
    /// Index of the sub-stream in the container.
    pub index: usize,
    pub kind: MediaKind,
    pub time_base: Rational,
    /// Real base frame rate (0/1 if unknown).
    pub frame_rate: Rational,
    /// Duration in time base ticks, negative if unknown.
    pub duration: i64,
    /// Number of frames, 0 if unknown.
    pub frame_count: i64,
    /// Bit rate in bits per second, 0 if unknown.
    pub bit_rate: i64,
    pub video: Option<VideoParams>,
    pub audio: Option<AudioParams>,
}

impl StreamInfo {
    /**
        Returns the stream duration as wall-clock time.

        An unknown (negative) duration is reported as zero.
    */
    pub fn duration(&self) -> Duration {
        self.time_base
            .ticks_to_duration(self.duration.max(0))
            .unwrap_or_default()
    }
}
