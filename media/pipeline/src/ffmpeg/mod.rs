/*!
    The FFmpeg engine.

    Demuxing and decoding go through `ffmpeg-next`, with direct calls into
    `ffmpeg-sys-next` where the safe wrapper doesn't reach (input options,
    seeking, bitstream filters, resampling into caller buffers).
*/

mod bsf;
mod convert;
mod decoder;
mod input;
mod sys;
mod transform;

use std::sync::Arc;

use ffmpeg_next::util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg};
use ffmpeg_next::{Packet, ffi};

use media_types::{
    AudioParams, CodecDescriptor, Error, InterpolationAlgorithm, Rational, Result,
};

use crate::container::Container;
use crate::engine::Backend;
use crate::options::OpenOptions;

pub use bsf::FfmpegFilter;
pub use decoder::FfmpegDecoder;
pub use input::{CodecConfig, FfmpegInput};
pub use transform::{FfmpegResampler, FfmpegScaler};

/**
    The FFmpeg engine. Stateless; all native state lives in the handles it
    creates.
*/
#[derive(Clone, Copy, Debug, Default)]
pub struct Ffmpeg;

impl Ffmpeg {
    /**
        Initialize the libraries. Safe to call more than once.
    */
    pub fn init() -> Result<Self> {
        ffmpeg_next::init().map_err(|e| Error::Allocation {
            context: "initialize FFmpeg",
            code: e.into(),
        })?;
        Ok(Self)
    }
}

impl Backend for Ffmpeg {
    type Parameters = CodecConfig;
    type Packet = Packet;
    type Picture = VideoFrameFFmpeg;
    type Samples = AudioFrameFFmpeg;
    type Input = FfmpegInput;
    type Decoder = FfmpegDecoder;
    type Filter = FfmpegFilter;
    type Scaler = FfmpegScaler;
    type Resampler = FfmpegResampler;

    fn open_input(&self, location: &str, options: &OpenOptions) -> Result<FfmpegInput> {
        FfmpegInput::open(location, options)
    }

    fn find_decoder(&self, params: &CodecConfig) -> Option<CodecDescriptor> {
        decoder::find(params).map(|codec| decoder::describe(&codec))
    }

    fn open_decoder(&self, params: &CodecConfig) -> Result<FfmpegDecoder> {
        FfmpegDecoder::open(params)
    }

    fn alloc_packet(&self) -> Result<Packet> {
        Ok(Packet::empty())
    }

    fn alloc_picture(&self) -> Result<VideoFrameFFmpeg> {
        let picture = VideoFrameFFmpeg::empty();
        // SAFETY: checking the allocation result only.
        if unsafe { picture.as_ptr() }.is_null() {
            return Err(Error::allocation("allocate a picture"));
        }
        Ok(picture)
    }

    fn alloc_samples(&self) -> Result<AudioFrameFFmpeg> {
        let samples = AudioFrameFFmpeg::empty();
        // SAFETY: checking the allocation result only.
        if unsafe { samples.as_ptr() }.is_null() {
            return Err(Error::allocation("allocate an audio frame"));
        }
        Ok(samples)
    }

    fn open_filter(
        &self,
        spec: &str,
        params: &CodecConfig,
        time_base: Rational,
    ) -> Result<FfmpegFilter> {
        FfmpegFilter::open(spec, params, time_base)
    }

    fn open_scaler(
        &self,
        decoder: &FfmpegDecoder,
        width: u32,
        height: u32,
        algorithm: InterpolationAlgorithm,
    ) -> Result<FfmpegScaler> {
        FfmpegScaler::open(decoder, width, height, algorithm)
    }

    fn open_resampler(
        &self,
        decoder: &FfmpegDecoder,
        _source: &AudioParams,
    ) -> Result<FfmpegResampler> {
        FfmpegResampler::open(decoder)
    }

    fn network_init(&self) -> i32 {
        // SAFETY: plain library call.
        unsafe { ffi::avformat_network_init() }
    }

    fn network_deinit(&self) -> i32 {
        // SAFETY: plain library call.
        unsafe { ffi::avformat_network_deinit() }
    }
}

pub type FfmpegContainer = Container<Ffmpeg>;

impl Container<Ffmpeg> {
    /**
        Open a file or network source with FFmpeg.

        Network sources need a live [`NetworkSession`](crate::NetworkSession).
    */
    pub fn open(location: &str, options: OpenOptions) -> Result<Self> {
        let backend = Ffmpeg::init()?;
        Self::open_with(Arc::new(backend), location, options)
    }
}
