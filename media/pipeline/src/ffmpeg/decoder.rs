/*!
    Decoder context wrapper.
*/

use ffmpeg_next::codec::{self, decoder};
use ffmpeg_next::util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg};
use ffmpeg_next::{Packet, ffi};

use media_types::{CodecDescriptor, Error, Result};

use super::input::CodecConfig;
use super::sys::status_of;
use crate::engine::{Decoder, Picture, Samples, Status};

/**
    Look up a decoder for the parameters' codec.
*/
pub(crate) fn find(params: &CodecConfig) -> Option<codec::Codec> {
    decoder::find(params.id())
}

pub(crate) fn describe(codec: &codec::Codec) -> CodecDescriptor {
    CodecDescriptor {
        name: codec.name().to_string(),
        long_name: codec.description().to_string(),
    }
}

/**
    An opened decoder.
*/
pub struct FfmpegDecoder {
    inner: decoder::Opened,
}

impl FfmpegDecoder {
    pub(crate) fn open(params: &CodecConfig) -> Result<Self> {
        let codec = find(params).ok_or(Error::Decode {
            context: "find a decoder",
            code: ffi::AVERROR_DECODER_NOT_FOUND,
        })?;

        let context = codec::context::Context::from_parameters(params.parameters.clone())
            .map_err(|e| Error::Allocation {
                context: "allocate a decoder context",
                code: e.into(),
            })?;
        let inner = context
            .decoder()
            .open_as(codec)
            .map_err(|e| Error::Decode {
                context: "open the decoder",
                code: e.into(),
            })?;

        Ok(Self { inner })
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::AVCodecContext {
        // SAFETY: the pointer stays valid while self lives.
        unsafe { self.inner.as_ptr() }
    }
}

impl Decoder for FfmpegDecoder {
    type Packet = Packet;
    type Picture = VideoFrameFFmpeg;
    type Samples = AudioFrameFFmpeg;

    fn send(&mut self, packet: Option<&Packet>) -> Status {
        match packet {
            Some(packet) => status_of(self.inner.send_packet(packet)),
            None => status_of(self.inner.send_eof()),
        }
    }

    fn receive_picture(&mut self, picture: &mut VideoFrameFFmpeg) -> Status {
        status_of(self.inner.receive_frame(picture))
    }

    fn receive_samples(&mut self, samples: &mut AudioFrameFFmpeg) -> Status {
        status_of(self.inner.receive_frame(samples))
    }

    fn flush(&mut self) {
        self.inner.flush();
    }
}

impl std::fmt::Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegDecoder")
            .field("codec_id", &self.inner.id())
            .finish_non_exhaustive()
    }
}

impl Picture for VideoFrameFFmpeg {
    fn pts(&self) -> Option<i64> {
        (**self).pts()
    }

    fn width(&self) -> u32 {
        VideoFrameFFmpeg::width(self)
    }

    fn height(&self) -> u32 {
        VideoFrameFFmpeg::height(self)
    }
}

impl Samples for AudioFrameFFmpeg {
    fn pts(&self) -> Option<i64> {
        (**self).pts()
    }

    fn sample_count(&self) -> usize {
        self.samples()
    }
}
