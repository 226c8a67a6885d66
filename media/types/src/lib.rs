/*!
    Shared types for the media pipeline.

    This crate defines the vocabulary that crosses the pipeline's boundaries:
    time bases, formats, compressed packet snapshots, decoded frames and the
    error taxonomy. It has no dependency on FFmpeg, so consumers can depend on
    it without pulling in native bindings.
*/

mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod stream;

pub use error::{ENOMEM_STATUS, Error, Result};
pub use format::{InterpolationAlgorithm, PixelFormat, SampleFormat};
pub use frame::{AudioFrame, Frame, FrameInfo, VideoFrame};
pub use image::RgbaImage;
pub use packet::{Packet, PacketFlags};
pub use rational::Rational;
pub use stream::{AudioParams, CodecDescriptor, MediaKind, StreamInfo, VideoParams};
