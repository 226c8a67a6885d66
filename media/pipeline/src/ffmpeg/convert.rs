/*!
    Conversion utilities between FFmpeg types and media-types.
*/

use ffmpeg_next::ffi::{AVMediaType, AVRational};
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::software::scaling::flag::Flags as ScalerFlags;

use media_types::{InterpolationAlgorithm, MediaKind, PixelFormat, Rational, SampleFormat};

pub(crate) fn rational_from_ffmpeg(r: AVRational) -> Rational {
    Rational::new(r.num, r.den)
}

pub(crate) fn rational_to_ffmpeg(r: Rational) -> AVRational {
    AVRational { num: r.num, den: r.den }
}

pub(crate) fn media_kind_from_ffmpeg(kind: AVMediaType) -> MediaKind {
    match kind {
        AVMediaType::AVMEDIA_TYPE_VIDEO => MediaKind::Video,
        AVMediaType::AVMEDIA_TYPE_AUDIO => MediaKind::Audio,
        AVMediaType::AVMEDIA_TYPE_SUBTITLE => MediaKind::Subtitle,
        AVMediaType::AVMEDIA_TYPE_DATA => MediaKind::Data,
        AVMediaType::AVMEDIA_TYPE_ATTACHMENT => MediaKind::Attachment,
        _ => MediaKind::Unknown,
    }
}

pub(crate) fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P => Some(PixelFormat::Yuv420p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::YUV422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P => Some(PixelFormat::Yuv444p),
        Pixel::YUV420P10LE | Pixel::YUV420P10BE => Some(PixelFormat::Yuv420p10),
        _ => None,
    }
}

pub(crate) fn sample_format_from_ffmpeg(format: Sample) -> Option<SampleFormat> {
    match format {
        Sample::F32(_) => Some(SampleFormat::F32),
        Sample::F64(_) => Some(SampleFormat::F64),
        Sample::I16(_) => Some(SampleFormat::S16),
        Sample::I32(_) => Some(SampleFormat::S32),
        Sample::U8(_) => Some(SampleFormat::U8),
        _ => None,
    }
}

pub(crate) fn scaler_flags(algorithm: InterpolationAlgorithm) -> ScalerFlags {
    match algorithm {
        InterpolationAlgorithm::Nearest => ScalerFlags::POINT,
        InterpolationAlgorithm::FastBilinear => ScalerFlags::FAST_BILINEAR,
        InterpolationAlgorithm::Bilinear => ScalerFlags::BILINEAR,
        InterpolationAlgorithm::Bicubic => ScalerFlags::BICUBIC,
        InterpolationAlgorithm::Experimental => ScalerFlags::EXPERIMENTAL,
        InterpolationAlgorithm::Area => ScalerFlags::AREA,
        InterpolationAlgorithm::BicubicLinear => ScalerFlags::BICUBLIN,
        InterpolationAlgorithm::Gauss => ScalerFlags::GAUSS,
        InterpolationAlgorithm::Sinc => ScalerFlags::SINC,
        InterpolationAlgorithm::Lanczos => ScalerFlags::LANCZOS,
        InterpolationAlgorithm::Spline => ScalerFlags::SPLINE,
    }
}

/**
    Map FFmpeg's "no value" timestamp to `None`.
*/
pub(crate) fn timestamp(value: i64) -> Option<i64> {
    (value != ffmpeg_next::ffi::AV_NOPTS_VALUE).then_some(value)
}
