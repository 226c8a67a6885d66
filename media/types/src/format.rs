/*!
    Source formats reported by discovery, and the interpolation choice of the
    video conversion stage.
*/

/**
    Pixel format of a source video stream, as reported by discovery.

    Formats the engine reports but this enum doesn't name are described as
    `None` in [`VideoParams`](crate::VideoParams). Converted frames are always
    RGBA.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    Yuv420p,
    Nv12,
    Bgra,
    Rgba,
    Rgb24,
    Yuv422p,
    Yuv444p,
    /// 10-bit 4:2:0, either endianness.
    Yuv420p10,
}

/**
    Sample format of a source audio stream, planar and packed layouts alike.
    Converted frames are always interleaved signed 16-bit.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SampleFormat {
    F32,
    F64,
    S16,
    S32,
    U8,
}

/**
    Interpolation used by the color-space conversion stage when the output
    size differs from the decoded picture size.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InterpolationAlgorithm {
    /// Nearest neighbor - fastest, lowest quality.
    Nearest,
    FastBilinear,
    Bilinear,
    /// Bicubic interpolation - the default for video decoding.
    #[default]
    Bicubic,
    Experimental,
    Area,
    BicubicLinear,
    Gauss,
    Sinc,
    /// Lanczos resampling - slowest, highest quality.
    Lanczos,
    Spline,
}
