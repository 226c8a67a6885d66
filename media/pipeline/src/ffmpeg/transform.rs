/*!
    Color-space conversion and audio resampling.

    Both stages are built from the decoder's output description when it is
    known at open time, and rebuilt whenever a decoded unit arrives in a
    different shape.
*/

use std::ffi::c_int;
use std::ptr;

use ffmpeg_next::ffi::{
    self, AVChannelLayout, AVChannelOrder, AVSampleFormat, SwrContext, av_channel_layout_copy,
    av_channel_layout_default, av_channel_layout_uninit, swr_alloc_set_opts2, swr_convert,
    swr_free, swr_get_out_samples, swr_init,
};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags};
use ffmpeg_next::util::frame::{audio::Audio as AudioFrameFFmpeg, video::Video as VideoFrameFFmpeg};
use tracing::debug;

use media_types::{AudioFrame, Error, InterpolationAlgorithm, Result};

use super::convert::scaler_flags;
use super::decoder::FfmpegDecoder;
use crate::engine::{Resampler, Scaler};

/**
    Converts decoded pictures to packed RGBA at a fixed output size.
*/
pub struct FfmpegScaler {
    width: u32,
    height: u32,
    flags: ScalerFlags,
    state: Option<ScalerState>,
}

struct ScalerState {
    context: ScalerContext,
    output: VideoFrameFFmpeg,
    src_format: Pixel,
    src_width: u32,
    src_height: u32,
}

impl FfmpegScaler {
    pub(crate) fn open(
        decoder: &FfmpegDecoder,
        width: u32,
        height: u32,
        algorithm: InterpolationAlgorithm,
    ) -> Result<Self> {
        let mut scaler = Self {
            width,
            height,
            flags: scaler_flags(algorithm),
            state: None,
        };

        // SAFETY: the decoder context is valid while the decoder lives.
        let (format, src_width, src_height) = unsafe {
            let ctx = &*decoder.as_ptr();
            (Pixel::from(ctx.pix_fmt), ctx.width, ctx.height)
        };
        if format != Pixel::None && src_width > 0 && src_height > 0 {
            scaler.init(format, src_width as u32, src_height as u32)?;
        }

        Ok(scaler)
    }

    fn init(&mut self, src_format: Pixel, src_width: u32, src_height: u32) -> Result<()> {
        let context = ScalerContext::get(
            src_format,
            src_width,
            src_height,
            Pixel::RGBA,
            self.width,
            self.height,
            self.flags,
        )
        .map_err(|e| Error::Convert {
            context: "create the scaler context",
            code: e.into(),
        })?;

        debug!(
            ?src_format,
            src_width,
            src_height,
            width = self.width,
            height = self.height,
            "scaler initialized"
        );

        self.state = Some(ScalerState {
            context,
            output: VideoFrameFFmpeg::new(Pixel::RGBA, self.width, self.height),
            src_format,
            src_width,
            src_height,
        });
        Ok(())
    }
}

impl Scaler for FfmpegScaler {
    type Picture = VideoFrameFFmpeg;

    fn scale(
        &mut self,
        picture: &VideoFrameFFmpeg,
        target: &mut [u8],
        stride: usize,
    ) -> std::result::Result<(), i32> {
        let (format, width, height) = (picture.format(), picture.width(), picture.height());
        let stale = match &self.state {
            None => true,
            Some(state) => {
                state.src_format != format
                    || state.src_width != width
                    || state.src_height != height
            }
        };
        if stale {
            self.init(format, width, height).map_err(|e| {
                e.code().unwrap_or(ffi::AVERROR(ffi::EINVAL))
            })?;
        }
        let Some(state) = self.state.as_mut() else {
            return Err(ffi::AVERROR(ffi::EINVAL));
        };

        state
            .context
            .run(picture, &mut state.output)
            .map_err(i32::from)?;

        let row = self.width as usize * 4;
        let rows = self.height as usize;
        if stride < row || target.len() < stride * rows.saturating_sub(1) + row {
            return Err(ffi::AVERROR(ffi::EINVAL));
        }

        let src = state.output.data(0);
        let src_stride = state.output.stride(0);
        for y in 0..rows {
            target[y * stride..y * stride + row]
                .copy_from_slice(&src[y * src_stride..y * src_stride + row]);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FfmpegScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegScaler")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("initialized", &self.state.is_some())
            .finish()
    }
}

/**
    Converts decoded samples to interleaved stereo signed 16-bit at the
    source sample rate.
*/
pub struct FfmpegResampler {
    ctx: *mut SwrContext,
    src_format: AVSampleFormat,
    src_channels: c_int,
    src_rate: c_int,
}

impl FfmpegResampler {
    pub(crate) fn open(decoder: &FfmpegDecoder) -> Result<Self> {
        let mut resampler = Self {
            ctx: ptr::null_mut(),
            src_format: AVSampleFormat::AV_SAMPLE_FMT_NONE,
            src_channels: 0,
            src_rate: 0,
        };

        // SAFETY: the decoder context is valid while the decoder lives.
        let ctx = unsafe { &*decoder.as_ptr() };
        if ctx.sample_fmt != AVSampleFormat::AV_SAMPLE_FMT_NONE && ctx.sample_rate > 0 {
            resampler.init(ctx.sample_fmt, &ctx.ch_layout, ctx.sample_rate)?;
        }

        Ok(resampler)
    }

    fn init(
        &mut self,
        src_format: AVSampleFormat,
        src_layout: &AVChannelLayout,
        src_rate: c_int,
    ) -> Result<()> {
        self.release();

        // SAFETY: zeroed layouts are valid "unspecified" layouts and are
        // uninitialized before leaving this block.
        let code = unsafe {
            let mut stereo: AVChannelLayout = std::mem::zeroed();
            av_channel_layout_default(&mut stereo, AudioFrame::CHANNELS as c_int);

            let mut input: AVChannelLayout = std::mem::zeroed();
            if src_layout.order == AVChannelOrder::AV_CHANNEL_ORDER_UNSPEC {
                av_channel_layout_default(&mut input, src_layout.nb_channels.max(1));
            } else {
                av_channel_layout_copy(&mut input, src_layout);
            }

            let mut code = swr_alloc_set_opts2(
                &mut self.ctx,
                &stereo,
                AVSampleFormat::AV_SAMPLE_FMT_S16,
                src_rate,
                &input,
                src_format,
                src_rate,
                0,
                ptr::null_mut(),
            );
            if code >= 0 {
                code = swr_init(self.ctx);
            }

            av_channel_layout_uninit(&mut stereo);
            av_channel_layout_uninit(&mut input);
            code
        };
        if code < 0 {
            self.release();
            return Err(Error::Convert {
                context: "initialize the resampler",
                code,
            });
        }

        self.src_format = src_format;
        self.src_channels = src_layout.nb_channels;
        self.src_rate = src_rate;
        debug!(
            ?src_format,
            channels = src_layout.nb_channels,
            rate = src_rate,
            "resampler initialized"
        );
        Ok(())
    }

    fn release(&mut self) {
        if !self.ctx.is_null() {
            // SAFETY: ctx was allocated by swr_alloc_set_opts2.
            unsafe { swr_free(&mut self.ctx) };
        }
    }
}

impl Resampler for FfmpegResampler {
    type Samples = AudioFrameFFmpeg;

    fn max_output(&self, input: usize) -> usize {
        if self.ctx.is_null() {
            return input;
        }
        let input = c_int::try_from(input).unwrap_or(c_int::MAX);
        // SAFETY: ctx is an initialized resampler.
        let bound = unsafe { swr_get_out_samples(self.ctx, input) };
        usize::try_from(bound).unwrap_or(input as usize)
    }

    fn convert(
        &mut self,
        samples: &AudioFrameFFmpeg,
        target: &mut [u8],
        capacity: usize,
    ) -> std::result::Result<usize, i32> {
        // SAFETY: the frame holds a decoded block of samples.
        let frame = unsafe { &*samples.as_ptr() };
        let format = AVSampleFormat::from(samples.format());

        if self.ctx.is_null()
            || self.src_format != format
            || self.src_channels != frame.ch_layout.nb_channels
            || self.src_rate != frame.sample_rate
        {
            self.init(format, &frame.ch_layout, frame.sample_rate)
                .map_err(|e| e.code().unwrap_or(ffi::AVERROR(ffi::EINVAL)))?;
        }

        let bytes_per_frame = AudioFrame::CHANNELS as usize * AudioFrame::BYTES_PER_SAMPLE;
        let capacity = capacity.min(target.len() / bytes_per_frame);
        let out_count = c_int::try_from(capacity).unwrap_or(c_int::MAX);

        let mut out = target.as_mut_ptr();
        // SAFETY: `out` has room for `out_count` stereo S16 samples and the
        // frame's extended data holds `nb_samples` input samples.
        let written = unsafe {
            swr_convert(
                self.ctx,
                &mut out as *mut *mut u8 as _,
                out_count,
                frame.extended_data as _,
                frame.nb_samples,
            )
        };
        if written < 0 {
            return Err(written);
        }
        Ok(written as usize)
    }
}

impl Drop for FfmpegResampler {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for FfmpegResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegResampler")
            .field("src_format", &self.src_format)
            .field("src_channels", &self.src_channels)
            .field("src_rate", &self.src_rate)
            .finish()
    }
}
