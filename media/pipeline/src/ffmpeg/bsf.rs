/*!
    Bitstream filter chains.
*/

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::Packet;
use ffmpeg_next::ffi::avcodec_parameters_copy;
use tracing::debug;

use media_types::{Error, Rational, Result};

use super::convert::rational_to_ffmpeg;
use super::input::CodecConfig;
use super::sys::{
    AVBSFContext, av_bsf_flush, av_bsf_free, av_bsf_init, av_bsf_list_parse_str,
    av_bsf_receive_packet, av_bsf_send_packet, status,
};
use crate::engine::{BitstreamFilter, Status};

/**
    An initialized filter chain, such as `h264_mp4toannexb` or
    `h264_mp4toannexb,dump_extra`.
*/
pub struct FfmpegFilter {
    ctx: *mut AVBSFContext,
}

impl FfmpegFilter {
    pub(crate) fn open(spec: &str, params: &CodecConfig, time_base: Rational) -> Result<Self> {
        let c_spec = CString::new(spec)
            .map_err(|_| Error::invalid_argument("filter chain contains a NUL byte"))?;

        let mut filter = Self {
            ctx: ptr::null_mut(),
        };
        // SAFETY: c_spec is NUL terminated; on failure ctx stays null.
        let code = unsafe { av_bsf_list_parse_str(c_spec.as_ptr(), &mut filter.ctx) };
        if code < 0 || filter.ctx.is_null() {
            return Err(Error::FilterInit {
                context: "create a filter context",
                code,
            });
        }

        // SAFETY: ctx was just allocated and owns both parameter sets.
        unsafe {
            let ctx = &mut *filter.ctx;
            let code = avcodec_parameters_copy(ctx.par_in, params.parameters.as_ptr());
            if code < 0 {
                return Err(Error::FilterInit {
                    context: "copy the input codec parameters to the filter",
                    code,
                });
            }
            let code = avcodec_parameters_copy(ctx.par_out, params.parameters.as_ptr());
            if code < 0 {
                return Err(Error::FilterInit {
                    context: "copy the output codec parameters to the filter",
                    code,
                });
            }
            ctx.time_base_in = rational_to_ffmpeg(time_base);
            ctx.time_base_out = rational_to_ffmpeg(time_base);
        }

        // SAFETY: ctx is fully configured.
        let code = unsafe { av_bsf_init(filter.ctx) };
        if code < 0 {
            return Err(Error::FilterInit {
                context: "initialize the filter context",
                code,
            });
        }

        debug!(spec, "bitstream filter initialized");
        Ok(filter)
    }
}

impl BitstreamFilter for FfmpegFilter {
    type Packet = Packet;

    fn send(&mut self, packet: &mut Packet) -> Status {
        // SAFETY: on success FFmpeg takes the packet's reference and resets it.
        status(unsafe { av_bsf_send_packet(self.ctx, packet.as_mut_ptr()) })
    }

    fn send_eof(&mut self) -> Status {
        // SAFETY: a null packet is the documented end-of-input marker.
        status(unsafe { av_bsf_send_packet(self.ctx, ptr::null_mut()) })
    }

    fn receive(&mut self, packet: &mut Packet) -> Status {
        // SAFETY: the packet is blank.
        status(unsafe { av_bsf_receive_packet(self.ctx, packet.as_mut_ptr()) })
    }

    fn reset(&mut self) {
        // SAFETY: ctx is initialized.
        unsafe { av_bsf_flush(self.ctx) };
    }
}

impl Drop for FfmpegFilter {
    fn drop(&mut self) {
        if !self.ctx.is_null() {
            // SAFETY: ctx was allocated by av_bsf_list_parse_str.
            unsafe { av_bsf_free(&mut self.ctx) };
        }
    }
}

impl std::fmt::Debug for FfmpegFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegFilter").finish_non_exhaustive()
    }
}
