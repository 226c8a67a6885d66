/*!
    Raw FFmpeg declarations missing from `ffmpeg-sys-next`, and status code
    translation.
*/

use std::ffi::{c_char, c_int, c_void};

use ffmpeg_next::ffi::{AVCodecParameters, AVPacket, AVRational, AVERROR, AVERROR_EOF, EAGAIN};

use crate::engine::Status;

// `ffmpeg-sys-next` doesn't generate bindings for `libavcodec/bsf.h`.

#[repr(C)]
pub(crate) struct AVBitStreamFilter {
    _opaque: [u8; 0],
}

/// Layout mirrors `libavcodec/bsf.h`.
#[repr(C)]
pub(crate) struct AVBSFContext {
    pub av_class: *const c_void,
    pub filter: *const AVBitStreamFilter,
    pub priv_data: *mut c_void,
    pub par_in: *mut AVCodecParameters,
    pub par_out: *mut AVCodecParameters,
    pub time_base_in: AVRational,
    pub time_base_out: AVRational,
}

unsafe extern "C" {
    pub(crate) fn av_bsf_list_parse_str(spec: *const c_char, ctx: *mut *mut AVBSFContext) -> c_int;
    pub(crate) fn av_bsf_init(ctx: *mut AVBSFContext) -> c_int;
    pub(crate) fn av_bsf_send_packet(ctx: *mut AVBSFContext, pkt: *mut AVPacket) -> c_int;
    pub(crate) fn av_bsf_receive_packet(ctx: *mut AVBSFContext, pkt: *mut AVPacket) -> c_int;
    pub(crate) fn av_bsf_flush(ctx: *mut AVBSFContext);
    pub(crate) fn av_bsf_free(ctx: *mut *mut AVBSFContext);
}

/**
    Classify a native return code.
*/
pub(crate) fn status(code: c_int) -> Status {
    if code >= 0 {
        Status::Ok
    } else if code == AVERROR(EAGAIN) {
        Status::Again
    } else if code == AVERROR_EOF {
        Status::Eof
    } else {
        Status::Error(code)
    }
}

/**
    Classify the result of a safe `ffmpeg-next` call.
*/
pub(crate) fn status_of(result: std::result::Result<(), ffmpeg_next::Error>) -> Status {
    match result {
        Ok(()) => Status::Ok,
        Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => Status::Again,
        Err(ffmpeg_next::Error::Eof) => Status::Eof,
        Err(e) => Status::Error(e.into()),
    }
}

/**
    Read a possibly null C string owned by FFmpeg.
*/
pub(crate) fn c_str(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: FFmpeg hands out NUL terminated static strings.
    unsafe { std::ffi::CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}
