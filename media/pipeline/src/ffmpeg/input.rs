/*!
    Demuxing through libavformat.
*/

use std::ffi::{CString, c_int};
use std::ptr;

use ffmpeg_next::ffi::{
    AV_NOPTS_VALUE, AVFormatContext, AVStream, av_find_input_format, av_packet_ref,
    av_packet_unref, av_read_frame, av_seek_frame, avcodec_parameters_copy,
    avformat_close_input, avformat_find_stream_info, avformat_open_input,
};
use ffmpeg_next::format::{Pixel, Sample};
use ffmpeg_next::{Dictionary, Packet, codec};
use tracing::{debug, warn};

use media_types::{
    AudioParams, Error, MediaKind, PacketFlags, Result, StreamInfo, VideoParams,
};

use super::convert::{
    media_kind_from_ffmpeg, pixel_format_from_ffmpeg, rational_from_ffmpeg,
    sample_format_from_ffmpeg, timestamp,
};
use super::sys::{c_str, status};
use crate::engine::{FormatInfo, Input, NativeStream, RawPacket, SeekFlags, Status};
use crate::options::OpenOptions;

/**
    Codec parameters of a discovered sub-stream.

    Owns a copy, so it stays valid independently of the input it came from.
*/
pub struct CodecConfig {
    pub(crate) parameters: codec::Parameters,
}

impl CodecConfig {
    pub fn id(&self) -> codec::Id {
        self.parameters.id()
    }
}

impl Clone for CodecConfig {
    fn clone(&self) -> Self {
        Self {
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field("codec_id", &self.parameters.id())
            .finish_non_exhaustive()
    }
}

/**
    An open libavformat input context.
*/
pub struct FfmpegInput {
    ctx: *mut AVFormatContext,
}

impl FfmpegInput {
    pub(crate) fn open(location: &str, options: &OpenOptions) -> Result<Self> {
        let c_location = CString::new(location)
            .map_err(|_| Error::invalid_argument("location contains a NUL byte"))?;

        let format = match &options.input_format {
            Some(name) => {
                ffmpeg_next::device::register_all();
                let c_name = CString::new(name.as_str())
                    .map_err(|_| Error::invalid_argument("input format contains a NUL byte"))?;
                // SAFETY: c_name is a valid NUL terminated string.
                let format = unsafe { av_find_input_format(c_name.as_ptr()) };
                if format.is_null() {
                    return Err(Error::InputFormatNotFound { name: name.clone() });
                }
                format
            }
            None => ptr::null(),
        };

        let mut dictionary = Dictionary::new();
        for (key, value) in options.dictionary() {
            dictionary.set(&key, &value);
        }

        let mut ctx: *mut AVFormatContext = ptr::null_mut();
        // SAFETY: the dictionary is handed to FFmpeg and taken back right
        // after, whatever the outcome. Entries FFmpeg didn't consume remain.
        let code = unsafe {
            let mut raw = dictionary.disown();
            let code = avformat_open_input(&mut ctx, c_location.as_ptr(), format, &mut raw);
            let leftover = Dictionary::own(raw);
            for (key, _) in leftover.iter() {
                warn!(location, option = key, "option not recognized");
            }
            code
        };
        if code < 0 {
            return Err(Error::Open {
                location: location.to_string(),
                code,
            });
        }

        debug!(location, "input opened");
        Ok(Self { ctx })
    }

    fn streams(&self) -> &[*mut AVStream] {
        // SAFETY: ctx is valid while self lives; streams holds nb_streams
        // pointers owned by the context.
        unsafe {
            let ctx = &*self.ctx;
            if ctx.streams.is_null() {
                return &[];
            }
            std::slice::from_raw_parts(ctx.streams, ctx.nb_streams as usize)
        }
    }
}

/**
    Build the engine-neutral description of one sub-stream.

    # Safety

    `stream` must point at a valid stream of an open input.
*/
unsafe fn describe(stream: *const AVStream) -> std::result::Result<NativeStream<CodecConfig>, i32> {
    // SAFETY: guaranteed by the caller.
    let stream = unsafe { &*stream };
    // SAFETY: every discovered stream carries codec parameters.
    let par = unsafe { &*stream.codecpar };

    let mut parameters = codec::Parameters::new();
    // SAFETY: both pointers are valid parameter sets.
    let code = unsafe { avcodec_parameters_copy(parameters.as_mut_ptr(), stream.codecpar) };
    if code < 0 {
        return Err(code);
    }

    // Picture and sample formats come out typed once the parameters are
    // loaded into a codec context.
    let context =
        codec::context::Context::from_parameters(parameters.clone()).map_err(i32::from)?;
    // SAFETY: the context was just built and is not shared.
    let (pix_fmt, sample_fmt) = unsafe {
        let ctx = &*context.as_ptr();
        (ctx.pix_fmt, ctx.sample_fmt)
    };

    let kind = media_kind_from_ffmpeg(par.codec_type);
    let frame_rate = if stream.avg_frame_rate.num != 0 {
        rational_from_ffmpeg(stream.avg_frame_rate)
    } else {
        rational_from_ffmpeg(stream.r_frame_rate)
    };

    let video = (kind == MediaKind::Video).then(|| VideoParams {
        width: par.width.max(0) as u32,
        height: par.height.max(0) as u32,
        pixel_format: pixel_format_from_ffmpeg(Pixel::from(pix_fmt)),
        sample_aspect_ratio: rational_from_ffmpeg(par.sample_aspect_ratio),
    });
    let audio = (kind == MediaKind::Audio).then(|| AudioParams {
        sample_rate: par.sample_rate.max(0) as u32,
        channels: par.ch_layout.nb_channels.max(0) as u16,
        sample_format: sample_format_from_ffmpeg(Sample::from(sample_fmt)),
        frame_size: par.frame_size.max(0) as u32,
    });

    Ok(NativeStream {
        info: StreamInfo {
            index: stream.index as usize,
            kind,
            time_base: rational_from_ffmpeg(stream.time_base),
            frame_rate,
            duration: if stream.duration == AV_NOPTS_VALUE {
                -1
            } else {
                stream.duration
            },
            frame_count: stream.nb_frames,
            bit_rate: par.bit_rate,
            video,
            audio,
        },
        params: CodecConfig { parameters },
    })
}

impl Input for FfmpegInput {
    type Parameters = CodecConfig;
    type Packet = Packet;

    fn discover(&mut self) -> std::result::Result<Vec<NativeStream<CodecConfig>>, i32> {
        // SAFETY: ctx is a valid open input.
        let code = unsafe { avformat_find_stream_info(self.ctx, ptr::null_mut()) };
        if code < 0 {
            return Err(code);
        }

        self.streams()
            .iter()
            // SAFETY: the pointers come from the open context.
            .map(|&stream| unsafe { describe(stream) })
            .collect()
    }

    fn read(&mut self, packet: &mut Packet) -> Status {
        // SAFETY: both the context and the packet are valid.
        status(unsafe { av_read_frame(self.ctx, packet.as_mut_ptr()) })
    }

    fn seek(&mut self, stream: usize, timestamp: i64, flags: SeekFlags) -> Status {
        let Ok(stream) = c_int::try_from(stream) else {
            return Status::Error(ffmpeg_next::ffi::AVERROR(ffmpeg_next::ffi::EINVAL));
        };
        // SAFETY: ctx is a valid open input. Our flag bits match AVSEEK_FLAG_*.
        status(unsafe { av_seek_frame(self.ctx, stream, timestamp, flags.0 as c_int) })
    }

    fn format(&self) -> FormatInfo {
        // SAFETY: an open input always has its demuxer set.
        let iformat = unsafe { (*self.ctx).iformat };
        if iformat.is_null() {
            return FormatInfo::default();
        }
        // SAFETY: checked for null above.
        let iformat = unsafe { &*iformat };
        FormatInfo {
            name: c_str(iformat.name),
            long_name: c_str(iformat.long_name),
            mime_type: c_str(iformat.mime_type),
        }
    }

    fn duration(&self) -> Option<i64> {
        // SAFETY: ctx is a valid open input.
        timestamp(unsafe { (*self.ctx).duration })
    }
}

impl Drop for FfmpegInput {
    fn drop(&mut self) {
        // SAFETY: ctx was opened by avformat_open_input and is closed once.
        unsafe { avformat_close_input(&mut self.ctx) };
    }
}

impl std::fmt::Debug for FfmpegInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegInput")
            .field("format", &self.format().name)
            .field("streams", &self.streams().len())
            .finish()
    }
}

impl RawPacket for Packet {
    fn stream_index(&self) -> usize {
        self.stream()
    }

    fn data(&self) -> &[u8] {
        Packet::data(self).unwrap_or(&[])
    }

    fn pts(&self) -> Option<i64> {
        Packet::pts(self)
    }

    fn dts(&self) -> Option<i64> {
        Packet::dts(self)
    }

    fn pos(&self) -> Option<i64> {
        let pos = self.position();
        (pos >= 0).then_some(pos as i64)
    }

    fn duration(&self) -> i64 {
        Packet::duration(self)
    }

    fn flags(&self) -> PacketFlags {
        // SAFETY: reading a plain field of a valid packet.
        let raw = unsafe { (*self.as_ptr()).flags } as u32;
        PacketFlags(raw & (PacketFlags::KEY | PacketFlags::CORRUPT | PacketFlags::DISCARD).0)
    }

    fn reference(&mut self, source: &Self) -> Status {
        // SAFETY: both packets are valid; self is blank.
        status(unsafe { av_packet_ref(self.as_mut_ptr(), source.as_ptr()) })
    }

    fn unref(&mut self) {
        // SAFETY: the packet is valid.
        unsafe { av_packet_unref(self.as_mut_ptr()) };
    }
}
