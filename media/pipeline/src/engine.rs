/*!
    The native engine contract.

    The pipeline never talks to a decoding library directly. Everything it
    needs from one (demuxing, decoding, bitstream filtering, color conversion
    and resampling) goes through the [`Backend`] trait, whose associated types
    own the native handles. Dropping a handle releases it.

    Native calls report one of four outcomes through [`Status`]. "Try again"
    is a normal outcome, never an error.
*/

use media_types::{
    AudioParams, CodecDescriptor, InterpolationAlgorithm, MediaKind, Packet, PacketFlags,
    Rational, Result, StreamInfo,
};

use crate::options::OpenOptions;

/**
    Outcome of a single native call.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The call completed.
    Ok,
    /// The call can't make progress until the other side of the exchange is
    /// serviced (more input must be sent, or output must be received first).
    Again,
    /// The end of the data was reached.
    Eof,
    /// Any other failure, with the engine's negative status code.
    Error(i32),
}

/**
    Flags for [`Input::seek`].
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeekFlags(pub u32);

impl SeekFlags {
    /// Seek to the closest keyframe at or before the target.
    pub const BACKWARD: Self = Self(0x1);
    /// The target is a byte position.
    pub const BYTE: Self = Self(0x2);
    /// Seek to any frame, not only keyframes.
    pub const ANY: Self = Self(0x4);
    /// The target is a frame number.
    pub const FRAME: Self = Self(0x8);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/**
    Container level metadata reported by an opened input.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormatInfo {
    pub name: String,
    pub long_name: String,
    pub mime_type: String,
}

/**
    A sub-stream found during discovery: the engine-neutral metadata plus the
    engine's own codec parameters, used later to build decoders and filters.
*/
#[derive(Clone, Debug)]
pub struct NativeStream<P> {
    pub info: StreamInfo,
    pub params: P,
}

/**
    A reference-counted native packet buffer.

    The pipeline allocates a handful of these up front and reuses them: the
    container reads into one, streams reference its payload into their own.
*/
pub trait RawPacket {
    fn stream_index(&self) -> usize;
    fn data(&self) -> &[u8];
    fn pts(&self) -> Option<i64>;
    fn dts(&self) -> Option<i64>;
    fn pos(&self) -> Option<i64>;
    fn duration(&self) -> i64;
    fn flags(&self) -> PacketFlags;

    /**
        Make this packet a new reference to `source`'s payload and properties.

        The packet must be blank (freshly allocated or unreferenced).
    */
    fn reference(&mut self, source: &Self) -> Status;

    /**
        Drop the payload reference and reset the properties. The buffer itself
        stays allocated for reuse.
    */
    fn unref(&mut self);
}

/**
    Build an owned [`Packet`] snapshot from a native packet.
*/
pub fn snapshot<P: RawPacket>(raw: &P, kind: MediaKind) -> Packet {
    Packet::new(raw.stream_index(), kind, raw.data().to_vec())
        .with_timing(raw.pts(), raw.dts(), raw.duration())
        .with_position(raw.pos())
        .with_flags(raw.flags())
}

/**
    An opened container.
*/
pub trait Input {
    type Parameters;
    type Packet: RawPacket;

    /**
        Probe the sub-streams, in container order. Fails with the engine's
        status code.
    */
    fn discover(&mut self) -> std::result::Result<Vec<NativeStream<Self::Parameters>>, i32>;

    /**
        Read the next packet into `packet`, which must be blank.
    */
    fn read(&mut self, packet: &mut Self::Packet) -> Status;

    /**
        Reposition the read cursor of the container at `timestamp`, expressed
        in the time base of sub-stream `stream`.
    */
    fn seek(&mut self, stream: usize, timestamp: i64, flags: SeekFlags) -> Status;

    fn format(&self) -> FormatInfo;

    /**
        Duration of the whole container in microseconds, if known.
    */
    fn duration(&self) -> Option<i64>;
}

/**
    An opened decode context.
*/
pub trait Decoder {
    type Packet;
    type Picture;
    type Samples;

    /**
        Submit a compressed unit, or the end-of-stream marker when `packet` is
        `None`.
    */
    fn send(&mut self, packet: Option<&Self::Packet>) -> Status;

    fn receive_picture(&mut self, picture: &mut Self::Picture) -> Status;
    fn receive_samples(&mut self, samples: &mut Self::Samples) -> Status;

    /**
        Discard all buffered input and output, and leave draining mode.
    */
    fn flush(&mut self);
}

/**
    A decoded, not yet converted, video picture.
*/
pub trait Picture {
    fn pts(&self) -> Option<i64>;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/**
    A decoded, not yet converted, block of audio samples.
*/
pub trait Samples {
    fn pts(&self) -> Option<i64>;

    /// Number of samples per channel.
    fn sample_count(&self) -> usize;
}

pub trait BitstreamFilter {
    type Packet;

    /**
        Push a packet into the filter. The filter takes over the payload
        reference and leaves `packet` blank.
    */
    fn send(&mut self, packet: &mut Self::Packet) -> Status;

    /**
        Signal the end of input. Packets held back by the filter become
        available to [`BitstreamFilter::receive`].
    */
    fn send_eof(&mut self) -> Status;

    /**
        Pull a rewritten packet into `packet`, which must be blank.
    */
    fn receive(&mut self, packet: &mut Self::Packet) -> Status;

    /**
        Discard buffered packets and leave the end-of-input state.
    */
    fn reset(&mut self);
}

/**
    Color-space conversion to packed RGBA.
*/
pub trait Scaler {
    type Picture;

    /**
        Convert `picture` into `target`, whose rows are `stride` bytes apart.
        Fails with the engine's status code.
    */
    fn scale(
        &mut self,
        picture: &Self::Picture,
        target: &mut [u8],
        stride: usize,
    ) -> std::result::Result<(), i32>;
}

/**
    Conversion to interleaved stereo signed 16-bit samples at the source rate.
*/
pub trait Resampler {
    type Samples;

    /**
        Upper bound on the number of output samples per channel produced from
        `input` input samples, including any delayed samples.
    */
    fn max_output(&self, input: usize) -> usize;

    /**
        Convert `samples` into `target`, writing at most `capacity` samples
        per channel. Returns the number of samples per channel written.
    */
    fn convert(
        &mut self,
        samples: &Self::Samples,
        target: &mut [u8],
        capacity: usize,
    ) -> std::result::Result<usize, i32>;
}

/**
    A native decoding engine.
*/
pub trait Backend {
    type Parameters: Clone;
    type Packet: RawPacket;
    type Picture: Picture;
    type Samples: Samples;
    type Input: Input<Parameters = Self::Parameters, Packet = Self::Packet>;
    type Decoder: Decoder<Packet = Self::Packet, Picture = Self::Picture, Samples = Self::Samples>;
    type Filter: BitstreamFilter<Packet = Self::Packet>;
    type Scaler: Scaler<Picture = Self::Picture>;
    type Resampler: Resampler<Samples = Self::Samples>;

    /**
        Open a source by path or URL.
    */
    fn open_input(&self, location: &str, options: &OpenOptions) -> Result<Self::Input>;

    /**
        Look up a decoder for the codec of a sub-stream. `None` means the
        sub-stream can't be decoded.
    */
    fn find_decoder(&self, params: &Self::Parameters) -> Option<CodecDescriptor>;

    fn open_decoder(&self, params: &Self::Parameters) -> Result<Self::Decoder>;

    fn alloc_packet(&self) -> Result<Self::Packet>;
    fn alloc_picture(&self) -> Result<Self::Picture>;
    fn alloc_samples(&self) -> Result<Self::Samples>;

    /**
        Build and initialize a bitstream filter chain from a chain description
        string such as `h264_mp4toannexb`.
    */
    fn open_filter(
        &self,
        spec: &str,
        params: &Self::Parameters,
        time_base: Rational,
    ) -> Result<Self::Filter>;

    /**
        Build a scaler from the decoder's output picture format to RGBA at
        `width`x`height`.
    */
    fn open_scaler(
        &self,
        decoder: &Self::Decoder,
        width: u32,
        height: u32,
        algorithm: InterpolationAlgorithm,
    ) -> Result<Self::Scaler>;

    /**
        Build a resampler from the decoder's output layout, format and rate to
        stereo signed 16-bit at the same rate.
    */
    fn open_resampler(&self, decoder: &Self::Decoder, source: &AudioParams)
    -> Result<Self::Resampler>;

    /**
        Process-wide network subsystem setup. Returns the engine's status
        code, negative on failure.
    */
    fn network_init(&self) -> i32;
    fn network_deinit(&self) -> i32;
}
