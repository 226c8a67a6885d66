/*!
    Video streams: decoding and conversion to RGBA.
*/

use media_types::{
    CodecDescriptor, Error, InterpolationAlgorithm, Rational, Result, StreamInfo, VideoFrame,
    VideoParams,
};
use tracing::{debug, trace};

use super::state::{DecodeSession, Step, StreamCore};
use crate::engine::{Backend, Decoder, Picture, Scaler};
use crate::options::VideoOpenOptions;
use crate::outcome::Outcome;

/**
    Conversion resources of an open video stream.
*/
struct VideoDecode<B: Backend> {
    picture: B::Picture,
    scaler: B::Scaler,
    /// Reusable RGBA scratch buffer, sized once for the configured output.
    rgba: Vec<u8>,
    options: VideoOpenOptions,
}

/**
    A decodable video sub-stream.

    Frames are decoded into a reusable picture, converted to RGBA at the size
    chosen in [`VideoStream::open_decode`], and handed out as owned copies.
*/
pub struct VideoStream<B: Backend> {
    pub(crate) core: StreamCore<B>,
    decode: Option<VideoDecode<B>>,
}

impl<B: Backend> VideoStream<B> {
    pub(crate) fn new(core: StreamCore<B>) -> Self {
        Self { core, decode: None }
    }

    pub fn index(&self) -> usize {
        self.core.index()
    }

    pub fn info(&self) -> &StreamInfo {
        &self.core.info
    }

    pub fn codec(&self) -> Option<&CodecDescriptor> {
        self.core.codec.as_ref()
    }

    fn params(&self) -> VideoParams {
        self.core.info.video.clone().unwrap_or_default()
    }

    /**
        Width of the coded picture, in pixels.
    */
    pub fn width(&self) -> u32 {
        self.params().width
    }

    /**
        Height of the coded picture, in pixels.
    */
    pub fn height(&self) -> u32 {
        self.params().height
    }

    /**
        Sample (pixel) aspect ratio, 0/1 if unknown.
    */
    pub fn aspect_ratio(&self) -> Rational {
        self.params().sample_aspect_ratio
    }

    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /**
        Output configuration of the current decode session.
    */
    pub fn output(&self) -> Option<VideoOpenOptions> {
        self.decode.as_ref().map(|d| d.options)
    }

    /**
        Open for decoding at the source size with bicubic interpolation.
    */
    pub fn open(&mut self) -> Result<()> {
        let options = VideoOpenOptions::new(self.width(), self.height())
            .with_algorithm(InterpolationAlgorithm::Bicubic);
        self.open_decode(options)
    }

    /**
        Open for decoding, converting every frame to `width`x`height` RGBA.

        Either every native resource is allocated and the stream is open, or
        nothing is held and the stream stays closed.
    */
    pub fn open_decode(&mut self, options: VideoOpenOptions) -> Result<()> {
        self.core.ensure_closed()?;
        if options.width == 0 || options.height == 0 {
            return Err(Error::invalid_argument(format!(
                "output size {}x{} is empty",
                options.width, options.height
            )));
        }

        let backend = self.core.backend.clone();
        let session = DecodeSession::open(backend.as_ref(), &self.core.params)?;
        let picture = backend.alloc_picture()?;
        let scaler = backend.open_scaler(
            session.decoder(),
            options.width,
            options.height,
            options.algorithm,
        )?;
        let rgba = vec![0; options.buffer_size()];

        debug!(
            stream = self.index(),
            width = options.width,
            height = options.height,
            algorithm = ?options.algorithm,
            "video conversion ready"
        );

        self.core.begin(session);
        self.decode = Some(VideoDecode {
            picture,
            scaler,
            rgba,
            options,
        });
        Ok(())
    }

    /**
        Decode the next frame.

        Returns [`Outcome::Retry`] when the decoder needs another packet, and
        [`Outcome::End`] once the decoder is drained after the end of input.
    */
    pub fn read_video_frame(&mut self) -> Result<Outcome<VideoFrame>> {
        let index = self.core.index();
        let decode = self.decode.as_mut().ok_or(Error::NotOpen { index })?;

        let picture = &mut decode.picture;
        let info = match self.core.decode_step(|d| {
            let status = d.receive_picture(picture);
            (status, picture.pts())
        })? {
            Step::Decoded(info) => info,
            Step::NeedMoreInput => return Ok(Outcome::Retry),
            Step::Drained => return Ok(Outcome::End),
        };

        let stride = decode.options.width as usize * VideoFrame::BYTES_PER_PIXEL;
        decode
            .scaler
            .scale(&decode.picture, &mut decode.rgba, stride)
            .map_err(|code| Error::Convert {
                context: "convert the picture to RGBA",
                code,
            })?;

        trace!(
            stream = index,
            pts = ?info.pts,
            index_display = info.index_display,
            "video frame decoded"
        );

        let frame = VideoFrame::from_raw(
            info,
            decode.options.width,
            decode.options.height,
            decode.rgba.clone(),
        )
        .ok_or_else(|| Error::invalid_argument("RGBA buffer is smaller than the output size"))?;
        Ok(Outcome::Ready(frame))
    }

    /**
        Release the decoder, the conversion context and the RGBA buffer.
    */
    pub fn close(&mut self) -> Result<()> {
        self.core.end()?;
        self.decode = None;
        Ok(())
    }
}

impl<B: Backend> std::fmt::Debug for VideoStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoStream")
            .field("core", &self.core)
            .field("output", &self.output())
            .finish()
    }
}
