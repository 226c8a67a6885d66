/*!
    Audio streams: decoding and resampling to interleaved stereo 16-bit PCM.
*/

use media_types::{AudioFrame, AudioParams, CodecDescriptor, Error, Result, StreamInfo};
use tracing::{debug, trace};

use super::state::{DecodeSession, Step, StreamCore};
use crate::engine::{Backend, Decoder, Resampler, Samples};
use crate::outcome::Outcome;

const BYTES_PER_OUTPUT_SAMPLE: usize = AudioFrame::CHANNELS as usize * AudioFrame::BYTES_PER_SAMPLE;

struct AudioDecode<B: Backend> {
    samples: B::Samples,
    resampler: B::Resampler,
    /// Reusable PCM scratch buffer. Grows on demand, never shrinks.
    pcm: Vec<u8>,
}

/**
    A decodable audio sub-stream.
*/
pub struct AudioStream<B: Backend> {
    pub(crate) core: StreamCore<B>,
    decode: Option<AudioDecode<B>>,
}

impl<B: Backend> AudioStream<B> {
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

    fn params(&self) -> AudioParams {
        self.core.info.audio.clone().unwrap_or_default()
    }

    pub fn channel_count(&self) -> u16 {
        self.params().channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.params().sample_rate
    }

    /**
        Number of samples per channel in one coded frame, 0 if variable.
    */
    pub fn frame_size(&self) -> u32 {
        self.params().frame_size
    }

    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /**
        Current size of the PCM scratch buffer in bytes, 0 when closed.
    */
    pub fn buffer_capacity(&self) -> usize {
        self.decode.as_ref().map_or(0, |d| d.pcm.len())
    }

    /**
        Open for decoding. Output is always stereo signed 16-bit at the
        source sample rate.
    */
    pub fn open(&mut self) -> Result<()> {
        self.core.ensure_closed()?;

        let backend = self.core.backend.clone();
        let session = DecodeSession::open(backend.as_ref(), &self.core.params)?;
        let samples = backend.alloc_samples()?;
        let resampler = backend.open_resampler(session.decoder(), &self.params())?;

        debug!(
            stream = self.index(),
            sample_rate = self.sample_rate(),
            channels = self.channel_count(),
            "audio resampler ready"
        );

        self.core.begin(session);
        self.decode = Some(AudioDecode {
            samples,
            resampler,
            pcm: Vec::new(),
        });
        Ok(())
    }

    /**
        Decode the next frame.

        Returns [`Outcome::Retry`] when the decoder needs another packet, and
        [`Outcome::End`] once the decoder is drained after the end of input.
    */
    pub fn read_audio_frame(&mut self) -> Result<Outcome<AudioFrame>> {
        let index = self.core.index();
        let sample_rate = self.sample_rate();
        let decode = self.decode.as_mut().ok_or(Error::NotOpen { index })?;

        let samples = &mut decode.samples;
        let info = match self.core.decode_step(|d| {
            let status = d.receive_samples(samples);
            (status, samples.pts())
        })? {
            Step::Decoded(info) => info,
            Step::NeedMoreInput => return Ok(Outcome::Retry),
            Step::Drained => return Ok(Outcome::End),
        };

        let capacity = decode.resampler.max_output(decode.samples.sample_count());
        let needed = capacity * BYTES_PER_OUTPUT_SAMPLE;
        if decode.pcm.len() < needed {
            debug!(
                stream = index,
                from = decode.pcm.len(),
                to = needed,
                "growing PCM buffer"
            );
            decode.pcm = vec![0; needed];
        }

        let written = decode
            .resampler
            .convert(&decode.samples, &mut decode.pcm, capacity)
            .map_err(|code| Error::Convert {
                context: "resample the audio frame",
                code,
            })?;
        let len = written.min(capacity) * BYTES_PER_OUTPUT_SAMPLE;

        trace!(
            stream = index,
            pts = ?info.pts,
            samples = written,
            "audio frame decoded"
        );

        Ok(Outcome::Ready(AudioFrame::new(
            info,
            sample_rate,
            decode.pcm[..len].to_vec(),
        )))
    }

    /**
        Release the decoder, the resampler and the PCM buffer.
    */
    pub fn close(&mut self) -> Result<()> {
        self.core.end()?;
        self.decode = None;
        Ok(())
    }
}

impl<B: Backend> std::fmt::Debug for AudioStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("core", &self.core)
            .field("buffer_capacity", &self.buffer_capacity())
            .finish()
    }
}
