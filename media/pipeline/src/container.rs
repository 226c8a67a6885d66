/*!
    Container implementation.
*/

use std::sync::Arc;
use std::time::Duration;

use media_types::{Error, Packet, Result};
use tracing::{debug, info};

use crate::engine::{Backend, FormatInfo, Input, RawPacket, SeekFlags, Status};
use crate::options::OpenOptions;
use crate::outcome::Outcome;
use crate::stream::{AudioStream, Stream, VideoStream};

/**
    An opened media source and its elementary streams.

    The container is the single reader of compressed packets. Each packet is
    routed to the stream it belongs to (through that stream's bitstream
    filter, if any) and, if that stream is open, queued for its decoder.

    Streams are discovered once, when the container is opened. The stream at
    position `i` is always sub-stream `i` of the source.
*/
pub struct Container<B: Backend> {
    // Streams release their decoders before the source is closed.
    streams: Vec<Stream<B>>,
    packet: B::Packet,
    input: B::Input,
    format: FormatInfo,
    location: String,
    options: OpenOptions,
    exhausted: bool,
    backend: Arc<B>,
}

impl<B: Backend> Container<B> {
    /**
        Open `location` (a path or URL) with the given engine, and discover
        its sub-streams.
    */
    pub fn open_with(backend: Arc<B>, location: &str, options: OpenOptions) -> Result<Self> {
        let mut input = backend.open_input(location, &options)?;
        let natives = input
            .discover()
            .map_err(|code| Error::StreamDiscovery { code })?;
        let packet = backend.alloc_packet()?;

        let streams: Vec<_> = natives
            .into_iter()
            .enumerate()
            .map(|(index, mut native)| {
                native.info.index = index;
                Stream::classify(backend.clone(), native)
            })
            .collect();

        let format = input.format();
        info!(
            location,
            format = %format.name,
            streams = streams.len(),
            "container opened"
        );
        for stream in &streams {
            debug!(
                index = stream.index(),
                kind = %stream.kind(),
                codec = stream.codec_name().unwrap_or("none"),
                time_base = %stream.time_base(),
                "stream discovered"
            );
        }

        Ok(Self {
            streams,
            packet,
            input,
            format,
            location: location.to_string(),
            options,
            exhausted: false,
            backend,
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /**
        Short name of the container format, e.g. `mov,mp4,m4a,3gp,3g2,mj2`.
    */
    pub fn format_name(&self) -> &str {
        &self.format.name
    }

    pub fn format_long_name(&self) -> &str {
        &self.format.long_name
    }

    /**
        Comma separated MIME types of the container format, possibly empty.
    */
    pub fn format_mime_type(&self) -> &str {
        &self.format.mime_type
    }

    /**
        Duration of the whole media, zero if unknown.
    */
    pub fn duration(&self) -> Duration {
        self.input
            .duration()
            .and_then(|micros| u64::try_from(micros).ok())
            .map(Duration::from_micros)
            .unwrap_or_default()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn streams(&self) -> &[Stream<B>] {
        &self.streams
    }

    pub fn streams_mut(&mut self) -> &mut [Stream<B>] {
        &mut self.streams
    }

    pub fn stream(&self, index: usize) -> Result<&Stream<B>> {
        let count = self.streams.len();
        self.streams
            .get(index)
            .ok_or(Error::StreamIndex { index, count })
    }

    pub fn stream_mut(&mut self, index: usize) -> Result<&mut Stream<B>> {
        let count = self.streams.len();
        self.streams
            .get_mut(index)
            .ok_or(Error::StreamIndex { index, count })
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &VideoStream<B>> {
        self.streams.iter().filter_map(Stream::as_video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &AudioStream<B>> {
        self.streams.iter().filter_map(Stream::as_audio)
    }

    /**
        Returns true once the source has reported its end.
    */
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /**
        Read the next compressed packet.

        - `Ready(packet)`: a packet was read (and queued for its stream's
          decoder if that stream is open).
        - `Retry`: nothing is available right now, call again.
        - `End`: the source is exhausted and every bitstream filter is
          flushed. Every later call returns `End` too, and open streams start
          draining their decoders.

        Packets a bitstream filter produced on top of the one already
        returned are handed out before the source is read again.
    */
    pub fn read_packet(&mut self) -> Result<Outcome<Packet>> {
        if let Some(packet) = self.route_filtered()? {
            return Ok(Outcome::Ready(packet));
        }
        if self.exhausted {
            return Ok(Outcome::End);
        }

        match self.input.read(&mut self.packet) {
            Status::Ok => {}
            Status::Again => return Ok(Outcome::Retry),
            Status::Eof => {
                debug!(location = %self.location, "end of input");
                self.exhausted = true;
                let flushed: Vec<_> = self
                    .streams
                    .iter_mut()
                    .map(|stream| stream.core_mut().end_of_input())
                    .collect();
                flushed.into_iter().collect::<Result<()>>()?;

                return Ok(match self.route_filtered()? {
                    Some(packet) => Outcome::Ready(packet),
                    None => Outcome::End,
                });
            }
            Status::Error(code) => return Err(Error::Read { code }),
        }

        let index = self.packet.stream_index();
        let count = self.streams.len();
        let routed = match self.streams.get_mut(index) {
            Some(stream) => stream.core_mut().accept(&self.packet),
            None => Err(Error::StreamIndex { index, count }),
        };
        self.packet.unref();
        routed
    }

    fn route_filtered(&mut self) -> Result<Option<Packet>> {
        match self
            .streams
            .iter_mut()
            .find(|stream| stream.core().has_filtered())
        {
            Some(stream) => stream.core_mut().route_filtered(),
            None => Ok(None),
        }
    }

    /**
        Reposition the source at `offset` from the start of stream `index`.

        The seek lands on the closest keyframe at or before the target. Every
        stream drops the packets it had queued, bitstream filters and open
        decoders are flushed, so the next frames come from the new position.
    */
    pub fn rewind(&mut self, index: usize, offset: Duration) -> Result<()> {
        let timestamp = self.stream(index)?.rewind_position(offset)?;

        if let Status::Error(code) = self.input.seek(index, timestamp, SeekFlags::BACKWARD) {
            return Err(Error::Seek { index, code });
        }

        self.exhausted = false;
        for stream in &mut self.streams {
            stream.core_mut().reset();
        }

        debug!(stream = index, ?offset, timestamp, "rewound");
        Ok(())
    }

    /**
        Close the source, releasing every stream and native handle.
    */
    pub fn close(self) {
        debug!(location = %self.location, "container closed");
    }
}

impl<B: Backend> std::fmt::Debug for Container<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("location", &self.location)
            .field("format", &self.format.name)
            .field("streams", &self.streams)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{EIO, ENOENT, MockBackend};
    use media_types::{Frame, MediaKind, Rational};

    fn video_backend() -> MockBackend {
        MockBackend::new().with_video(Some("h264"), Rational::new(1, 25), 4, 2)
    }

    /**
        Read the whole source, decoding stream `index`, then drain it.
    */
    fn decode_all(container: &mut Container<MockBackend>, index: usize) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            match container.read_packet().unwrap() {
                Outcome::Ready(packet) if packet.stream_index() == index => {}
                Outcome::Ready(_) | Outcome::Retry => continue,
                Outcome::End => break,
            }
            let stream = container.stream_mut(index).unwrap();
            while let Outcome::Ready(frame) = stream.read_frame().unwrap() {
                frames.push(frame);
            }
        }

        let stream = container.stream_mut(index).unwrap();
        loop {
            match stream.read_frame().unwrap() {
                Outcome::Ready(frame) => frames.push(frame),
                Outcome::Retry => panic!("decoder stalled while draining"),
                Outcome::End => break,
            }
        }
        frames
    }

    #[test]
    fn open_reports_format_and_streams() {
        let backend = video_backend()
            .with_audio(Some("aac"), Rational::new(1, 48_000), 48_000, 6)
            .with_data();
        let container = backend.open();

        assert_eq!(container.format_name(), "mock");
        assert_eq!(container.format_long_name(), "Scripted test input");
        assert_eq!(container.format_mime_type(), "");
        assert_eq!(container.duration(), Duration::from_secs(10));
        assert_eq!(container.location(), "mock://input");
        assert_eq!(container.stream_count(), 3);
        assert_eq!(container.video_streams().count(), 1);
        assert_eq!(container.audio_streams().count(), 1);

        let kinds: Vec<_> = container.streams().iter().map(Stream::kind).collect();
        assert_eq!(kinds, [MediaKind::Video, MediaKind::Audio, MediaKind::Data]);
        for (i, stream) in container.streams().iter().enumerate() {
            assert_eq!(stream.index(), i);
        }
    }

    #[test]
    fn open_failures() {
        let backend = video_backend();

        let err = Container::open_with(Arc::new(backend.clone()), "missing", OpenOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            Error::Open {
                location: "missing".to_string(),
                code: ENOENT,
            }
        );

        backend.fail_next("discover");
        let err = Container::open_with(Arc::new(backend.clone()), "file", OpenOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::StreamDiscovery { code: EIO });
        assert_eq!(backend.live("input"), 0);
    }

    #[test]
    fn close_releases_everything() {
        let backend = video_backend().packet(0, 0, b"a");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();
        container.stream_mut(0).unwrap().apply_filter("tag").unwrap();
        assert!(container.read_packet().unwrap().is_ready());

        container.close();
        for kind in ["input", "packet", "decoder", "picture", "scaler", "filter"] {
            assert_eq!(backend.live(kind), 0, "{kind} leaked");
        }
    }

    #[test]
    fn read_packet_snapshots_the_packet() {
        let backend = video_backend().packet(0, 7, b"frame");
        let mut container = backend.open();

        let packet = container.read_packet().unwrap().ready().unwrap();
        assert_eq!(packet.stream_index(), 0);
        assert_eq!(packet.kind(), MediaKind::Video);
        assert_eq!(packet.data(), b"frame");
        assert_eq!(packet.pts(), Some(7));
        assert!(packet.is_keyframe());
    }

    #[test]
    fn exhausted_source_keeps_reporting_end() {
        let backend = video_backend().packet(0, 0, b"a");
        let mut container = backend.open();

        assert!(container.read_packet().unwrap().is_ready());
        assert_eq!(container.read_packet().unwrap(), Outcome::End);
        assert!(container.is_exhausted());
        assert_eq!(container.read_packet().unwrap(), Outcome::End);
        assert_eq!(container.read_packet().unwrap(), Outcome::End);
    }

    #[test]
    fn transient_read_condition_is_a_retry() {
        let backend = video_backend().again().packet(0, 0, b"a");
        let mut container = backend.open();

        assert_eq!(container.read_packet().unwrap(), Outcome::Retry);
        assert!(container.read_packet().unwrap().is_ready());
    }

    #[test]
    fn read_failure_carries_the_code() {
        let backend = video_backend().read_error(EIO);
        let mut container = backend.open();

        assert_eq!(container.read_packet(), Err(Error::Read { code: EIO }));
    }

    #[test]
    fn packet_for_unknown_stream_index() {
        let backend = video_backend().packet(5, 0, b"a").packet(0, 1, b"b");
        let mut container = backend.open();

        assert_eq!(
            container.read_packet(),
            Err(Error::StreamIndex { index: 5, count: 1 })
        );
        let packet = container.read_packet().unwrap().ready().unwrap();
        assert_eq!(packet.data(), b"b");
        assert!(matches!(
            container.stream(3),
            Err(Error::StreamIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn offsets_are_monotonic() {
        let mut backend = video_backend();
        for pts in 0..10 {
            backend = backend.packet(0, pts, b"p");
        }
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();

        let frames = decode_all(&mut container, 0);
        assert_eq!(frames.len(), 10);
        let offsets: Vec<_> = frames
            .iter()
            .map(|f| f.presentation_offset().unwrap())
            .collect();
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(offsets[9], Duration::from_millis(360));
    }

    #[test]
    fn draining_yields_buffered_frames() {
        let backend = video_backend()
            .decoder_delay(2)
            .packet(0, 0, b"a")
            .packet(0, 1, b"b")
            .packet(0, 2, b"c");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();

        let frames = decode_all(&mut container, 0);
        let pts: Vec<_> = frames.iter().map(Frame::pts).collect();
        assert_eq!(pts, [Some(0), Some(1), Some(2)]);
        let display: Vec<_> = frames.iter().map(Frame::index_display).collect();
        assert_eq!(display, [0, 1, 2]);

        let stream = container.stream_mut(0).unwrap();
        assert_eq!(stream.read_frame().unwrap(), Outcome::End);
    }

    #[test]
    fn coded_index_follows_the_originating_packet() {
        let backend = video_backend()
            .decoder_delay(2)
            .packet(0, 0, b"a")
            .packet(0, 1, b"b")
            .packet(0, 2, b"c");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();

        let frames = decode_all(&mut container, 0);
        let coded: Vec<_> = frames
            .iter()
            .map(|f| (f.pts(), f.index_coded()))
            .collect();
        assert_eq!(coded, [(Some(0), 0), (Some(1), 1), (Some(2), 2)]);
    }

    #[test]
    fn held_filter_packets_are_flushed_at_end_of_input() {
        let backend = video_backend().packet(0, 0, b"a").packet(0, 1, b"b");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();
        container
            .stream_mut(0)
            .unwrap()
            .apply_filter("tag=hold")
            .unwrap();

        let frames = decode_all(&mut container, 0);
        let pts: Vec<_> = frames.iter().map(Frame::pts).collect();
        assert_eq!(pts, [Some(0), Some(1)]);
        assert_eq!(container.read_packet().unwrap(), Outcome::End);
    }

    #[test]
    fn rewind_restarts_a_flushed_filter() {
        let backend = video_backend().packet(0, 0, b"a").packet(0, 1, b"b");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();
        container
            .stream_mut(0)
            .unwrap()
            .apply_filter("tag=hold")
            .unwrap();
        assert_eq!(decode_all(&mut container, 0).len(), 2);

        container.rewind(0, Duration::ZERO).unwrap();
        let frames = decode_all(&mut container, 0);
        let pts: Vec<_> = frames.iter().map(Frame::pts).collect();
        assert_eq!(pts, [Some(0), Some(1)]);
        assert_eq!(frames[0].index_coded(), 0);
    }

    #[test]
    fn packets_for_closed_streams_are_not_queued() {
        let backend = video_backend()
            .with_audio(Some("aac"), Rational::new(1, 48_000), 48_000, 2)
            .audio_packet(1, 0, 1024)
            .packet(0, 0, b"a");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();

        assert!(container.read_packet().unwrap().is_ready());
        assert_eq!(
            container.stream_mut(0).unwrap().read_frame().unwrap(),
            Outcome::Retry
        );
        assert!(container.read_packet().unwrap().is_ready());
        assert!(
            container
                .stream_mut(0)
                .unwrap()
                .read_frame()
                .unwrap()
                .is_ready()
        );
    }

    #[test]
    fn rewind_to_start_restarts_decoding() {
        let mut backend = video_backend();
        for pts in 0..6 {
            backend = backend.packet(0, pts, b"p");
        }
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();
        let first_pass = decode_all(&mut container, 0);
        assert_eq!(first_pass.len(), 6);
        assert!(container.is_exhausted());

        container.rewind(0, Duration::ZERO).unwrap();
        assert!(!container.is_exhausted());
        assert_eq!(backend.seeks(), [(0, 0, SeekFlags::BACKWARD)]);

        let second_pass = decode_all(&mut container, 0);
        assert_eq!(second_pass.len(), 6);
        let first = &second_pass[0];
        assert!(first.presentation_offset().unwrap() < Duration::from_millis(40));
        assert_eq!(first.index_display(), 0);
    }

    #[test]
    fn rewind_lands_on_previous_keyframe() {
        let backend = video_backend()
            .packet(0, 0, b"k")
            .delta_packet(0, 1, b"d")
            .delta_packet(0, 2, b"d")
            .packet(0, 3, b"k")
            .delta_packet(0, 4, b"d")
            .delta_packet(0, 5, b"d");
        let mut container = backend.open();
        container.stream_mut(0).unwrap().open().unwrap();
        for _ in 0..5 {
            assert!(container.read_packet().unwrap().is_ready());
        }

        // 180ms at 1/25 is tick 4, whose closest preceding keyframe is tick 3.
        container.rewind(0, Duration::from_millis(180)).unwrap();
        assert_eq!(backend.seeks(), [(0, 4, SeekFlags::BACKWARD)]);

        // The packet queued before the seek is gone.
        assert_eq!(
            container.stream_mut(0).unwrap().read_frame().unwrap(),
            Outcome::Retry
        );
        let packet = container.read_packet().unwrap().ready().unwrap();
        assert_eq!(packet.pts(), Some(3));
        let frame = container
            .stream_mut(0)
            .unwrap()
            .read_frame()
            .unwrap()
            .ready()
            .unwrap();
        assert_eq!(frame.pts(), Some(3));
    }

    #[test]
    fn rewind_failures() {
        let backend = video_backend().packet(0, 0, b"a");
        let mut container = backend.open();

        assert_eq!(
            container.rewind(2, Duration::ZERO),
            Err(Error::StreamIndex { index: 2, count: 1 })
        );

        backend.fail_seeks(EIO);
        assert_eq!(
            container.rewind(0, Duration::from_secs(1)),
            Err(Error::Seek {
                index: 0,
                code: EIO,
            })
        );
    }
}
