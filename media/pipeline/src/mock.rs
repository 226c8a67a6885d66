/*!
    Scripted in-memory engine used by the unit tests.

    Every native handle it hands out is counted in a shared ledger while it
    is alive, so tests can assert that the pipeline releases everything it
    allocates. Allocations can be made to fail on demand.
*/

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use media_types::{
    AudioParams, CodecDescriptor, Error, InterpolationAlgorithm, MediaKind, PacketFlags,
    PixelFormat, Rational, Result, SampleFormat, StreamInfo, VideoParams,
};

use crate::container::Container;
use crate::engine::{
    Backend, BitstreamFilter, Decoder, FormatInfo, Input, NativeStream, Picture, RawPacket,
    Resampler, Samples, Scaler, SeekFlags, Status,
};
use crate::options::OpenOptions;

pub(crate) const EINVAL: i32 = -22;
pub(crate) const EIO: i32 = -5;
pub(crate) const ENOENT: i32 = -2;

#[derive(Clone, Debug)]
pub(crate) struct MockParams {
    kind: MediaKind,
    codec: Option<&'static str>,
    time_base: Rational,
    width: u32,
    height: u32,
    sample_rate: u32,
    channels: u16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PacketData {
    stream_index: usize,
    data: Vec<u8>,
    pts: Option<i64>,
    duration: i64,
    flags: PacketFlags,
}

#[derive(Clone, Debug)]
enum Entry {
    Packet(PacketData),
    Again,
    Error(i32),
}

#[derive(Default)]
struct State {
    streams: Vec<MockParams>,
    script: Vec<Entry>,
    live: BTreeMap<&'static str, i64>,
    fail: Option<&'static str>,
    decoder_delay: usize,
    busy_sends: usize,
    seeks: Vec<(usize, i64, SeekFlags)>,
    seek_error: Option<i32>,
    network_status: i32,
    network_sessions: i64,
}

fn lock(state: &Arc<Mutex<State>>) -> MutexGuard<'_, State> {
    state.lock().unwrap()
}

/**
    Counts one live native handle of `kind` until dropped.
*/
struct Tracked {
    state: Arc<Mutex<State>>,
    kind: &'static str,
}

impl Tracked {
    fn new(state: &Arc<Mutex<State>>, kind: &'static str) -> Self {
        *lock(state).live.entry(kind).or_default() += 1;
        Self {
            state: state.clone(),
            kind,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        *lock(&self.state).live.entry(self.kind).or_default() -= 1;
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn with_stream(self, params: MockParams) -> Self {
        lock(&self.state).streams.push(params);
        self
    }

    pub(crate) fn with_video(
        self,
        codec: Option<&'static str>,
        time_base: Rational,
        width: u32,
        height: u32,
    ) -> Self {
        self.with_stream(MockParams {
            kind: MediaKind::Video,
            codec,
            time_base,
            width,
            height,
            sample_rate: 0,
            channels: 0,
        })
    }

    pub(crate) fn with_audio(
        self,
        codec: Option<&'static str>,
        time_base: Rational,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        self.with_stream(MockParams {
            kind: MediaKind::Audio,
            codec,
            time_base,
            width: 0,
            height: 0,
            sample_rate,
            channels,
        })
    }

    pub(crate) fn with_data(self) -> Self {
        self.with_stream(MockParams {
            kind: MediaKind::Data,
            codec: None,
            time_base: Rational::new(1, 1000),
            width: 0,
            height: 0,
            sample_rate: 0,
            channels: 0,
        })
    }

    fn push(self, entry: Entry) -> Self {
        lock(&self.state).script.push(entry);
        self
    }

    /**
        Script a keyframe packet lasting one tick.
    */
    pub(crate) fn packet(self, stream: usize, pts: i64, data: &[u8]) -> Self {
        self.push(Entry::Packet(PacketData {
            stream_index: stream,
            data: data.to_vec(),
            pts: Some(pts),
            duration: 1,
            flags: PacketFlags::KEY,
        }))
    }

    /**
        Script a non-keyframe packet lasting one tick.
    */
    pub(crate) fn delta_packet(self, stream: usize, pts: i64, data: &[u8]) -> Self {
        self.push(Entry::Packet(PacketData {
            stream_index: stream,
            data: data.to_vec(),
            pts: Some(pts),
            duration: 1,
            flags: PacketFlags::default(),
        }))
    }

    /**
        Script an audio packet that decodes to `samples` samples per channel.
    */
    pub(crate) fn audio_packet(self, stream: usize, pts: i64, samples: usize) -> Self {
        self.push(Entry::Packet(PacketData {
            stream_index: stream,
            data: b"audio".to_vec(),
            pts: Some(pts),
            duration: samples as i64,
            flags: PacketFlags::KEY,
        }))
    }

    pub(crate) fn again(self) -> Self {
        self.push(Entry::Again)
    }

    pub(crate) fn read_error(self, code: i32) -> Self {
        self.push(Entry::Error(code))
    }

    /**
        Number of packets decoders buffer before producing their first unit.
    */
    pub(crate) fn decoder_delay(self, delay: usize) -> Self {
        lock(&self.state).decoder_delay = delay;
        self
    }

    /**
        Make the next `count` packet submissions to any decoder report that
        its output must be received first.
    */
    pub(crate) fn busy_sends(&self, count: usize) {
        lock(&self.state).busy_sends = count;
    }

    /**
        Make the next allocation of `kind` fail.
    */
    pub(crate) fn fail_next(&self, kind: &'static str) {
        lock(&self.state).fail = Some(kind);
    }

    pub(crate) fn fail_seeks(&self, code: i32) {
        lock(&self.state).seek_error = Some(code);
    }

    pub(crate) fn fail_network(&self, code: i32) {
        lock(&self.state).network_status = code;
    }

    /**
        Number of live handles of `kind`.
    */
    pub(crate) fn live(&self, kind: &str) -> i64 {
        lock(&self.state).live.get(kind).copied().unwrap_or(0)
    }

    pub(crate) fn seeks(&self) -> Vec<(usize, i64, SeekFlags)> {
        lock(&self.state).seeks.clone()
    }

    pub(crate) fn network_sessions(&self) -> i64 {
        lock(&self.state).network_sessions
    }

    pub(crate) fn open(&self) -> Container<MockBackend> {
        Container::open_with(Arc::new(self.clone()), "mock://input", OpenOptions::default())
            .unwrap()
    }

    fn should_fail(&self, kind: &'static str) -> bool {
        let mut state = lock(&self.state);
        if state.fail == Some(kind) {
            state.fail = None;
            return true;
        }
        false
    }

    fn allocate(&self, kind: &'static str) -> Result<Tracked> {
        if self.should_fail(kind) {
            return Err(Error::allocation(kind));
        }
        Ok(Tracked::new(&self.state, kind))
    }
}

pub(crate) struct MockPacket {
    data: PacketData,
    _tracked: Tracked,
}

impl RawPacket for MockPacket {
    fn stream_index(&self) -> usize {
        self.data.stream_index
    }

    fn data(&self) -> &[u8] {
        &self.data.data
    }

    fn pts(&self) -> Option<i64> {
        self.data.pts
    }

    fn dts(&self) -> Option<i64> {
        self.data.pts
    }

    fn pos(&self) -> Option<i64> {
        None
    }

    fn duration(&self) -> i64 {
        self.data.duration
    }

    fn flags(&self) -> PacketFlags {
        self.data.flags
    }

    fn reference(&mut self, source: &Self) -> Status {
        self.data = source.data.clone();
        Status::Ok
    }

    fn unref(&mut self) {
        self.data = PacketData::default();
    }
}

pub(crate) struct MockInput {
    state: Arc<Mutex<State>>,
    position: usize,
    _tracked: Tracked,
}

impl Input for MockInput {
    type Parameters = MockParams;
    type Packet = MockPacket;

    fn discover(&mut self) -> std::result::Result<Vec<NativeStream<MockParams>>, i32> {
        let mut state = lock(&self.state);
        if state.fail == Some("discover") {
            state.fail = None;
            return Err(EIO);
        }

        let streams = state
            .streams
            .iter()
            .enumerate()
            .map(|(index, params)| NativeStream {
                info: StreamInfo {
                    index,
                    kind: params.kind,
                    time_base: params.time_base,
                    frame_rate: Rational::new(25, 1),
                    duration: -1,
                    frame_count: 0,
                    bit_rate: 128_000,
                    video: (params.kind == MediaKind::Video).then(|| VideoParams {
                        width: params.width,
                        height: params.height,
                        pixel_format: Some(PixelFormat::Yuv420p),
                        sample_aspect_ratio: Rational::new(1, 1),
                    }),
                    audio: (params.kind == MediaKind::Audio).then(|| AudioParams {
                        sample_rate: params.sample_rate,
                        channels: params.channels,
                        sample_format: Some(SampleFormat::F32),
                        frame_size: 1024,
                    }),
                },
                params: params.clone(),
            })
            .collect();
        Ok(streams)
    }

    fn read(&mut self, packet: &mut MockPacket) -> Status {
        let entry = lock(&self.state).script.get(self.position).cloned();
        match entry {
            Some(entry) => {
                self.position += 1;
                match entry {
                    Entry::Packet(data) => {
                        packet.data = data;
                        Status::Ok
                    }
                    Entry::Again => Status::Again,
                    Entry::Error(code) => Status::Error(code),
                }
            }
            None => Status::Eof,
        }
    }

    fn seek(&mut self, stream: usize, timestamp: i64, flags: SeekFlags) -> Status {
        let mut state = lock(&self.state);
        state.seeks.push((stream, timestamp, flags));
        if let Some(code) = state.seek_error {
            return Status::Error(code);
        }

        self.position = state
            .script
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| match entry {
                Entry::Packet(p)
                    if p.stream_index == stream
                        && p.flags.contains(PacketFlags::KEY)
                        && p.pts.is_some_and(|pts| pts <= timestamp) =>
                {
                    Some(position)
                }
                _ => None,
            })
            .next_back()
            .unwrap_or(0);
        Status::Ok
    }

    fn format(&self) -> FormatInfo {
        FormatInfo {
            name: "mock".to_string(),
            long_name: "Scripted test input".to_string(),
            mime_type: String::new(),
        }
    }

    fn duration(&self) -> Option<i64> {
        Some(10_000_000)
    }
}

pub(crate) struct MockDecoder {
    state: Arc<Mutex<State>>,
    params: MockParams,
    queue: VecDeque<PacketData>,
    eof: bool,
    delay: usize,
    _tracked: Tracked,
}

impl MockDecoder {
    fn next(&mut self) -> Option<PacketData> {
        if self.queue.len() > self.delay || self.eof {
            return self.queue.pop_front();
        }
        None
    }

    fn exhausted(&self) -> Status {
        if self.eof { Status::Eof } else { Status::Again }
    }
}

impl Decoder for MockDecoder {
    type Packet = MockPacket;
    type Picture = MockPicture;
    type Samples = MockSamples;

    fn send(&mut self, packet: Option<&MockPacket>) -> Status {
        if self.eof {
            return Status::Eof;
        }
        let Some(packet) = packet else {
            self.eof = true;
            return Status::Ok;
        };
        {
            let mut state = lock(&self.state);
            if state.busy_sends > 0 {
                state.busy_sends -= 1;
                return Status::Again;
            }
        }
        if packet.data.data == b"bad" {
            return Status::Error(EINVAL);
        }
        self.queue.push_back(packet.data.clone());
        Status::Ok
    }

    fn receive_picture(&mut self, picture: &mut MockPicture) -> Status {
        match self.next() {
            Some(packet) => {
                picture.pts = packet.pts;
                picture.width = self.params.width;
                picture.height = self.params.height;
                Status::Ok
            }
            None => self.exhausted(),
        }
    }

    fn receive_samples(&mut self, samples: &mut MockSamples) -> Status {
        match self.next() {
            Some(packet) => {
                samples.pts = packet.pts;
                samples.count = packet.duration as usize;
                Status::Ok
            }
            None => self.exhausted(),
        }
    }

    fn flush(&mut self) {
        self.queue.clear();
        self.eof = false;
    }
}

pub(crate) struct MockPicture {
    pts: Option<i64>,
    width: u32,
    height: u32,
    _tracked: Tracked,
}

impl Picture for MockPicture {
    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

pub(crate) struct MockSamples {
    pts: Option<i64>,
    count: usize,
    _tracked: Tracked,
}

impl Samples for MockSamples {
    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn sample_count(&self) -> usize {
        self.count
    }
}

/**
    Tags every packet with an `F:` prefix. The `hold` variant keeps one
    packet buffered until the next one or the end of input arrives. The
    `split` variant turns every packet into two, suffixed `/0` and `/1`.

    Like a native filter, it refuses input while rewritten packets are
    waiting to be received.
*/
pub(crate) struct MockFilter {
    queue: VecDeque<PacketData>,
    hold: usize,
    split: bool,
    eof: bool,
    _tracked: Tracked,
}

impl BitstreamFilter for MockFilter {
    type Packet = MockPacket;

    fn send(&mut self, packet: &mut MockPacket) -> Status {
        if self.eof {
            return Status::Eof;
        }
        if self.queue.len() > self.hold {
            return Status::Again;
        }
        let data = std::mem::take(&mut packet.data);
        let tag = |suffix: &[u8]| {
            let mut tagged = data.clone();
            tagged.data = [b"F:".as_slice(), data.data.as_slice(), suffix].concat();
            tagged
        };
        if self.split {
            self.queue.push_back(tag(b"/0"));
            self.queue.push_back(tag(b"/1"));
        } else {
            self.queue.push_back(tag(b""));
        }
        Status::Ok
    }

    fn send_eof(&mut self) -> Status {
        self.eof = true;
        Status::Ok
    }

    fn receive(&mut self, packet: &mut MockPacket) -> Status {
        if !self.eof && self.queue.len() <= self.hold {
            return Status::Again;
        }
        match self.queue.pop_front() {
            Some(data) => {
                packet.data = data;
                Status::Ok
            }
            None if self.eof => Status::Eof,
            None => Status::Again,
        }
    }

    fn reset(&mut self) {
        self.queue.clear();
        self.eof = false;
    }
}

/**
    Fills every pixel with `[pts, x, y, 255]`.
*/
pub(crate) struct MockScaler {
    width: u32,
    height: u32,
    _tracked: Tracked,
}

impl Scaler for MockScaler {
    type Picture = MockPicture;

    fn scale(
        &mut self,
        picture: &MockPicture,
        target: &mut [u8],
        stride: usize,
    ) -> std::result::Result<(), i32> {
        if target.len() < stride * self.height as usize {
            return Err(EINVAL);
        }
        let tag = picture.pts.unwrap_or(0) as u8;
        for y in 0..self.height as usize {
            for x in 0..self.width as usize {
                let offset = y * stride + x * 4;
                target[offset..offset + 4].copy_from_slice(&[tag, x as u8, y as u8, 255]);
            }
        }
        Ok(())
    }
}

/**
    Writes the frame's pts as every 16-bit sample.
*/
pub(crate) struct MockResampler {
    _tracked: Tracked,
}

impl Resampler for MockResampler {
    type Samples = MockSamples;

    fn max_output(&self, input: usize) -> usize {
        input
    }

    fn convert(
        &mut self,
        samples: &MockSamples,
        target: &mut [u8],
        capacity: usize,
    ) -> std::result::Result<usize, i32> {
        if samples.count > capacity || target.len() < samples.count * 4 {
            return Err(EINVAL);
        }
        let value = (samples.pts.unwrap_or(0) as i16).to_ne_bytes();
        for chunk in target[..samples.count * 4].chunks_exact_mut(2) {
            chunk.copy_from_slice(&value);
        }
        Ok(samples.count)
    }
}

impl Backend for MockBackend {
    type Parameters = MockParams;
    type Packet = MockPacket;
    type Picture = MockPicture;
    type Samples = MockSamples;
    type Input = MockInput;
    type Decoder = MockDecoder;
    type Filter = MockFilter;
    type Scaler = MockScaler;
    type Resampler = MockResampler;

    fn open_input(&self, location: &str, _options: &OpenOptions) -> Result<MockInput> {
        if location == "missing" || self.should_fail("input") {
            return Err(Error::Open {
                location: location.to_string(),
                code: ENOENT,
            });
        }
        Ok(MockInput {
            state: self.state.clone(),
            position: 0,
            _tracked: Tracked::new(&self.state, "input"),
        })
    }

    fn find_decoder(&self, params: &MockParams) -> Option<CodecDescriptor> {
        params.codec.map(|name| CodecDescriptor {
            name: name.to_string(),
            long_name: format!("{name} (mock)"),
        })
    }

    fn open_decoder(&self, params: &MockParams) -> Result<MockDecoder> {
        let _tracked = self.allocate("decoder")?;
        let state = lock(&self.state);
        Ok(MockDecoder {
            state: self.state.clone(),
            params: params.clone(),
            queue: VecDeque::new(),
            eof: false,
            delay: state.decoder_delay,
            _tracked,
        })
    }

    fn alloc_packet(&self) -> Result<MockPacket> {
        Ok(MockPacket {
            data: PacketData::default(),
            _tracked: self.allocate("packet")?,
        })
    }

    fn alloc_picture(&self) -> Result<MockPicture> {
        Ok(MockPicture {
            pts: None,
            width: 0,
            height: 0,
            _tracked: self.allocate("picture")?,
        })
    }

    fn alloc_samples(&self) -> Result<MockSamples> {
        Ok(MockSamples {
            pts: None,
            count: 0,
            _tracked: self.allocate("samples")?,
        })
    }

    fn open_filter(
        &self,
        spec: &str,
        _params: &MockParams,
        _time_base: Rational,
    ) -> Result<MockFilter> {
        let (hold, split) = match spec {
            "tag" => (0, false),
            "tag=hold" => (1, false),
            "tag=split" => (0, true),
            _ => {
                return Err(Error::FilterInit {
                    context: "find the bitstream filter",
                    code: EINVAL,
                });
            }
        };
        if self.should_fail("filter") {
            return Err(Error::FilterInit {
                context: "allocate the bitstream filter",
                code: EINVAL,
            });
        }
        Ok(MockFilter {
            queue: VecDeque::new(),
            hold,
            split,
            eof: false,
            _tracked: Tracked::new(&self.state, "filter"),
        })
    }

    fn open_scaler(
        &self,
        _decoder: &MockDecoder,
        width: u32,
        height: u32,
        _algorithm: InterpolationAlgorithm,
    ) -> Result<MockScaler> {
        Ok(MockScaler {
            width,
            height,
            _tracked: self.allocate("scaler")?,
        })
    }

    fn open_resampler(&self, _decoder: &MockDecoder, _source: &AudioParams) -> Result<MockResampler> {
        Ok(MockResampler {
            _tracked: self.allocate("resampler")?,
        })
    }

    fn network_init(&self) -> i32 {
        let mut state = lock(&self.state);
        if state.network_status >= 0 {
            state.network_sessions += 1;
        }
        state.network_status
    }

    fn network_deinit(&self) -> i32 {
        let mut state = lock(&self.state);
        state.network_sessions -= 1;
        state.network_status
    }
}
