/*!
    State shared by every stream kind: metadata, the bitstream filter and the
    decode session.
*/

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use media_types::{CodecDescriptor, Error, FrameInfo, Packet, Result, StreamInfo};
use tracing::{debug, trace, warn};

use crate::engine::{Backend, Decoder, RawPacket, Status, snapshot};
use crate::filter::FilterState;
use crate::outcome::Outcome;

/**
    Result of one decode step.
*/
pub(crate) enum Step {
    /// The decoder produced a unit into the caller's target.
    Decoded(FrameInfo),
    /// The decoder consumed its input but has nothing to show yet.
    NeedMoreInput,
    /// The decoder is fully drained.
    Drained,
}

/// Units submitted to the decoder and not yet matched to a frame.
const MAX_IN_FLIGHT: usize = 64;

/**
    Ordinals of the compressed units the decoder accepted, keyed by their
    presentation timestamp.

    Decoders may delay and reorder their output, so a frame is matched to the
    unit carrying the same timestamp. Frames without a timestamp take the
    oldest unit still in flight.
*/
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    units: VecDeque<(Option<i64>, u64)>,
    submitted: u64,
}

impl InFlight {
    /**
        Record one unit accepted by the decoder.
    */
    pub(crate) fn submit(&mut self, pts: Option<i64>) {
        if self.units.len() == MAX_IN_FLIGHT {
            self.units.pop_front();
        }
        self.units.push_back((pts, self.submitted));
        self.submitted += 1;
    }

    /**
        Ordinal of the unit a frame with `pts` was decoded from.
    */
    pub(crate) fn resolve(&mut self, pts: Option<i64>) -> u64 {
        let last = self.submitted.saturating_sub(1);
        let position = match pts {
            Some(pts) => self.units.iter().position(|&(unit, _)| unit == Some(pts)),
            None => Some(0),
        };
        match position {
            Some(position) => self
                .units
                .remove(position)
                .map_or(last, |(_, ordinal)| ordinal),
            // A timestamp no submitted unit carried. Attribute it to the
            // oldest unit without consuming it.
            None => self.units.front().map_or(last, |&(_, ordinal)| ordinal),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.units.clear();
        self.submitted = 0;
    }
}

/**
    Native resources held while a stream is open.

    A session exists only when every resource it needs was allocated, so a
    stream is either fully open or fully closed.
*/
pub(crate) struct DecodeSession<B: Backend> {
    decoder: B::Decoder,
    /// Packet routed to this stream and not yet accepted by the decoder.
    pending: B::Packet,
    queued: bool,
    eof_sent: bool,
    in_flight: InFlight,
    /// Number of units produced by the decoder.
    displayed: u64,
}

impl<B: Backend> DecodeSession<B> {
    pub(crate) fn open(backend: &B, params: &B::Parameters) -> Result<Self> {
        let decoder = backend.open_decoder(params)?;
        let pending = backend.alloc_packet()?;

        Ok(Self {
            decoder,
            pending,
            queued: false,
            eof_sent: false,
            in_flight: InFlight::default(),
            displayed: 0,
        })
    }

    pub(crate) fn decoder(&self) -> &B::Decoder {
        &self.decoder
    }

    fn enqueue(&mut self, index: usize, packet: &B::Packet) -> Result<()> {
        if self.queued {
            warn!(stream = index, "dropping a packet the decoder never consumed");
            self.discard();
        }

        match self.pending.reference(packet) {
            Status::Error(code) => Err(Error::Allocation {
                context: "reference the packet",
                code,
            }),
            _ => {
                self.queued = true;
                Ok(())
            }
        }
    }

    fn discard(&mut self) {
        self.pending.unref();
        self.queued = false;
    }

    /**
        Drop queued input, flush the decoder and restart the unit counters.
    */
    fn reset(&mut self) {
        self.discard();
        self.decoder.flush();
        self.eof_sent = false;
        self.in_flight.clear();
        self.displayed = 0;
    }
}

pub(crate) struct StreamCore<B: Backend> {
    pub(crate) backend: Arc<B>,
    pub(crate) info: StreamInfo,
    pub(crate) params: B::Parameters,
    pub(crate) codec: Option<CodecDescriptor>,
    filter: Option<FilterState<B>>,
    session: Option<DecodeSession<B>>,
    end_of_input: bool,
}

impl<B: Backend> StreamCore<B> {
    pub(crate) fn new(
        backend: Arc<B>,
        info: StreamInfo,
        params: B::Parameters,
        codec: Option<CodecDescriptor>,
    ) -> Self {
        Self {
            backend,
            info,
            params,
            codec,
            filter: None,
            session: None,
            end_of_input: false,
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.info.index
    }

    pub(crate) fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn ensure_closed(&self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen {
                index: self.index(),
            });
        }
        Ok(())
    }

    pub(crate) fn begin(&mut self, session: DecodeSession<B>) {
        self.session = Some(session);
        self.end_of_input = false;
        debug!(stream = self.index(), kind = %self.info.kind, "stream opened");
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        if self.session.take().is_none() {
            return Err(Error::NotOpen {
                index: self.index(),
            });
        }
        debug!(stream = self.index(), kind = %self.info.kind, "stream closed");
        Ok(())
    }

    pub(crate) fn apply_filter(&mut self, spec: &str) -> Result<()> {
        let state = FilterState::open(self.backend.as_ref(), spec, &self.params, self.info.time_base)?;
        if let Some(previous) = self.filter.replace(state) {
            debug!(stream = self.index(), spec = previous.spec(), "replaced bitstream filter");
        }
        Ok(())
    }

    pub(crate) fn remove_filter(&mut self) -> Result<()> {
        match self.filter.take() {
            Some(state) => {
                debug!(stream = self.index(), spec = state.spec(), "bitstream filter removed");
                Ok(())
            }
            None => Err(Error::NoFilter {
                index: self.index(),
            }),
        }
    }

    pub(crate) fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(FilterState::spec)
    }

    /**
        Route a packet read by the container to this stream.

        The packet goes through the bitstream filter if one is applied. The
        first packet out of the filter is queued for the decoder if the stream
        is open, and returned as an owned snapshot. Further filter output is
        routed by later calls to [`StreamCore::route_filtered`].
    */
    pub(crate) fn accept(&mut self, raw: &B::Packet) -> Result<Outcome<Packet>> {
        let Some(state) = self.filter.as_mut() else {
            return self.route(raw).map(Outcome::Ready);
        };

        state.push(self.backend.as_ref(), raw)?;
        match self.route_filtered()? {
            Some(packet) => Ok(Outcome::Ready(packet)),
            None => {
                trace!(stream = self.index(), "bitstream filter needs more input");
                Ok(Outcome::Retry)
            }
        }
    }

    /**
        Returns true if the bitstream filter holds rewritten packets that were
        not routed yet.
    */
    pub(crate) fn has_filtered(&self) -> bool {
        self.filter.as_ref().is_some_and(FilterState::has_output)
    }

    /**
        Route the oldest rewritten packet waiting in the bitstream filter.
    */
    pub(crate) fn route_filtered(&mut self) -> Result<Option<Packet>> {
        let Some(output) = self.filter.as_mut().and_then(FilterState::pop) else {
            return Ok(None);
        };
        let routed = self.route(&output);
        if let Some(state) = self.filter.as_mut() {
            state.recycle(output);
        }
        routed.map(Some)
    }

    fn route(&mut self, source: &B::Packet) -> Result<Packet> {
        let index = self.info.index;
        let packet = snapshot(source, self.info.kind);
        if let Some(session) = self.session.as_mut() {
            session.enqueue(index, source)?;
        }

        trace!(
            stream = index,
            size = packet.size(),
            pts = ?packet.pts(),
            "packet read"
        );
        Ok(packet)
    }

    /**
        Mark the end of the container's data. The bitstream filter is flushed,
        and open decoders will be sent the end-of-stream marker and drained
        once the flushed packets are routed.
    */
    pub(crate) fn end_of_input(&mut self) -> Result<()> {
        self.end_of_input = true;
        match self.filter.as_mut() {
            Some(state) => state.finish(self.backend.as_ref()),
            None => Ok(()),
        }
    }

    /**
        Forget everything routed or buffered before a container seek.
    */
    pub(crate) fn reset(&mut self) {
        self.end_of_input = false;
        if let Some(state) = self.filter.as_mut() {
            state.reset();
        }
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
    }

    /**
        Convert a rewind target into this stream's ticks.
    */
    pub(crate) fn rewind_position(&self, offset: Duration) -> Result<i64> {
        self.info.time_base.duration_to_ticks(offset).ok_or_else(|| {
            Error::invalid_argument(format!(
                "can't express {offset:?} in time base {}",
                self.info.time_base
            ))
        })
    }

    /**
        Advance the decoder by one step: submit queued input (or the
        end-of-stream marker once draining), then try to retrieve one unit
        with `receive`, which reports the unit's timestamp alongside the
        status.
    */
    pub(crate) fn decode_step(
        &mut self,
        receive: impl FnOnce(&mut B::Decoder) -> (Status, Option<i64>),
    ) -> Result<Step> {
        let index = self.info.index;
        let time_base = self.info.time_base;
        // Filtered packets still waiting to be routed come before the end of
        // stream marker.
        let draining = self.end_of_input && !self.has_filtered();
        let session = self.session.as_mut().ok_or(Error::NotOpen { index })?;

        if session.queued {
            match session.decoder.send(Some(&session.pending)) {
                Status::Ok => {
                    session.in_flight.submit(session.pending.pts());
                    session.discard();
                }
                // The decoder's output queue is full. Keep the packet and
                // submit it again on the next step.
                Status::Again => {}
                Status::Eof => session.discard(),
                Status::Error(code) => {
                    session.discard();
                    return Err(Error::Decode {
                        context: "send the packet to the decoder",
                        code,
                    });
                }
            }
        } else if draining && !session.eof_sent {
            match session.decoder.send(None) {
                Status::Ok | Status::Eof => {
                    session.eof_sent = true;
                    debug!(stream = index, "draining decoder");
                }
                Status::Again => {}
                Status::Error(code) => {
                    return Err(Error::Decode {
                        context: "send the end of stream to the decoder",
                        code,
                    });
                }
            }
        }

        let (status, pts) = receive(&mut session.decoder);
        match status {
            Status::Ok => {
                let info = FrameInfo {
                    pts,
                    time_base,
                    index_coded: session.in_flight.resolve(pts),
                    index_display: session.displayed,
                };
                session.displayed += 1;
                Ok(Step::Decoded(info))
            }
            Status::Again => Ok(Step::NeedMoreInput),
            Status::Eof => Ok(Step::Drained),
            Status::Error(code) => Err(Error::Decode {
                context: "receive a frame from the decoder",
                code,
            }),
        }
    }
}

impl<B: Backend> std::fmt::Debug for StreamCore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("index", &self.info.index)
            .field("kind", &self.info.kind)
            .field("codec", &self.codec.as_ref().map(|c| c.name.as_str()))
            .field("filter", &self.filter())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
