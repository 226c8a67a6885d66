/*!
    Per-stream bitstream filter state.
*/

use std::collections::VecDeque;

use media_types::{ENOMEM_STATUS, Error, Rational, Result};
use tracing::{debug, warn};

use crate::engine::{Backend, BitstreamFilter, RawPacket, Status};

/**
    An initialized bitstream filter plus its reusable packet slots.

    The raw packet read from the container is referenced into `input` and
    pushed into the filter. Every rewritten packet the filter then has ready
    is pulled into its own slot and queued until the stream routes it. Slots
    are recycled, and all native handles are released together when the
    state is dropped.
*/
pub(crate) struct FilterState<B: Backend> {
    spec: String,
    filter: B::Filter,
    input: B::Packet,
    /// Rewritten packets waiting to be routed, oldest first.
    ready: VecDeque<B::Packet>,
    /// Blank slots kept for reuse.
    spare: Vec<B::Packet>,
    finished: bool,
}

impl<B: Backend> FilterState<B> {
    pub(crate) fn open(
        backend: &B,
        spec: &str,
        params: &B::Parameters,
        time_base: Rational,
    ) -> Result<Self> {
        let filter = backend.open_filter(spec, params, time_base)?;
        let input = alloc_slot(backend)?;
        let output = alloc_slot(backend)?;

        debug!(spec, %time_base, "bitstream filter initialized");

        Ok(Self {
            spec: spec.to_string(),
            filter,
            input,
            ready: VecDeque::new(),
            spare: vec![output],
            finished: false,
        })
    }

    pub(crate) fn spec(&self) -> &str {
        &self.spec
    }

    pub(crate) fn has_output(&self) -> bool {
        !self.ready.is_empty()
    }

    /**
        Push `raw` through the filter and collect everything it has ready.

        A filter that still holds output from earlier packets refuses new
        input. That output is collected first and the packet offered again,
        so no input is lost.
    */
    pub(crate) fn push(&mut self, backend: &B, raw: &B::Packet) -> Result<()> {
        if let Status::Error(code) = self.input.reference(raw) {
            return Err(Error::Filter {
                context: "reference the packet for the bitstream filter",
                code,
            });
        }

        let mut sent = self.filter.send(&mut self.input);
        if sent == Status::Again {
            if let Err(e) = self.drain(backend) {
                self.input.unref();
                return Err(e);
            }
            sent = self.filter.send(&mut self.input);
        }
        // The filter normally takes the reference over; drop whatever is left.
        self.input.unref();

        match sent {
            Status::Ok => {}
            Status::Eof => {
                warn!(spec = %self.spec, "bitstream filter already flushed, packet dropped");
            }
            Status::Again => {
                return Err(Error::Filter {
                    context: "send the packet to the bitstream filter",
                    code: EAGAIN_STATUS,
                });
            }
            Status::Error(code) => {
                return Err(Error::Filter {
                    context: "send the packet to the bitstream filter",
                    code,
                });
            }
        }

        self.drain(backend)
    }

    /**
        Signal the end of input and collect the packets the filter was still
        holding back.
    */
    pub(crate) fn finish(&mut self, backend: &B) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if let Status::Error(code) = self.filter.send_eof() {
            return Err(Error::Filter {
                context: "flush the bitstream filter",
                code,
            });
        }
        self.finished = true;
        debug!(spec = %self.spec, "bitstream filter flushed");
        self.drain(backend)
    }

    /**
        Drop pending output and return the filter to its initial state.
    */
    pub(crate) fn reset(&mut self) {
        while let Some(packet) = self.ready.pop_front() {
            self.recycle(packet);
        }
        self.filter.reset();
        self.finished = false;
    }

    /**
        Take the oldest rewritten packet. It must be handed back with
        [`FilterState::recycle`] once consumed.
    */
    pub(crate) fn pop(&mut self) -> Option<B::Packet> {
        self.ready.pop_front()
    }

    pub(crate) fn recycle(&mut self, mut packet: B::Packet) {
        packet.unref();
        self.spare.push(packet);
    }

    fn drain(&mut self, backend: &B) -> Result<()> {
        loop {
            let mut slot = match self.spare.pop() {
                Some(slot) => slot,
                None => backend.alloc_packet()?,
            };
            match self.filter.receive(&mut slot) {
                Status::Ok => self.ready.push_back(slot),
                Status::Again | Status::Eof => {
                    self.spare.push(slot);
                    return Ok(());
                }
                Status::Error(code) => {
                    self.recycle(slot);
                    return Err(Error::Filter {
                        context: "receive the packet from the bitstream filter",
                        code,
                    });
                }
            }
        }
    }
}

/// Status reported when a filter keeps refusing input after its output was
/// collected.
const EAGAIN_STATUS: i32 = -11;

fn alloc_slot<B: Backend>(backend: &B) -> Result<B::Packet> {
    backend.alloc_packet().map_err(|e| Error::FilterInit {
        context: "allocate the filter packets",
        code: e.code().unwrap_or(ENOMEM_STATUS),
    })
}
