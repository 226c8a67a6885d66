/*!
    Compressed packet snapshots.
*/

use crate::MediaKind;

/**
    Packet flag bits, as reported by the demuxer.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PacketFlags(pub u32);

impl PacketFlags {
    /// The packet contains a keyframe.
    pub const KEY: Self = Self(0x0001);
    /// The packet content is corrupted.
    pub const CORRUPT: Self = Self(0x0002);
    /// The packet is required to maintain valid decoder state but its output
    /// should be discarded.
    pub const DISCARD: Self = Self(0x0004);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for PacketFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/**
    One compressed unit read from a container.

    This is an owned copy of the demuxer's reusable packet buffer, taken after
    any bitstream filter has rewritten it. It is never mutated after creation.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packet {
    stream_index: usize,
    kind: MediaKind,
    data: Vec<u8>,
    pts: Option<i64>,
    dts: Option<i64>,
    pos: Option<i64>,
    duration: i64,
    flags: PacketFlags,
}

impl Packet {
    /**
        Create a packet snapshot for the given sub-stream.
    */
    pub fn new(stream_index: usize, kind: MediaKind, data: Vec<u8>) -> Self {
        Self {
            stream_index,
            kind,
            data,
            ..Self::default()
        }
    }

    /**
        Set the decode/presentation timestamps and duration, in the owning
        stream's time base.
    */
    pub fn with_timing(mut self, pts: Option<i64>, dts: Option<i64>, duration: i64) -> Self {
        self.pts = pts;
        self.dts = dts;
        self.duration = duration;
        self
    }

    /**
        Set the byte offset of the packet in the source.
    */
    pub fn with_position(mut self, pos: Option<i64>) -> Self {
        self.pos = pos;
        self
    }

    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    /**
        Index of the sub-stream this packet belongs to.
    */
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /**
        Media type of the owning sub-stream.
    */
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn dts(&self) -> Option<i64> {
        self.dts
    }

    /**
        Byte offset of the packet in the source, if known.
    */
    pub fn pos(&self) -> Option<i64> {
        self.pos
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn flags(&self) -> PacketFlags {
        self.flags
    }

    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(PacketFlags::KEY)
    }
}
