/*!
    Container demuxing and per-stream decoding.

    A [`Container`] opens a file or network source, discovers its sub-streams
    and serves compressed packets. Each sub-stream is a [`Stream`] with its
    own decode state: opening it allocates a decoder and a conversion stage,
    after which every packet read from the container is queued for it and
    [`Stream::read_frame`] yields RGBA video frames or stereo 16-bit PCM audio
    frames.

    ```ignore
    let mut container = FfmpegContainer::open("movie.mkv", OpenOptions::default())?;
    container.stream_mut(0)?.open()?;

    loop {
        match container.read_packet()? {
            Outcome::Ready(packet) if packet.stream_index() == 0 => {}
            Outcome::Ready(_) | Outcome::Retry => continue,
            Outcome::End => break,
        }
        while let Outcome::Ready(frame) = container.stream_mut(0)?.read_frame()? {
            println!("{:?}", frame.presentation_offset());
        }
    }
    ```

    Everything is synchronous and single-threaded. The native engine sits
    behind the [`engine::Backend`] trait; the FFmpeg implementation is
    available with the `ffmpeg` feature.
*/

mod container;
pub mod engine;
mod filter;
mod network;
mod options;
mod outcome;
mod stream;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(test)]
mod mock;

pub use media_types as types;

pub use container::Container;
pub use engine::{Backend, Status};
pub use network::NetworkSession;
pub use options::{OpenOptions, VideoOpenOptions};
pub use outcome::Outcome;
pub use stream::{AudioStream, Stream, UnknownStream, VideoStream};

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{Ffmpeg, FfmpegContainer};
