/*!
    Open options for containers and video decoding.
*/

use std::time::Duration;

use media_types::InterpolationAlgorithm;

/**
    Options for opening a container.
*/
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Force a named demuxer (or input device) instead of probing the source.
    pub input_format: Option<String>,
    /// Maximum time to wait when establishing a network connection.
    pub timeout: Option<Duration>,
    /// Additional demuxer/protocol options, passed through unchanged.
    pub extra: Vec<(String, String)>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input_format(mut self, name: impl Into<String>) -> Self {
        self.input_format = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /**
        Render the options as the key/value dictionary handed to the demuxer.

        The timeout is expressed in microseconds and set for both TCP/HTTP
        style transports (`timeout`) and RTSP (`stimeout`).
    */
    pub fn dictionary(&self) -> Vec<(String, String)> {
        let mut entries = Vec::with_capacity(self.extra.len() + 2);

        if let Some(timeout) = self.timeout {
            let micros = timeout.as_micros().to_string();
            entries.push(("timeout".to_string(), micros.clone()));
            entries.push(("stimeout".to_string(), micros));
        }

        entries.extend(self.extra.iter().cloned());
        entries
    }
}

/**
    Output configuration for a video decode session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoOpenOptions {
    /// Width of the RGBA output, in pixels.
    pub width: u32,
    /// Height of the RGBA output, in pixels.
    pub height: u32,
    pub algorithm: InterpolationAlgorithm,
}

impl VideoOpenOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            algorithm: InterpolationAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: InterpolationAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /**
        Size in bytes of one RGBA output picture.
    */
    pub fn buffer_size(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
