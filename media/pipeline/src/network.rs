/*!
    Process-wide network subsystem lifecycle.
*/

use std::sync::Arc;

use media_types::{Error, Result};
use tracing::{debug, warn};

use crate::engine::Backend;

/**
    Guard for the engine's network subsystem.

    Create it before opening network sources and keep it alive until every
    such container is closed. The subsystem is shut down when the session is
    dropped, or explicitly with [`NetworkSession::shutdown`] to observe the
    result.
*/
pub struct NetworkSession<B: Backend> {
    backend: Arc<B>,
    active: bool,
}

impl<B: Backend> NetworkSession<B> {
    pub fn init(backend: Arc<B>) -> Result<Self> {
        let code = backend.network_init();
        if code < 0 {
            return Err(Error::Network { code });
        }

        debug!("network subsystem initialized");
        Ok(Self {
            backend,
            active: true,
        })
    }

    pub fn shutdown(mut self) -> Result<()> {
        self.active = false;
        let code = self.backend.network_deinit();
        if code < 0 {
            return Err(Error::Network { code });
        }

        debug!("network subsystem shut down");
        Ok(())
    }
}

impl<B: Backend> Drop for NetworkSession<B> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        let code = self.backend.network_deinit();
        if code < 0 {
            warn!(error = %Error::Network { code }, "network subsystem shutdown failed");
        } else {
            debug!("network subsystem shut down");
        }
    }
}

impl<B: Backend> std::fmt::Debug for NetworkSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSession")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
