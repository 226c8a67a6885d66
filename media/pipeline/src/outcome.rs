/*!
    Three-way read results.
*/

/**
    Result of a read that can succeed without producing anything.

    `Retry` is the recoverable "needs more input" condition: the caller should
    read another packet and call again. It is never reported as an error.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// A value was produced.
    Ready(T),
    /// Nothing was produced yet; more data is available.
    Retry,
    /// No more data will be produced.
    End,
}

impl<T> Outcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /**
        Returns true unless the end was reached.
    */
    pub fn has_more(&self) -> bool {
        !self.is_end()
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Retry | Self::End => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ready(value) => Outcome::Ready(f(value)),
            Self::Retry => Outcome::Retry,
            Self::End => Outcome::End,
        }
    }
}
