mod extract;
mod sample;
mod shutdown;

pub mod prelude {
    pub use crate::extract::{ExtractorError, LatencyExtractor, CYCLICTEST_PATTERN};
    pub use crate::sample::LatencySample;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
