/// Number of workers a scheduler uses when none is configured.
#[inline]
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Installs a global subscriber that forwards scheduling spans to Tracy.
///
/// Fails if a global subscriber has been set already.
#[cfg(feature = "trace")]
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_tracy::TracyLayer::default())
        .try_init()
}
