//! The fixed-cadence driver of the simulation.

use std::sync::Arc;
use std::time::Instant;

use crate::match_making::MatchMaker;
use crate::protocol::constants::TICKS_PER_SECOND;

/// Tick every running match at the simulation cadence, forever. Runs as its own task ; the rest
/// of the server only ever observes match state through the [`MatchMaker`] it shares with it.
///
/// The interval is absolute-deadline based, so a slow tick shortens the following wait instead
/// of shifting the whole cadence.
pub async fn drive_matches(match_maker: Arc<MatchMaker>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(
        1000 / TICKS_PER_SECOND,
    ));
    loop {
        interval.tick().await;
        // The thread-local rng handle cannot be kept across the await.
        match_maker.tick_all(Instant::now(), &mut rand::thread_rng());
    }
}
