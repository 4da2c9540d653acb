//! Headless session driver: runs the pusher for a while, dropping coins on
//! a cadence, and prints the economy as it goes.
//!
//! ```sh
//! RUST_LOG=info cargo run --example headless_run
//! ```

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cascade_engine::prelude::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut session = Session::new(SessionConfig::default());
    session.start();

    // Ten simulated seconds at 60 Hz, one drop every half second.
    for tick in 0..600u64 {
        if tick % 30 == 0 {
            session.drop_coin(CoinKind::Copper);
        }
        let report = session.tick();
        for (id, kind) in &report.collected {
            info!(%id, ?kind, "collected");
        }
    }

    let view = session.economy_view();
    info!(
        score = view.score,
        cash = view.cash,
        bonus = view.bonus,
        coins_on_bed = session.coin_count(),
        "session finished"
    );
    Ok(())
}
