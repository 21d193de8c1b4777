//! The bounded-concurrency scan loop.
//!
//! Every address of the range becomes one work unit. A unit may only start
//! once it holds a permit from the admission gate (a counting semaphore sized
//! to the concurrency ceiling); the permit lives inside the unit's future and
//! is returned when that future is dropped, whether the unit finished, failed
//! or panicked.
//!
//! Inside a unit the domains are queried one after another, and every
//! successful answer is written to the sink before the next query goes out.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, debug_span, error, trace, warn};

use dnsprobe_common::config::ScanConfig;
use dnsprobe_common::record::QueryRecord;
use dnsprobe_common::scanning::{QueryDispatcher, ResultSink};

/// Called with the number of finished units each time a unit finishes.
pub type ProgressCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// Totals of a drained scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub addresses: u64,
    pub queries: u64,
    pub records: u64,
    pub query_failures: u64,
    pub sink_failures: u64,
    pub panicked_units: u64,
}

#[derive(Debug, Default)]
struct Counters {
    finished: AtomicU64,
    queries: AtomicU64,
    records: AtomicU64,
    query_failures: AtomicU64,
    sink_failures: AtomicU64,
}

pub struct Scanner {
    config: Arc<ScanConfig>,
    dispatcher: Arc<dyn QueryDispatcher>,
    sink: Arc<dyn ResultSink>,
    on_progress: Option<ProgressCallback>,
}

impl Scanner {
    pub fn new(
        config: ScanConfig,
        dispatcher: Arc<dyn QueryDispatcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher,
            sink,
            on_progress: None,
        }
    }

    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    /// Scans every address of `addresses` and returns once all units have
    /// drained.
    ///
    /// The sequence is pulled lazily, one address per free slot, so at most
    /// `concurrency` units exist at any time.
    pub async fn run<I>(&self, addresses: I) -> anyhow::Result<ScanSummary>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        let gate: Arc<Semaphore> = Arc::new(Semaphore::new(self.config.concurrency.get()));
        let counters: Arc<Counters> = Arc::new(Counters::default());
        let mut units: JoinSet<()> = JoinSet::new();
        let mut addresses_seen: u64 = 0;
        let mut panicked_units: u64 = 0;

        for addr in addresses {
            let permit: OwnedSemaphorePermit = gate
                .clone()
                .acquire_owned()
                .await
                .context("admission gate closed mid-scan")?;

            while let Some(res) = units.try_join_next() {
                panicked_units += reap(res);
            }

            let unit = WorkUnit {
                addr,
                config: self.config.clone(),
                dispatcher: self.dispatcher.clone(),
                sink: self.sink.clone(),
                counters: counters.clone(),
            };
            let finished = Finished {
                counters: counters.clone(),
                on_progress: self.on_progress.clone(),
            };

            addresses_seen += 1;
            units.spawn(
                async move {
                    let _permit: OwnedSemaphorePermit = permit;
                    let _finished: Finished = finished;
                    unit.run().await;
                }
                .instrument(debug_span!("unit", %addr)),
            );
        }

        while let Some(res) = units.join_next().await {
            panicked_units += reap(res);
        }

        Ok(ScanSummary {
            addresses: addresses_seen,
            queries: counters.queries.load(Ordering::Relaxed),
            records: counters.records.load(Ordering::Relaxed),
            query_failures: counters.query_failures.load(Ordering::Relaxed),
            sink_failures: counters.sink_failures.load(Ordering::Relaxed),
            panicked_units,
        })
    }
}

/// Reports a unit as finished when dropped, so units that panic still move
/// the progress forward.
struct Finished {
    counters: Arc<Counters>,
    on_progress: Option<ProgressCallback>,
}

impl Drop for Finished {
    fn drop(&mut self) {
        let finished: u64 = self.counters.finished.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(on_progress) = &self.on_progress {
            on_progress(finished);
        }
    }
}

fn reap(res: Result<(), JoinError>) -> u64 {
    match res {
        Ok(()) => 0,
        Err(e) => {
            error!("Work unit aborted: {e}");
            1
        }
    }
}

struct WorkUnit {
    addr: IpAddr,
    config: Arc<ScanConfig>,
    dispatcher: Arc<dyn QueryDispatcher>,
    sink: Arc<dyn ResultSink>,
    counters: Arc<Counters>,
}

impl WorkUnit {
    async fn run(self) {
        for domain in self.config.domains() {
            self.query(domain).await;
        }
    }

    async fn query(&self, domain: &str) {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);

        let exchange = match self
            .dispatcher
            .exchange(self.addr, domain, self.config.timeout)
            .await
        {
            Ok(exchange) => exchange,
            Err(e) => {
                debug!("{domain} via {}: {e}", self.addr);
                self.counters.query_failures.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        trace!("{domain} via {}: {} answers", self.addr, exchange.answers.len());
        let record: QueryRecord = QueryRecord::from_exchange(self.addr, domain, exchange);

        match self.sink.record(record).await {
            Ok(()) => {
                self.counters.records.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("Failed to store {domain} result for {}: {e}", self.addr);
                self.counters.sink_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
