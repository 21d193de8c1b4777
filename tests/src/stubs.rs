use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dnsprobe_common::record::{Exchange, QueryError, QueryRecord, SinkError};
use dnsprobe_common::scanning::{QueryDispatcher, ResultSink};

/// Answers every query with the same answer set.
pub struct AlwaysAnswers {
    pub answers: Vec<String>,
}

#[async_trait::async_trait]
impl QueryDispatcher for AlwaysAnswers {
    async fn exchange(
        &self,
        _target: IpAddr,
        domain: &str,
        _timeout: Duration,
    ) -> Result<Exchange, QueryError> {
        Ok(Exchange::new(format!("{domain} A"), self.answers.clone()))
    }
}

/// Waits out the whole timeout, then gives up.
pub struct AlwaysTimesOut;

#[async_trait::async_trait]
impl QueryDispatcher for AlwaysTimesOut {
    async fn exchange(
        &self,
        _target: IpAddr,
        _domain: &str,
        timeout: Duration,
    ) -> Result<Exchange, QueryError> {
        tokio::time::sleep(timeout).await;
        Err(QueryError::Timeout(timeout))
    }
}

/// Tracks how many exchanges are in flight at once.
pub struct Instrumented {
    pub delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Instrumented {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QueryDispatcher for Instrumented {
    async fn exchange(
        &self,
        target: IpAddr,
        domain: &str,
        _timeout: Duration,
    ) -> Result<Exchange, QueryError> {
        let now: usize = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Exchange::new(format!("{domain} A"), vec![target.to_string()]))
    }
}

/// Keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<QueryRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<QueryRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ResultSink for MemorySink {
    async fn record(&self, entry: QueryRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(entry);
        Ok(())
    }
}
