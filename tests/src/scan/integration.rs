use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dnsprobe_common::config::{ScanConfig, parse_domain_list};
use dnsprobe_common::network::AddressRange;
use dnsprobe_common::record::QueryRecord;
use dnsprobe_core::{ScanSummary, Scanner};

use crate::stubs::{AlwaysAnswers, AlwaysTimesOut, Instrumented, MemorySink};

fn config(domains: &str, concurrency: usize) -> ScanConfig {
    ScanConfig::new(
        "example.com",
        parse_domain_list(domains),
        Duration::from_millis(50),
        concurrency,
    )
    .unwrap()
}

fn range(cidr: &str) -> AddressRange {
    cidr.parse().unwrap()
}

#[tokio::test]
async fn every_address_of_a_slash_30_is_recorded() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(AlwaysAnswers {
        answers: vec!["example.com.\t60\tIN\tA\t1.2.3.4".to_string()],
    });
    let scanner = Scanner::new(config("", 2), dispatcher, sink.clone());

    let summary: ScanSummary = scanner.run(&range("10.0.0.0/30")).await.unwrap();
    assert_eq!(summary.records, 4);

    let mut records: Vec<QueryRecord> = sink.records();
    assert_eq!(records.len(), 4);
    records.sort_by_key(|r| r.address.parse::<IpAddr>().unwrap());

    let addresses: Vec<&str> = records.iter().map(|r| r.address.as_str()).collect();
    assert_eq!(addresses, vec!["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3"]);

    for record in &records {
        assert_eq!(record.domain, "example.com");
        assert_eq!(record.question, "example.com A");
        assert!(record.answer.contains("1.2.3.4"));
    }
}

#[tokio::test]
async fn timeouts_produce_no_records_and_still_complete() {
    let sink = Arc::new(MemorySink::default());
    let scanner = Scanner::new(config("", 2), Arc::new(AlwaysTimesOut), sink.clone());

    let summary: ScanSummary = tokio::time::timeout(
        Duration::from_secs(5),
        scanner.run(&range("10.0.0.0/30")),
    )
    .await
    .expect("scan hung")
    .unwrap();

    assert_eq!(sink.len(), 0);
    assert_eq!(summary.addresses, 4);
    assert_eq!(summary.query_failures, 4);
    assert_eq!(summary.records, 0);
}

#[tokio::test]
async fn additional_domains_follow_the_primary_in_order() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(AlwaysAnswers {
        answers: vec!["1.2.3.4".to_string()],
    });
    let scanner = Scanner::new(config("a.com,b.com", 2), dispatcher, sink.clone());

    scanner.run(&range("10.0.0.0/30")).await.unwrap();

    let records: Vec<QueryRecord> = sink.records();
    assert_eq!(records.len(), 12);

    for addr in ["10.0.0.0", "10.0.0.1", "10.0.0.2", "10.0.0.3"] {
        let domains: Vec<&str> = records
            .iter()
            .filter(|r| r.address == addr)
            .map(|r| r.domain.as_str())
            .collect();
        assert_eq!(domains, vec!["example.com", "a.com", "b.com"], "order for {addr}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_never_exceeds_the_ceiling() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(Instrumented::new(Duration::from_millis(5)));
    let scanner = Scanner::new(config("a.com", 8), dispatcher.clone(), sink.clone());

    let summary: ScanSummary = scanner.run(&range("172.16.0.0/24")).await.unwrap();

    assert!(dispatcher.peak() <= 8, "peak was {}", dispatcher.peak());
    assert!(dispatcher.peak() > 1, "units never overlapped");
    assert_eq!(dispatcher.calls(), 512);
    assert_eq!(summary.records, 512);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ceiling_of_one_serializes_units() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(Instrumented::new(Duration::from_millis(1)));
    let scanner = Scanner::new(config("", 1), dispatcher.clone(), sink.clone());

    scanner.run(&range("192.168.10.0/28")).await.unwrap();

    assert_eq!(dispatcher.peak(), 1);
    assert_eq!(sink.len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nothing_is_recorded_after_run_returns() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(Instrumented::new(Duration::from_millis(3)));
    let scanner = Scanner::new(config("a.com,b.com", 16), dispatcher.clone(), sink.clone());

    let summary: ScanSummary = scanner.run(&range("10.1.0.0/26")).await.unwrap();
    let at_completion: usize = sink.len();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(at_completion, 64 * 3);
    assert_eq!(sink.len(), at_completion);
    assert_eq!(summary.records as usize, at_completion);
    assert_eq!(dispatcher.calls(), at_completion);
}

#[tokio::test]
async fn single_host_range_scans_once() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(AlwaysAnswers { answers: Vec::new() });
    let scanner = Scanner::new(config("", 256), dispatcher, sink.clone());

    let summary: ScanSummary = scanner.run(&range("203.0.113.9/32")).await.unwrap();

    assert_eq!(summary.addresses, 1);
    let records: Vec<QueryRecord> = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address, "203.0.113.9");
    assert!(records[0].answer.is_empty());
}

#[tokio::test]
async fn large_ranges_are_consumed_lazily() {
    let sink = Arc::new(MemorySink::default());
    let dispatcher = Arc::new(AlwaysAnswers { answers: Vec::new() });
    let scanner = Scanner::new(config("", 4), dispatcher, sink.clone());

    // the first 1000 addresses of a /8, without ever collecting the range
    let summary: ScanSummary = scanner
        .run(range("10.0.0.0/8").iter().take(1000))
        .await
        .unwrap();

    assert_eq!(summary.addresses, 1000);
    assert_eq!(sink.len(), 1000);
}
