use std::sync::Arc;
use std::time::Duration;

use dnsprobe_common::config::{ScanConfig, parse_domain_list};
use dnsprobe_common::network::AddressRange;
use dnsprobe_common::record::QueryRecord;
use dnsprobe_core::{Scanner, SqliteSink};

use crate::stubs::AlwaysAnswers;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scan_into_sqlite_persists_every_answer() {
    let sink = Arc::new(SqliteSink::in_memory().await.unwrap());
    let cfg = ScanConfig::new(
        "example.com",
        parse_domain_list("a.com"),
        Duration::from_millis(50),
        32,
    )
    .unwrap();
    let dispatcher = Arc::new(AlwaysAnswers {
        answers: vec![
            "example.com.\t60\tIN\tA\t1.2.3.4".to_string(),
            "example.com.\t60\tIN\tA\t5.6.7.8".to_string(),
        ],
    });
    let scanner = Scanner::new(cfg, dispatcher, sink.clone());

    let range: AddressRange = "10.20.0.0/25".parse().unwrap();
    let summary = scanner.run(&range).await.unwrap();

    assert_eq!(summary.records, 256);
    assert_eq!(summary.sink_failures, 0);
    assert_eq!(sink.count().await.unwrap(), 256);

    let stored: Vec<QueryRecord> = sink.fetch_all().await.unwrap();
    let first: &QueryRecord = stored
        .iter()
        .find(|r| r.address == "10.20.0.127" && r.domain == "a.com")
        .expect("record for the last address");
    assert_eq!(first.question, "a.com A");
    assert_eq!(first.answer.lines().count(), 2);
}
