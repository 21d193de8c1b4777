use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use indicatif::ProgressStyle;
use tracing::{Instrument, Span, info, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use dnsprobe_common::config::{ScanConfig, parse_domain_list};
use dnsprobe_common::network::AddressRange;
use dnsprobe_core::{ScanSummary, Scanner, SqliteSink, UdpDispatcher};

use crate::commands::CommandLine;
use crate::terminal::{colors, print};

const SUMMARY_KEY_WIDTH: usize = 14;

pub async fn scan(args: &CommandLine) -> anyhow::Result<()> {
    let range: AddressRange = args.network;
    let cfg: ScanConfig = ScanConfig::new(
        &args.domain,
        parse_domain_list(args.domains.as_deref().unwrap_or_default()),
        Duration::from_secs(args.timeout),
        args.concurrent,
    )
    .context("invalid configuration")?;

    let sink: Arc<SqliteSink> = Arc::new(SqliteSink::open(&args.db).await?);

    info!(
        "Probing {} addresses in {range} for {} domain(s), {} at a time",
        range.len(),
        cfg.domain_count(),
        cfg.concurrency
    );

    let span: Span = progress_span(&range, args.quiet)?;
    let progress: Span = span.clone();
    let scanner: Scanner = Scanner::new(cfg, Arc::new(UdpDispatcher::new()), sink.clone())
        .with_progress(move |_finished| progress.pb_inc(1));

    let start_time: Instant = Instant::now();
    let summary: ScanSummary = scanner.run(range.iter()).instrument(span).await?;
    let elapsed: Duration = start_time.elapsed();

    let stored: i64 = sink.count().await.context("counting stored records")?;
    sink.close().await;

    if !args.quiet {
        print_summary(&range, &summary, stored, elapsed, args);
    }
    Ok(())
}

fn progress_span(range: &AddressRange, quiet: bool) -> anyhow::Result<Span> {
    if quiet {
        return Ok(Span::none());
    }

    let span: Span = info_span!("scan", indicatif.pb_show = true);
    let style: ProgressStyle =
        ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:32.green/black}] {pos}/{len} ({eta})")?
            .progress_chars("━╸ ");
    span.pb_set_style(&style);
    span.pb_set_length(u64::try_from(range.len()).unwrap_or(u64::MAX));
    span.pb_set_message(&format!("probing {range}"));
    Ok(span)
}

fn print_summary(
    range: &AddressRange,
    summary: &ScanSummary,
    stored: i64,
    elapsed: Duration,
    args: &CommandLine,
) {
    print::header("scan complete", false);
    print::aligned_line("Network", range.to_string(), SUMMARY_KEY_WIDTH);
    print::aligned_line("Addresses", summary.addresses.to_string(), SUMMARY_KEY_WIDTH);
    print::aligned_line("Queries", summary.queries.to_string(), SUMMARY_KEY_WIDTH);
    print::aligned_line(
        "Answers",
        summary.records.to_string().color(colors::PRIMARY).bold(),
        SUMMARY_KEY_WIDTH,
    );
    print::aligned_line("Failed queries", summary.query_failures.to_string(), SUMMARY_KEY_WIDTH);

    if summary.sink_failures > 0 || summary.panicked_units > 0 {
        let errors: String = format!(
            "{} storage, {} aborted units",
            summary.sink_failures, summary.panicked_units
        );
        print::aligned_line("Errors", errors.red().bold(), SUMMARY_KEY_WIDTH);
    }

    print::aligned_line(
        "Database",
        format!("{} ({stored} rows)", args.db.display()),
        SUMMARY_KEY_WIDTH,
    );
    print::aligned_line(
        "Elapsed",
        format!("{:.2}s", elapsed.as_secs_f64()).color(colors::ACCENT),
        SUMMARY_KEY_WIDTH,
    );
    print::fat_separator();
}
