use dns_parser::{Builder, Packet, QueryClass, QueryType, RData, ResourceRecord};
use thiserror::Error;

pub const DNS_PORT: u16 = 53;
/// Large enough for any UDP reply without EDNS.
pub const MAX_UDP_PAYLOAD: usize = 4096;
/// Longest label `Builder` accepts; it panics on anything longer.
const MAX_LABEL_LEN: usize = 62;
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("unparseable DNS packet: {0}")]
    Parse(#[from] dns_parser::Error),
    #[error("packet is a query, not a response")]
    NotAResponse,
    #[error("transaction id {got} does not match {expected}")]
    IdMismatch { expected: u16, got: u16 },
}

/// Builds a recursion-desired `A`/`IN` query for `domain`.
pub fn create_a_packet(domain: &str, id: u16) -> anyhow::Result<Vec<u8>> {
    let qname: &str = checked_qname(domain)?;

    let mut builder: Builder = Builder::new_query(id, true);
    builder.add_question(qname, false, QueryType::A, QueryClass::IN);
    builder
        .build()
        .map_err(|_| anyhow::anyhow!("query for '{domain}' does not fit a UDP datagram"))
}

/// Parses a reply to the query with transaction id `expected_id` and renders
/// its answer section, one line per record.
///
/// The response code is not inspected: a resolver answering `REFUSED` or
/// `SERVFAIL` still answered.
pub fn parse_answers(payload: &[u8], expected_id: u16) -> Result<Vec<String>, ResponseError> {
    let packet: Packet = Packet::parse(payload)?;

    if packet.header.query {
        return Err(ResponseError::NotAResponse);
    }
    if packet.header.id != expected_id {
        return Err(ResponseError::IdMismatch {
            expected: expected_id,
            got: packet.header.id,
        });
    }

    Ok(packet.answers.iter().map(render_record).collect())
}

/// Human-readable form of the question sent for `domain`.
pub fn render_question(domain: &str) -> String {
    format!("{} A", domain.trim_end_matches('.'))
}

/// Renders a resource record as `name.<TAB>ttl<TAB>class<TAB>TYPE<TAB>data`.
///
/// Record types the parser does not decode are printed as `UNKNOWN` with
/// their raw rdata in the generic `\# <len> <hex>` notation.
pub fn render_record(record: &ResourceRecord) -> String {
    let (rtype, data): (&str, String) = match &record.data {
        RData::A(a) => ("A", a.0.to_string()),
        RData::AAAA(aaaa) => ("AAAA", aaaa.0.to_string()),
        RData::CNAME(cname) => ("CNAME", format!("{}.", cname.0)),
        RData::NS(ns) => ("NS", format!("{}.", ns.0)),
        RData::PTR(ptr) => ("PTR", format!("{}.", ptr.0)),
        RData::MX(mx) => ("MX", format!("{} {}.", mx.preference, mx.exchange)),
        RData::TXT(txt) => (
            "TXT",
            txt.iter()
                .map(|chunk| format!("\"{}\"", String::from_utf8_lossy(chunk)))
                .collect::<Vec<String>>()
                .join(" "),
        ),
        RData::SOA(soa) => (
            "SOA",
            format!(
                "{}. {}. {} {} {} {} {}",
                soa.primary_ns,
                soa.mailbox,
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minimum_ttl
            ),
        ),
        RData::SRV(srv) => (
            "SRV",
            format!("{} {} {} {}.", srv.priority, srv.weight, srv.port, srv.target),
        ),
        RData::Unknown(bytes) => ("UNKNOWN", generic_rdata(bytes)),
    };

    format!(
        "{}.\t{}\t{:?}\t{}\t{}",
        record.name, record.ttl, record.cls, rtype, data
    )
}

fn generic_rdata(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    if hex.is_empty() {
        format!("\\# {}", bytes.len())
    } else {
        format!("\\# {} {hex}", bytes.len())
    }
}

/// Strips the root dot and checks `domain` against the wire limits, so the
/// builder never sees a name it would panic on.
fn checked_qname(domain: &str) -> anyhow::Result<&str> {
    let name: &str = domain.strip_suffix('.').unwrap_or(domain);
    anyhow::ensure!(!name.is_empty(), "empty domain name");

    let mut wire_len: usize = 1;
    for label in name.split('.') {
        anyhow::ensure!(!label.is_empty(), "empty label in '{domain}'");
        anyhow::ensure!(
            label.len() <= MAX_LABEL_LEN,
            "label '{label}' exceeds {MAX_LABEL_LEN} bytes"
        );
        wire_len += label.len() + 1;
    }
    anyhow::ensure!(wire_len <= MAX_NAME_LEN, "name '{domain}' exceeds {MAX_NAME_LEN} bytes");

    Ok(name)
}
