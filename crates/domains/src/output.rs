//! Report rendering: TSV and JSON.
//!
//! Both formats share the same columns; the certificate columns are only
//! present when certificate fetching was requested.

use anyhow::Result;
use domains_core::Record;
use serde::Serialize;

use crate::cli::OutputFormat;

const COLUMNS: [&str; 6] = ["domain", "record", "value", "type", "source", "registrar"];
const CERT_COLUMNS: [&str; 3] = ["cert_issuer", "cert_expires", "cert_error"];

/// One output row
#[derive(Debug, Serialize)]
struct Row<'a> {
    domain: &'a str,
    record: &'a str,
    value: &'a str,
    #[serde(rename = "type")]
    record_type: &'a str,
    source: &'a str,
    registrar: &'a str,
    #[serde(flatten)]
    cert: Option<CertColumns<'a>>,
}

#[derive(Debug, Serialize)]
struct CertColumns<'a> {
    cert_issuer: &'a str,
    cert_expires: String,
    cert_error: &'a str,
}

impl<'a> Row<'a> {
    fn new(record: &'a Record, with_certs: bool) -> Self {
        Self {
            domain: &record.domain,
            record: &record.name,
            value: &record.value,
            record_type: record.record_type.as_str(),
            source: record.source(),
            registrar: record.registrar_or_empty(),
            cert: with_certs.then(|| CertColumns {
                cert_issuer: record.cert.issuer(),
                cert_expires: record.cert.expires(),
                cert_error: record.cert.error(),
            }),
        }
    }

    fn tsv_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.domain,
            self.record,
            self.value,
            self.record_type,
            self.source,
            self.registrar,
        ];
        if let Some(cert) = &self.cert {
            fields.extend([cert.cert_issuer, cert.cert_expires.as_str(), cert.cert_error]);
        }
        fields
    }
}

/// Render `records` in `format`
pub fn render(records: &[Record], format: OutputFormat, with_certs: bool) -> Result<String> {
    let rows: Vec<Row<'_>> = records.iter().map(|r| Row::new(r, with_certs)).collect();

    match format {
        OutputFormat::Tsv => render_tsv(&rows, with_certs),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
    }
}

/// Tab-delimited rows; fields holding a tab, newline or quote are quoted
fn render_tsv(rows: &[Row<'_>], with_certs: bool) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header: Vec<&str> = COLUMNS.to_vec();
    if with_certs {
        header.extend(CERT_COLUMNS);
    }
    writer.write_record(&header)?;

    for row in rows {
        writer.write_record(row.tsv_fields())?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush TSV output: {}", e.error()))?;
    let mut out = String::from_utf8(bytes)?;
    // The caller terminates the last line
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}
