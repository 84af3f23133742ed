//! Route53 REST API (2013-04-01) response types

use serde::Deserialize;

/// `GET /2013-04-01/hostedzone`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListHostedZonesResponse {
    #[serde(default)]
    pub hosted_zones: HostedZones,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HostedZones {
    #[serde(rename = "HostedZone", default)]
    pub items: Vec<HostedZone>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZone {
    /// `/hostedzone/<id>`
    pub id: String,
    /// Zone name with trailing dot
    pub name: String,
    pub config: Option<HostedZoneConfig>,
}

impl HostedZone {
    /// Bare zone ID without the `/hostedzone/` prefix
    pub fn zone_id(&self) -> &str {
        self.id.trim_start_matches("/hostedzone/")
    }

    /// Zone name without trailing dot
    pub fn domain(&self) -> String {
        decode_name(&self.name)
    }

    pub fn comment(&self) -> &str {
        self.config
            .as_ref()
            .and_then(|c| c.comment.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZoneConfig {
    pub comment: Option<String>,
}

/// `GET /2013-04-01/hostedzone/<id>/rrset`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResourceRecordSetsResponse {
    #[serde(default)]
    pub resource_record_sets: ResourceRecordSets,
    #[serde(default)]
    pub is_truncated: bool,
    pub next_record_name: Option<String>,
    pub next_record_type: Option<String>,
    pub next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    pub items: Vec<ResourceRecordSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecordSet {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    pub resource_records: Option<ResourceRecords>,
    pub alias_target: Option<AliasTarget>,
}

impl ResourceRecordSet {
    /// One value per resource record; an alias yields its target name
    pub fn values(&self) -> Vec<String> {
        if let Some(alias) = &self.alias_target {
            return vec![decode_name(&alias.dns_name)];
        }

        self.resource_records
            .as_ref()
            .map(|rrs| {
                rrs.items
                    .iter()
                    .map(|rr| rr.value.trim_end_matches('.').to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    pub items: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: String,
}

/// `<ErrorResponse>` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Strip the trailing dot and decode `\ooo` octal escapes (`\052` is `*`)
pub fn decode_name(name: &str) -> String {
    let name = name.trim_end_matches('.');
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let code = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Some(c) = char::from_u32(code) {
                out.push(c);
                i += 4;
                continue;
            }
        }
        // Route53 names are ASCII; anything else is copied through untouched
        let ch_len = name[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&name[i..i + ch_len]);
        i += ch_len;
    }

    out
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|b| (b'0'..=b'7').contains(b))
}
