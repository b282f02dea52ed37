//! Shared test helpers
//!
//! A minimal MaxMind DB writer (IPv4 tree, 24-bit records) so integration
//! tests can build fixture databases on the fly.

#![allow(dead_code)]

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

const METADATA_MARKER: &[u8] = b"\xAB\xCD\xEFMaxMind.com";

pub const ENTERPRISE_TYPE: &str = "DBIP-Location-ISP (compat=Enterprise)";
pub const CITY_TYPE: &str = "DBIP-City-Lite";

// =============================================================================
// Data section values
// =============================================================================

#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Double(f64),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Array(Vec<Value>),
    Map(Vec<(String, Value)>),
}

pub fn s(v: &str) -> Value {
    Value::Str(v.to_string())
}

pub fn map(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

pub fn names(en: &str, zh: &str) -> Value {
    map(vec![("en", s(en)), ("zh-CN", s(zh))])
}

fn control(type_id: u8, size: usize, out: &mut Vec<u8>) {
    let (type_bits, extended) = if type_id <= 7 {
        (type_id << 5, None)
    } else {
        (0, Some(type_id - 7))
    };

    let (size_bits, extra): (u8, Vec<u8>) = if size < 29 {
        (size as u8, vec![])
    } else if size < 29 + 256 {
        (29, vec![(size - 29) as u8])
    } else if size < 29 + 256 + 65536 {
        (30, ((size - 285) as u16).to_be_bytes().to_vec())
    } else {
        (31, ((size - 65821) as u32).to_be_bytes()[1..].to_vec())
    };

    out.push(type_bits | size_bits);
    if let Some(ext) = extended {
        out.push(ext);
    }
    out.extend_from_slice(&extra);
}

fn trimmed(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

pub fn encode(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Str(v) => {
            control(2, v.len(), out);
            out.extend_from_slice(v.as_bytes());
        }
        Value::Double(v) => {
            control(3, 8, out);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::U16(v) => {
            let bytes = v.to_be_bytes();
            let payload = trimmed(&bytes);
            control(5, payload.len(), out);
            out.extend_from_slice(payload);
        }
        Value::U32(v) => {
            let bytes = v.to_be_bytes();
            let payload = trimmed(&bytes);
            control(6, payload.len(), out);
            out.extend_from_slice(payload);
        }
        Value::Map(pairs) => {
            control(7, pairs.len(), out);
            for (key, v) in pairs {
                encode(&Value::Str(key.clone()), out);
                encode(v, out);
            }
        }
        Value::U64(v) => {
            let bytes = v.to_be_bytes();
            let payload = trimmed(&bytes);
            control(9, payload.len(), out);
            out.extend_from_slice(payload);
        }
        Value::Array(items) => {
            control(11, items.len(), out);
            for item in items {
                encode(item, out);
            }
        }
        Value::Bool(v) => control(14, usize::from(*v), out),
    }
}

// =============================================================================
// Database writer
// =============================================================================

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Node(u32),
    Data(u32),
}

pub struct MmdbWriter {
    database_type: String,
    build_epoch: u64,
    networks: Vec<(Ipv4Addr, u8, Value)>,
}

impl MmdbWriter {
    pub fn new(database_type: &str) -> Self {
        Self {
            database_type: database_type.to_string(),
            build_epoch: 1_700_000_000,
            networks: Vec::new(),
        }
    }

    pub fn build_epoch(mut self, epoch: u64) -> Self {
        self.build_epoch = epoch;
        self
    }

    /// Networks must not overlap
    pub fn insert(mut self, network: Ipv4Addr, prefix: u8, value: Value) -> Self {
        assert!((1..=32).contains(&prefix));
        self.networks.push((network, prefix, value));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = Vec::new();
        let mut nodes: Vec<[Slot; 2]> = vec![[Slot::Empty, Slot::Empty]];

        for (network, prefix, value) in &self.networks {
            let offset = data.len() as u32;
            encode(value, &mut data);

            let bits = u32::from(*network);
            let mut node = 0usize;
            for depth in 0..*prefix {
                let bit = ((bits >> (31 - depth)) & 1) as usize;
                if depth + 1 == *prefix {
                    nodes[node][bit] = Slot::Data(offset);
                    break;
                }
                node = match nodes[node][bit] {
                    Slot::Node(next) => next as usize,
                    Slot::Empty => {
                        nodes.push([Slot::Empty, Slot::Empty]);
                        let next = nodes.len() - 1;
                        nodes[node][bit] = Slot::Node(next as u32);
                        next
                    }
                    Slot::Data(_) => panic!("overlapping networks in fixture"),
                };
            }
        }

        let node_count = nodes.len() as u32;
        let record = |slot: Slot| -> u32 {
            match slot {
                Slot::Empty => node_count,
                Slot::Node(n) => n,
                Slot::Data(offset) => node_count + 16 + offset,
            }
        };

        let mut out = Vec::with_capacity(nodes.len() * 6 + 16 + data.len() + 256);
        for [left, right] in nodes {
            out.extend_from_slice(&record(left).to_be_bytes()[1..]);
            out.extend_from_slice(&record(right).to_be_bytes()[1..]);
        }
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&data);

        out.extend_from_slice(METADATA_MARKER);
        let metadata = map(vec![
            ("binary_format_major_version", Value::U16(2)),
            ("binary_format_minor_version", Value::U16(0)),
            ("build_epoch", Value::U64(self.build_epoch)),
            ("database_type", s(&self.database_type)),
            ("description", map(vec![("en", s("ip2loc test fixture"))])),
            ("ip_version", Value::U16(4)),
            ("languages", Value::Array(vec![s("en"), s("zh-CN")])),
            ("node_count", Value::U32(node_count)),
            ("record_size", Value::U16(24)),
        ]);
        encode(&metadata, &mut out);
        out
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Full Location + ISP record
pub fn location_isp_record(
    country: (&str, &str),
    iso_code: &str,
    region: Option<(&str, &str, &str)>,
    city: Option<(&str, &str)>,
    isp: &str,
    user_type: &str,
) -> Value {
    let mut subdivisions = Vec::new();
    if let Some((en, zh, code)) = region {
        subdivisions.push(map(vec![("iso_code", s(code)), ("names", names(en, zh))]));
    }
    if let Some((en, zh)) = city {
        subdivisions.push(map(vec![("names", names(en, zh))]));
    }

    map(vec![
        (
            "continent",
            map(vec![("code", s("AS")), ("names", names("Asia", "亚洲"))]),
        ),
        (
            "country",
            map(vec![
                ("iso_code", s(iso_code)),
                ("is_in_european_union", Value::Bool(false)),
                ("names", names(country.0, country.1)),
            ]),
        ),
        (
            "location",
            map(vec![
                ("latitude", Value::Double(30.2936)),
                ("longitude", Value::Double(120.1614)),
                ("time_zone", s("Asia/Shanghai")),
            ]),
        ),
        ("postal", map(vec![("code", s("310000"))])),
        ("subdivisions", Value::Array(subdivisions)),
        (
            "traits",
            map(vec![
                ("autonomous_system_number", Value::U32(4134)),
                ("isp", s(isp)),
                ("user_type", s(user_type)),
            ]),
        ),
    ])
}

/// 1.2.3.0/24: Hangzhou over China Telecom/Aliyun
/// 8.8.8.0/24: country only, no subdivisions
pub fn sample_database(epoch: u64) -> Vec<u8> {
    MmdbWriter::new(ENTERPRISE_TYPE)
        .build_epoch(epoch)
        .insert(
            Ipv4Addr::new(1, 2, 3, 0),
            24,
            location_isp_record(
                ("China", "中国"),
                "CN",
                Some(("Zhejiang", "浙江", "ZJ")),
                Some(("Hangzhou", "杭州")),
                "China Telecom/Aliyun",
                "residential",
            ),
        )
        .insert(
            Ipv4Addr::new(8, 8, 8, 0),
            24,
            location_isp_record(
                ("United States", "美国"),
                "US",
                None,
                None,
                "Google",
                "hosting",
            ),
        )
        .build()
}

/// Same layout as [`sample_database`] but the 1.2.3.0/24 ISP is different,
/// so lookups tell the generations apart.
pub fn updated_database(epoch: u64) -> Vec<u8> {
    MmdbWriter::new(ENTERPRISE_TYPE)
        .build_epoch(epoch)
        .insert(
            Ipv4Addr::new(1, 2, 3, 0),
            24,
            location_isp_record(
                ("China", "中国"),
                "CN",
                Some(("Zhejiang", "浙江", "ZJ")),
                Some(("Hangzhou", "杭州")),
                "China Mobile",
                "cellular",
            ),
        )
        .build()
}

/// A City database, which cannot serve Location + ISP lookups
pub fn city_database() -> Vec<u8> {
    MmdbWriter::new(CITY_TYPE)
        .insert(
            Ipv4Addr::new(1, 2, 3, 0),
            24,
            map(vec![("country", map(vec![("iso_code", s("CN"))]))]),
        )
        .build()
}

pub fn write_database(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write fixture database");
    path
}

/// Replace `path` atomically via rename from a sibling temp file
pub fn replace_database(path: &Path, bytes: &[u8]) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).expect("Failed to write temp database");
    std::fs::rename(&tmp, path).expect("Failed to rename database into place");
}

/// Overwrite `path` in place: truncate the live inode, then write in chunks
pub fn rewrite_in_place(path: &Path, bytes: &[u8]) {
    use std::io::Write;
    let mut file = std::fs::File::create(path).expect("Failed to truncate database");
    for chunk in bytes.chunks(64) {
        file.write_all(chunk).expect("Failed to rewrite database");
    }
    file.sync_all().expect("Failed to sync database");
}
