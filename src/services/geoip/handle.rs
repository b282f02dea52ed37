//! 数据库句柄
//!
//! 一个 `DatabaseHandle` 持有一份已打开的 mmdb reader 以及其内容指纹，
//! 构造后不可变。句柄通过 `Arc` 共享，最后一个持有者释放时才会 unmap。

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use maxminddb::Reader;
use memmap2::Mmap;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::debug;
use xxhash_rust::xxh64::{Xxh64, xxh64};

use crate::config::LoadMode;
use crate::errors::{Ip2LocError, Result};

const FINGERPRINT_SEED: u64 = 0;
const READ_CHUNK: usize = 64 * 1024;

/// 内容指纹（XXH64）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(xxh64(bytes, FINGERPRINT_SEED))
    }

    /// 流式计算文件指纹，不把整个文件读进内存
    pub fn of_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut hasher = Xxh64::new(FINGERPRINT_SEED);
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.digest()))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 数据库能力分类，由元数据中的 `database_type` 决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    AnonymousIp,
    Asn,
    City,
    ConnectionType,
    Domain,
    Enterprise,
    Isp,
}

impl DatabaseKind {
    pub fn from_database_type(database_type: &str) -> Option<Self> {
        let kind = match database_type {
            "GeoIP2-Anonymous-IP" => Self::AnonymousIp,
            "DBIP-ASN-Lite (compat=GeoLite2-ASN)" | "GeoLite2-ASN" => Self::Asn,
            "DBIP-City-Lite"
            | "DBIP-Country-Lite"
            | "DBIP-Country"
            | "DBIP-Location (compat=City)"
            | "GeoLite2-City"
            | "GeoIP2-City"
            | "GeoIP2-City-Africa"
            | "GeoIP2-City-Asia-Pacific"
            | "GeoIP2-City-Europe"
            | "GeoIP2-City-North-America"
            | "GeoIP2-City-South-America"
            | "GeoIP2-Precision-City"
            | "GeoLite2-Country"
            | "GeoIP2-Country" => Self::City,
            "GeoIP2-Connection-Type" => Self::ConnectionType,
            "GeoIP2-Domain" => Self::Domain,
            "DBIP-ISP (compat=Enterprise)"
            | "DBIP-Location-ISP (compat=Enterprise)"
            | "GeoIP2-Enterprise"
            | "IPCC-Location-ISP-Enterprise" => Self::Enterprise,
            "GeoIP2-ISP" | "GeoIP2-Precision-ISP" => Self::Isp,
            _ => return None,
        };
        Some(kind)
    }

    /// 只有 Enterprise 类数据库同时带有位置与运营商信息
    pub fn supports_location_isp(&self) -> bool {
        matches!(self, Self::Enterprise)
    }
}

/// reader 背后的字节来源
pub enum DatabaseSource {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for DatabaseSource {
    fn as_ref(&self) -> &[u8] {
        match self {
            DatabaseSource::Mapped(mmap) => &mmap[..],
            DatabaseSource::Owned(bytes) => bytes.as_slice(),
        }
    }
}

impl DatabaseSource {
    fn load(path: &Path, mode: LoadMode) -> Result<Self> {
        match mode {
            LoadMode::Mmap => {
                let file = File::open(path)?;
                // SAFETY: the mapping is read-only. Replacing the file by rename
                // leaves this mapping on the old inode.
                let mmap = unsafe { Mmap::map(&file) }?;
                Ok(DatabaseSource::Mapped(mmap))
            }
            LoadMode::Memory => Ok(DatabaseSource::Owned(std::fs::read(path)?)),
        }
    }
}

/// 已打开的数据库
pub struct DatabaseHandle {
    reader: Reader<DatabaseSource>,
    fingerprint: Fingerprint,
    kind: DatabaseKind,
    path: PathBuf,
    opened_at: DateTime<Utc>,
}

impl DatabaseHandle {
    /// 打开数据库文件
    ///
    /// 指纹基于 reader 实际使用的字节计算，与之后的文件校验结果可直接比较。
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let source = DatabaseSource::load(path, mode)?;
        Self::from_source(source, path)
    }

    /// 从内存中的字节构造（不触碰文件系统）
    pub fn from_bytes(bytes: Vec<u8>, path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(DatabaseSource::Owned(bytes), path.as_ref())
    }

    fn from_source(source: DatabaseSource, path: &Path) -> Result<Self> {
        let fingerprint = Fingerprint::of_bytes(source.as_ref());
        let reader = Reader::from_source(source).map_err(|e| {
            Ip2LocError::database_open(format!("{}: {}", path.display(), e))
        })?;

        let database_type = reader.metadata.database_type.clone();
        let kind = DatabaseKind::from_database_type(&database_type).ok_or_else(|| {
            Ip2LocError::database_open(format!(
                "{}: unknown database type '{}'",
                path.display(),
                database_type
            ))
        })?;

        debug!(
            "Opened database {} (type={}, fingerprint={})",
            path.display(),
            database_type,
            fingerprint
        );

        Ok(Self {
            reader,
            fingerprint,
            kind,
            path: path.to_path_buf(),
            opened_at: Utc::now(),
        })
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }

    pub fn ip_version(&self) -> u16 {
        self.reader.metadata.ip_version
    }

    pub fn build_epoch(&self) -> u64 {
        self.reader.metadata.build_epoch
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// 查询包含 `ip` 的网段记录，`Ok(None)` 表示库中没有数据
    pub fn query<T: DeserializeOwned>(&self, ip: IpAddr) -> Result<Option<QueryHit<T>>> {
        // IPv4-only 数据库中不存在任何 IPv6 网段
        if ip.is_ipv6() && self.ip_version() == 4 {
            return Ok(None);
        }
        let result = self
            .reader
            .lookup(ip)
            .map_err(|e| Ip2LocError::database_read(e.to_string()))?;
        let Some(record) = result
            .decode::<T>()
            .map_err(|e| Ip2LocError::database_read(e.to_string()))?
        else {
            return Ok(None);
        };
        let network = result
            .network()
            .map_err(|e| Ip2LocError::database_read(e.to_string()))?;
        Ok(Some(QueryHit {
            record,
            network: network.to_string(),
        }))
    }
}

/// 一次命中的查询结果
#[derive(Debug, Clone)]
pub struct QueryHit<T> {
    pub record: T,
    /// 命中的网段（CIDR）
    pub network: String,
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("fingerprint", &self.fingerprint)
            .field("opened_at", &self.opened_at)
            .finish()
    }
}

impl Drop for DatabaseHandle {
    fn drop(&mut self) {
        debug!(
            "Released database handle {} ({})",
            self.fingerprint,
            self.path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            DatabaseKind::from_database_type("DBIP-Location-ISP (compat=Enterprise)"),
            Some(DatabaseKind::Enterprise)
        );
        assert_eq!(
            DatabaseKind::from_database_type("GeoLite2-City"),
            Some(DatabaseKind::City)
        );
        assert_eq!(
            DatabaseKind::from_database_type("GeoLite2-ASN"),
            Some(DatabaseKind::Asn)
        );
        assert_eq!(DatabaseKind::from_database_type("Custom-DB"), None);
    }

    #[test]
    fn test_only_enterprise_supports_location_isp() {
        assert!(DatabaseKind::Enterprise.supports_location_isp());
        for kind in [
            DatabaseKind::AnonymousIp,
            DatabaseKind::Asn,
            DatabaseKind::City,
            DatabaseKind::ConnectionType,
            DatabaseKind::Domain,
            DatabaseKind::Isp,
        ] {
            assert!(!kind.supports_location_isp(), "{:?}", kind);
        }
    }

    #[test]
    fn test_streamed_fingerprint_matches_in_memory() {
        // 大于一个读取块，覆盖多次 update
        let data: Vec<u8> = (0..(READ_CHUNK * 2 + 17)).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let streamed = Fingerprint::of_file(file.path()).unwrap();
        assert_eq!(streamed, Fingerprint::of_bytes(&data));
        assert_ne!(streamed, Fingerprint::of_bytes(&data[1..]));
    }

    #[test]
    fn test_fingerprint_display_is_fixed_width_hex() {
        let fp = Fingerprint::of_bytes(b"");
        let rendered = fp.to_string();
        assert_eq!(rendered.len(), 16);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let err = DatabaseHandle::from_bytes(b"definitely not an mmdb".to_vec(), "junk.mmdb")
            .unwrap_err();
        assert!(matches!(err, Ip2LocError::DatabaseOpen(_)));
    }

    #[test]
    fn test_open_missing_file_is_file_error() {
        let err = DatabaseHandle::open("/nonexistent/ip2loc/test.mmdb", LoadMode::Memory)
            .unwrap_err();
        assert!(matches!(err, Ip2LocError::FileOperation(_)));
    }
}
