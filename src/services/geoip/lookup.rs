//! 查询服务
//!
//! 从发布槽取当前句柄，查询原始记录并做本地化。本身不持有可变状态。

use std::net::IpAddr;
use std::sync::Arc;

use tracing::trace;

use super::handle::DatabaseHandle;
use super::language::Language;
use super::record::{LocationRecord, RawRecord};
use super::slot::ActiveHandleSlot;
use super::translations::TranslationTables;
use crate::errors::{Ip2LocError, Result};

pub struct LookupService {
    slot: Arc<ActiveHandleSlot>,
    tables: Arc<TranslationTables>,
}

impl LookupService {
    pub fn new(slot: Arc<ActiveHandleSlot>, tables: Arc<TranslationTables>) -> Self {
        Self { slot, tables }
    }

    pub fn slot(&self) -> &Arc<ActiveHandleSlot> {
        &self.slot
    }

    pub fn tables(&self) -> &TranslationTables {
        &self.tables
    }

    /// 解析 IP 字符串
    pub fn parse_ip(ip: &str) -> Result<IpAddr> {
        ip.parse::<IpAddr>()
            .map_err(|_| Ip2LocError::invalid_ip(format!("{} is not a valid ip address", ip)))
    }

    /// 在给定句柄上查询原始 Location + ISP 记录
    ///
    /// 调用方即使已经校验过 `ip`，这里也会重新解析。
    pub fn lookup_raw(handle: &DatabaseHandle, ip: &str) -> Result<RawRecord> {
        let addr = Self::parse_ip(ip)?;
        if !handle.kind().supports_location_isp() {
            return Err(Ip2LocError::invalid_method(format!(
                "the LocationISP method does not support the {} database",
                handle.database_type()
            )));
        }
        let hit = handle
            .query::<RawRecord>(addr)?
            .ok_or_else(|| Ip2LocError::not_found(format!("no record for {}", addr)))?;
        let mut record = hit.record;
        record.traits.network = hit.network;
        Ok(record)
    }

    /// 多语言字段本地化
    pub fn localize(&self, record: &RawRecord, language: Language) -> LocationRecord {
        localize(&self.tables, record, language)
    }

    /// 对当前句柄查询并本地化
    pub fn lookup(&self, ip: &str, language: Language) -> Result<LocationRecord> {
        let record = self.report(ip)?;
        Ok(self.localize(&record, language))
    }

    /// 对当前句柄查询原始记录
    pub fn report(&self, ip: &str) -> Result<RawRecord> {
        // 持有 Arc 直到查询结束，期间即使发生切换也不会释放该句柄
        let handle = self.slot.load();
        trace!("Lookup {} on {}", ip, handle.fingerprint());
        Self::lookup_raw(&handle, ip)
    }
}

/// 将原始记录按语言本地化
///
/// 地区取第一个 subdivision，城市取第二个；缺失时留空。
/// 运营商与用户类型只在 zh-CN 下翻译。
pub fn localize(
    tables: &TranslationTables,
    record: &RawRecord,
    language: Language,
) -> LocationRecord {
    let region = record.subdivisions.first();
    let city = record.subdivisions.get(1);

    let (isp, user_type) = match language {
        Language::ZhCn => (
            tables.translate_isp(&record.traits.isp),
            tables.user_type(&record.traits.user_type).to_string(),
        ),
        Language::En => (record.traits.isp.clone(), record.traits.user_type.clone()),
    };

    LocationRecord {
        continent: language.resolve(&record.continent.names).to_string(),
        continent_code: record.continent.code.clone(),
        country: language.resolve(&record.country.names).to_string(),
        country_code: record.country.iso_code.clone(),
        region: region
            .map(|s| language.resolve(&s.names).to_string())
            .unwrap_or_default(),
        region_code: region.map(|s| s.iso_code.clone()).unwrap_or_default(),
        city: city
            .map(|s| language.resolve(&s.names).to_string())
            .unwrap_or_default(),
        zip: record.postal.code.clone(),
        timezone: record.location.time_zone.clone(),
        latitude: record.location.latitude,
        longitude: record.location.longitude,
        isp,
        user_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geoip::record::{Names, Subdivision};

    fn names(pairs: &[(&str, &str)]) -> Names {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn localize_builtin(record: &RawRecord, language: Language) -> LocationRecord {
        localize(&TranslationTables::builtin(), record, language)
    }

    fn china_record() -> RawRecord {
        let mut record = RawRecord::default();
        record.continent.code = "AS".into();
        record.continent.names = names(&[("en", "Asia"), ("zh-CN", "亚洲")]);
        record.country.iso_code = "CN".into();
        record.country.names = names(&[("en", "China"), ("zh-CN", "中国")]);
        record.subdivisions = vec![
            Subdivision {
                geoname_id: 1,
                iso_code: "ZJ".into(),
                names: names(&[("en", "Zhejiang"), ("zh-CN", "浙江")]),
            },
            Subdivision {
                geoname_id: 2,
                iso_code: String::new(),
                names: names(&[("en", "Hangzhou")]),
            },
        ];
        record.postal.code = "310000".into();
        record.location.time_zone = "Asia/Shanghai".into();
        record.location.latitude = 30.29;
        record.location.longitude = 120.16;
        record.traits.isp = "China Telecom/Aliyun".into();
        record.traits.user_type = "hosting".into();
        record
    }

    #[test]
    fn test_localize_zh_cn() {
        let info = localize_builtin(&china_record(), Language::ZhCn);
        assert_eq!(info.continent, "亚洲");
        assert_eq!(info.country, "中国");
        assert_eq!(info.region, "浙江");
        assert_eq!(info.region_code, "ZJ");
        // 城市缺少中文名，回退到英文
        assert_eq!(info.city, "Hangzhou");
        assert_eq!(info.isp, "电信/阿里云");
        assert_eq!(info.user_type, "数据中心");
        assert_eq!(info.zip, "310000");
        assert_eq!(info.timezone, "Asia/Shanghai");
        assert_eq!(info.latitude, 30.29);
    }

    #[test]
    fn test_localize_en_keeps_raw_isp_and_user_type() {
        let info = localize_builtin(&china_record(), Language::En);
        assert_eq!(info.country, "China");
        assert_eq!(info.region, "Zhejiang");
        assert_eq!(info.isp, "China Telecom/Aliyun");
        assert_eq!(info.user_type, "hosting");
        assert_eq!(info.country_code, "CN");
        assert_eq!(info.continent_code, "AS");
    }

    #[test]
    fn test_unknown_language_matches_zh_cn() {
        let record = china_record();
        assert_eq!(
            localize_builtin(&record, Language::parse("ja")),
            localize_builtin(&record, Language::ZhCn)
        );
    }

    #[test]
    fn test_missing_subdivisions() {
        let mut record = china_record();
        record.subdivisions.clear();
        let info = localize_builtin(&record, Language::ZhCn);
        assert_eq!(info.region, "");
        assert_eq!(info.region_code, "");
        assert_eq!(info.city, "");

        let mut record = china_record();
        record.subdivisions.truncate(1);
        let info = localize_builtin(&record, Language::ZhCn);
        assert_eq!(info.region, "浙江");
        assert_eq!(info.city, "");
    }

    #[test]
    fn test_parse_ip_rejects_garbage() {
        let err = LookupService::parse_ip("not-an-ip").unwrap_err();
        assert!(matches!(err, Ip2LocError::InvalidIp(_)));
        assert!(err.is_client_error());
        assert!(LookupService::parse_ip("2001:db8::1").is_ok());
    }
}
