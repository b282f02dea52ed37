//! 记录类型
//!
//! `RawRecord` 对应 DB-IP "IP to Location + ISP" 数据库中的一条记录，
//! `LocationRecord` 是本地化之后对外输出的结构。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 多语言名称表，key 为语言代码（如 "en"、"zh-CN"）
pub type Names = HashMap<String, String>;

/// 数据库原始记录
///
/// 库中任何字段都可能缺失，缺失时解码为空值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub city: City,
    pub continent: Continent,
    pub country: Country,
    pub location: Location,
    pub postal: Postal,
    pub subdivisions: Vec<Subdivision>,
    pub traits: Traits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct City {
    pub geoname_id: u32,
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Continent {
    pub code: String,
    pub geoname_id: u32,
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Country {
    pub geoname_id: u32,
    pub iso_code: String,
    pub is_in_european_union: bool,
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub time_zone: String,
    pub weather_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Postal {
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subdivision {
    pub geoname_id: u32,
    pub iso_code: String,
    pub names: Names,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    pub autonomous_system_number: u32,
    pub autonomous_system_organization: String,
    pub connection_type: String,
    pub user_type: String,
    pub isp: String,
    pub organization: String,
    /// 命中的网段，由查询结果填充
    #[serde(skip_deserializing)]
    pub network: String,
}

/// 本地化后的查询结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub continent: String,
    pub continent_code: String,
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub region_code: String,
    pub city: String,
    pub zip: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub isp: String,
    pub user_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_decode_to_defaults() {
        let record: RawRecord =
            serde_json::from_str(r#"{"country": {"iso_code": "CN"}}"#).unwrap();
        assert_eq!(record.country.iso_code, "CN");
        assert!(record.country.names.is_empty());
        assert!(record.subdivisions.is_empty());
        assert_eq!(record.traits.isp, "");
    }

    #[test]
    fn test_location_record_field_names() {
        let value = serde_json::to_value(LocationRecord::default()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "continent",
            "continent_code",
            "country",
            "country_code",
            "region",
            "region_code",
            "city",
            "zip",
            "timezone",
            "latitude",
            "longitude",
            "isp",
            "user_type",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj.len(), 13);
    }
}
