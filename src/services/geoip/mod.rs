//! GeoIP 服务模块
//!
//! - `handle`: 已打开的 mmdb 数据库及其内容指纹
//! - `slot`: 当前生效句柄的原子发布槽
//! - `lookup`: 查询与本地化
//! - `translations`: 运营商 / 用户类型翻译表

mod handle;
mod language;
mod lookup;
mod record;
mod slot;
mod translations;

pub use handle::{DatabaseHandle, DatabaseKind, DatabaseSource, Fingerprint, QueryHit};
pub use language::Language;
pub use lookup::{LookupService, localize};
pub use record::{
    City, Continent, Country, Location, LocationRecord, Names, Postal, RawRecord, Subdivision,
    Traits,
};
pub use slot::ActiveHandleSlot;
pub use translations::TranslationTables;
