//! 语言选择与名称回退
//!
//! 只支持两种语言：zh-CN（默认）与 en，二者互为备选。

use std::fmt;

use super::record::Names;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    ZhCn,
    En,
}

impl Language {
    /// 解析语言代码，无法识别时回落到 zh-CN
    pub fn parse(code: &str) -> Self {
        match code {
            "en" => Language::En,
            _ => Language::ZhCn,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::ZhCn => "zh-CN",
            Language::En => "en",
        }
    }

    pub fn alternate(&self) -> Self {
        match self {
            Language::ZhCn => Language::En,
            Language::En => Language::ZhCn,
        }
    }

    /// 按 主语言 -> 备选语言 -> 任意一个 的顺序取名称，全部缺失时为空串
    ///
    /// 第三步的结果依赖 map 的迭代顺序，不保证确定。
    pub fn resolve<'a>(&self, names: &'a Names) -> &'a str {
        names
            .get(self.code())
            .or_else(|| names.get(self.alternate().code()))
            .or_else(|| names.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
