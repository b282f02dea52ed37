//! 静态翻译表
//!
//! 进程启动时构造一次，之后只读，通过 `Arc` 传给 `LookupService`。
//! 查不到的 key 原样返回。

use std::collections::HashMap;

/// DB-IP 英文运营商名 -> 中文名
const ISP_NAMES: &[(&str, &str)] = &[
    ("SeeHu Technology", "视虎科技"),
    ("ChinaCache", "蓝汛"),
    ("west.cn", "西部数码"),
    ("Shaanxi BC & TV Network", "陕西广电"),
    ("Jinke Information Network", "金科信息网"),
    ("Tokyo Metropolis CDS International Interconnection Nodes", "东京都北京首都在线(CDS)国际互联节点"),
    ("Weiyi Network", "唯一网络"),
    ("New Generation Network", "新一代"),
    ("Beijing ZhongXinHengYe", "北京众鑫恒业科技有限责任公司"),
    ("SITA", "国际航空电讯集团公司(SITA)"),
    ("BGP multi line", "BGP多线"),
    ("Anchang Network", "安畅网络"),
    ("Yingtong Network", "盈通网络"),
    ("Baidu Cloud", "百度云"),
    ("Great Wall Broadband", "长城宽带"),
    ("China Unicom", "联通"),
    ("Y-Link Network", "云林网络"),
    ("China Mobile", "移动"),
    ("Backbone Network", "骨干网"),
    ("Cnix", "皓宽网络"),
    ("SPEEDTOP", "速必拓网络科技有限公司"),
    ("KUANCOM", "京宽网络"),
    ("Yan Da Zheng Yang", "燕大正洋"),
    ("Wasu", "华数"),
    ("Aiwei Broadband", "爱为宽带"),
    ("Guangzhou Shanghang Information Technology CO., Ltd", "广州尚航信息科技有限公司"),
    ("SIEMENS", "西门子公司"),
    ("Tencent Cloud", "腾讯云"),
    ("Haoyun telecom", "浩云电信"),
    ("FIBRLINK", "中电飞华"),
    ("Dalian University of Technology", "大连理工大学"),
    ("Yungu Technology", "夽谷科技"),
    ("Telstra", "太平洋电信"),
    ("Shanda Group", "盛大网络"),
    ("BGP data center", "BGP数据中心"),
    ("UCloud", "优刻云"),
    ("NOVA net", "南凌科技"),
    ("Aliyun", "阿里云"),
    ("Bangrun Technology", "邦润科技"),
    ("jdcloud", "京东云"),
    ("GAINET", "景安"),
    ("Hewlett-Packard", "惠普"),
    ("Zhujiang Broadband", "珠江宽频"),
    ("Kingsoft Cloud", "金山云"),
    ("China Broadnet", "广电"),
    ("Wangsu", "网宿"),
    ("cloudvsp", "天地祥云"),
    ("Shuhuashi Technology", "舒华士"),
    ("AnLai Communication", "安莱信息通信"),
    ("Quanjie Technology", "全捷科技发展有限公司"),
    ("Baidu Spider", "百度蜘蛛"),
    ("PubYun", "公云PubYun"),
    ("CERNET", "教育网"),
    ("Youtian Broadband", "油田宽带"),
    ("Cisco", "思科"),
    ("California", "加州"),
    ("San Xin Shi Dai", "三信时代"),
    ("niaoyun", "小鸟云"),
    ("Alibaba", "阿里巴巴"),
    ("Oray dandelion", "蒲公英"),
    ("Aadata", "钜讯网络"),
    ("sina", "新浪"),
    ("Ocn", "东方有线"),
    ("Ningbo Gao Fang", "宁波高防"),
    ("He Nei Shi Dai", "广东省河内时代网络科技有限公司深圳分公司"),
    ("Stdaily", "科技网"),
    ("Shitong Broadband", "视通宽带"),
    ("Department of Education of Anhui Province", "安徽省教育厅"),
    ("Base Station WiFi", "基站WiFi"),
    ("HaoYun", "浩云"),
    ("SUNING", "苏宁"),
    ("National Node", "国际节点"),
    ("Tong Mei Group", "同煤集团"),
    ("topway", "天威视讯"),
    ("Woodnn", "网鼎科技"),
    ("Shixun Broadband", "视讯宽带"),
    ("Spider", "蜘蛛"),
    ("CHINACOMM", "中电华通"),
    ("Zonergy", "中兴能源"),
    ("NETEASE", "网易"),
    ("Beijing Wang Yun Wu Xian Technology", "北京网云无限科技有限公司BGP多线数据中心"),
    ("Heng Hui Technology", "恒慧通信"),
    ("Xi'an Jiaotong University", "西安交通大学"),
    ("KJNet", "宽捷网络"),
    ("PCCW", "电讯盈科"),
    ("Yangchen Weiye Technology CO., Ltd", "阳晨伟业科技有限公司"),
    ("Guangdong Wang Cheng CO., Ltd", "广东网城在线有限公司"),
    ("Tian Ying Information Technology", "天盈信息技术"),
    ("Xiang Da Xin", "祥达信"),
    ("SINNET", "光环新网"),
    ("Wensu Network", "稳速网络"),
    ("IDCS", "天互数据电信"),
    ("NET263", "263网络通信"),
    ("Beijing Teletron", "电信通"),
    ("Microsoft Cloud", "微软云"),
    ("Cable Network", "有线"),
    ("Vnet", "世纪互联"),
    ("ground telecom", "润迅通信"),
    ("Hutchison Whampoa Limited (HWL)", "和记黄埔"),
    ("China FAW Group Corporation", "一汽"),
    ("NETEASE Cloud", "网易云"),
    ("Huatong Broadband", "华通宽带"),
    ("Beijing AiDi Communicate", "北京爱迪通信科技有限公司"),
    ("China Pingmei Shenma", "平煤神马集团"),
    ("Netbank", "网银互联"),
    ("China Telecom", "电信"),
    ("Ruijiang Technology", "睿江科技"),
    ("HUAWEI Cloud", "华为云"),
    ("Beijing Gehua CATV Network Co., Ltd", "歌华有线"),
    ("Link-Net telecom", "临网通讯"),
    ("Liaoning Fangyi Tech CO., Ltd", "辽宁方翊科技有限公司"),
    ("CATV", "有线电视"),
    ("Xin Fei Jin Xin", "新飞金信"),
    ("Linux Pathshala", "Linux Pathshala数据中心"),
    ("QingCloud", "青云QingCloud"),
    ("Unknown", "未知"),
    ("China Railcom", "中移铁通"),
    ("Bolu Telecom", "博路电信"),
    ("Google Cloud", "谷歌云"),
    ("KINPONET", "KINPONET软银数据中心"),
    ("KNET", "北龙中网"),
    ("Baidu", "百度"),
    ("Founder Broadband", "方正宽带"),
    ("LanDui Network", "蓝队网络"),
    ("Abbott Laboratories", "北芝加哥雅培公司"),
    ("CNISP", "互联网服务商联盟"),
    ("Huayu Broadband", "华宇宽带"),
    ("Ping'an Technology", "平安科技"),
    ("MOS", "美团云"),
    ("Hong Kong Broadband Network", "香港宽频"),
    ("Kaopu Cloud", "靠谱云"),
    ("BIH", "互联港湾"),
    ("Topnew Info", "铜牛"),
    ("Juyou Network", "聚友网络"),
    ("Amazon Cloud", "亚马逊云"),
    ("Weisai Network", "维赛网络"),
    ("Dr. Peng Telecom and Media Group", "鹏博士"),
];

/// 用户类型 -> 中文标签
const USER_TYPES: &[(&str, &str)] = &[
    ("hosting", "数据中心"),
    ("corporate", "商业公司"),
    ("business", "商业公司"),
    ("consumer", "家庭住宅"),
    ("cellular", "蜂窝网络"),
    ("residential", "家庭住宅"),
];

#[derive(Debug, Clone, Default)]
pub struct TranslationTables {
    isp: HashMap<String, String>,
    user_type: HashMap<String, String>,
}

impl TranslationTables {
    /// 内置表
    pub fn builtin() -> Self {
        Self::from_pairs(ISP_NAMES, USER_TYPES)
    }

    pub fn from_pairs(isp: &[(&str, &str)], user_type: &[(&str, &str)]) -> Self {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            isp: to_map(isp),
            user_type: to_map(user_type),
        }
    }

    pub fn isp_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.isp.get(name).map(String::as_str).unwrap_or(name)
    }

    /// 按 `/` 拆分后逐段翻译，保持原有顺序与结构
    pub fn translate_isp(&self, raw: &str) -> String {
        raw.split('/')
            .map(|part| self.isp_name(part))
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn user_type<'a>(&'a self, raw: &'a str) -> &'a str {
        self.user_type.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn isp_entries(&self) -> usize {
        self.isp.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_has_no_duplicate_keys() {
        let tables = TranslationTables::builtin();
        assert_eq!(tables.isp_entries(), ISP_NAMES.len());
    }

    #[test]
    fn test_translate_isp_components() {
        let tables = TranslationTables::builtin();
        assert_eq!(tables.translate_isp("China Telecom/Aliyun"), "电信/阿里云");
        assert_eq!(tables.translate_isp("China Mobile"), "移动");
    }

    #[test]
    fn test_unmapped_components_pass_through() {
        let tables = TranslationTables::builtin();
        assert_eq!(
            tables.translate_isp("Cloudflare/China Unicom"),
            "Cloudflare/联通"
        );
        assert_eq!(tables.translate_isp(""), "");
        assert_eq!(tables.translate_isp("a//b"), "a//b");
    }

    #[test]
    fn test_user_type_mapping() {
        let tables = TranslationTables::builtin();
        assert_eq!(tables.user_type("hosting"), "数据中心");
        assert_eq!(tables.user_type("residential"), "家庭住宅");
        assert_eq!(tables.user_type("satellite"), "satellite");
    }
}
