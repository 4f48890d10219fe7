//! Boilerplate contract templates.
//!
//! Used only when a template has no structured content. The boilerplate is
//! chosen by keywords in a hint such as the upload's file name or the
//! contract title.

use serde::{Deserialize, Serialize};

/// A hand-authored contract template family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoilerplateKind {
    /// Residential or commercial lease
    Lease,
    /// Employment contract
    Employment,
    /// Purchase of goods
    Purchase,
    /// Service agreement, the default
    Service,
}

impl BoilerplateKind {
    /// All kinds, in matching order.
    pub const ALL: [BoilerplateKind; 4] = [
        BoilerplateKind::Lease,
        BoilerplateKind::Employment,
        BoilerplateKind::Purchase,
        BoilerplateKind::Service,
    ];

    /// Keywords that select this kind.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            BoilerplateKind::Lease => &["租赁", "租房", "出租", "承租", "lease", "rent", "tenancy"],
            BoilerplateKind::Employment => &[
                "劳动", "聘用", "雇佣", "劳务", "用工", "employment", "labor", "labour", "hire",
            ],
            BoilerplateKind::Purchase => &[
                "采购", "购销", "买卖", "购买", "订购", "purchase", "procurement", "sale",
            ],
            BoilerplateKind::Service => &["服务", "委托", "咨询", "service", "consulting"],
        }
    }

    /// Pick the first kind whose keywords appear in `hint`, else `Service`.
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|k| hint.contains(k)))
            .unwrap_or(BoilerplateKind::Service)
    }

    /// Template text with bracketed placeholders.
    pub fn text(self) -> &'static str {
        match self {
            BoilerplateKind::Lease => LEASE,
            BoilerplateKind::Employment => EMPLOYMENT,
            BoilerplateKind::Purchase => PURCHASE,
            BoilerplateKind::Service => SERVICE,
        }
    }
}

impl std::fmt::Display for BoilerplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoilerplateKind::Lease => write!(f, "lease"),
            BoilerplateKind::Employment => write!(f, "employment"),
            BoilerplateKind::Purchase => write!(f, "purchase"),
            BoilerplateKind::Service => write!(f, "service"),
        }
    }
}

const LEASE: &str = "房屋租赁合同
出租方（甲方）：[甲方名称]
承租方（乙方）：[乙方名称]
第一条 租赁房屋
甲方将位于[房屋地址]的房屋出租给乙方使用，租赁面积为[面积]平方米。
第二条 租赁期限
租赁期限自[起租日期]起至[到期日期]止。
第三条 租金及支付方式
月租金为人民币[月租金]元，乙方应于每月[付租日]日前支付。
第四条 押金
乙方应于签订本合同时向甲方支付押金人民币[押金金额]元。
第五条 其他约定
本合同一式两份，甲乙双方各执一份，自双方签字之日起生效。
甲方（签章）：[甲方名称]
乙方（签章）：[乙方名称]
签订日期：[签订日期]";

const EMPLOYMENT: &str = "劳动合同
用人单位（甲方）：[甲方名称]
劳动者（乙方）：[乙方姓名]
第一条 合同期限
本合同期限自[开始日期]起至[结束日期]止。
第二条 工作内容
乙方同意在[工作岗位]岗位工作，工作地点为[工作地点]。
第三条 劳动报酬
乙方月工资为人民币[月工资]元，甲方于每月[发薪日]日前支付。
第四条 社会保险
甲方依法为乙方缴纳社会保险。
第五条 其他约定
本合同一式两份，双方各执一份，自双方签字之日起生效。
甲方（签章）：[甲方名称]
乙方（签字）：[乙方姓名]
签订日期：[签订日期]";

const PURCHASE: &str = "采购合同
采购方（甲方）：[甲方名称]
供应方（乙方）：[乙方名称]
第一条 采购标的
乙方向甲方提供[货物名称]，数量为[数量]。
第二条 合同金额
合同总金额为人民币[合同金额]元。
第三条 交付
乙方应于[交货日期]前将货物交付至[交货地点]。
第四条 结算方式
甲方于验收合格后[结算天数]日内付清全部货款。
第五条 违约责任
任何一方违约的，应按合同金额的[违约金比例]向守约方支付违约金。
甲方（签章）：[甲方名称]
乙方（签章）：[乙方名称]
签订日期：[签订日期]";

const SERVICE: &str = "服务合同
委托方（甲方）：[甲方名称]
服务方（乙方）：[乙方名称]
第一条 服务内容
乙方为甲方提供[服务内容]服务。
第二条 服务期限
服务期限自[开始日期]起至[结束日期]止。
第三条 服务费用
服务费用总额为人民币[服务费用]元。
第四条 双方权利义务
乙方应按约定标准提供服务，甲方应按约定支付费用。
第五条 其他约定
本合同一式两份，双方各执一份，自双方签字之日起生效。
甲方（签章）：[甲方名称]
乙方（签章）：[乙方名称]
签订日期：[签订日期]";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;
    use crate::variable::{extract, group_by_name};

    #[test]
    fn test_from_hint() {
        assert_eq!(BoilerplateKind::from_hint("房屋租赁合同.pdf"), BoilerplateKind::Lease);
        assert_eq!(BoilerplateKind::from_hint("劳动合同(2024).docx"), BoilerplateKind::Employment);
        assert_eq!(BoilerplateKind::from_hint("Purchase Agreement"), BoilerplateKind::Purchase);
        assert_eq!(BoilerplateKind::from_hint("技术咨询"), BoilerplateKind::Service);
        assert_eq!(BoilerplateKind::from_hint("unknown.docx"), BoilerplateKind::Service);
    }

    #[test]
    fn test_templates_have_typed_placeholders() {
        for kind in BoilerplateKind::ALL {
            let variables = group_by_name(&extract(kind.text()));
            assert!(
                variables.iter().any(|v| v.name == "签订日期" && v.value_type == ValueType::Date),
                "{} has no signing date",
                kind
            );
            assert!(
                variables.iter().any(|v| v.value_type == ValueType::Currency),
                "{} has no amount",
                kind
            );
        }
    }
}
