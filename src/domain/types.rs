// ==========================================
// 主数据 ETL - 领域枚举定义
// ==========================================
// 职责: 固定取值域（本地化标志 / 包装类型 / 车型 / 车间）
// 用途: 建表 CHECK 约束、取值归一化
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 固定取值域的公共行为
pub trait DomainEnum: Sized + Copy + 'static {
    /// 全部取值（按声明顺序）
    fn all() -> &'static [Self];

    /// 入库文本
    fn as_str(&self) -> &'static str;

    /// 精确匹配入库文本
    fn parse(raw: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.as_str() == raw)
    }

    /// 生成 SQL `IN (...)` 列表，用于 CHECK 约束
    fn sql_in_list() -> String {
        Self::all()
            .iter()
            .map(|v| format!("'{}'", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ==========================================
// 本地化标志 (Localization Flag)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalizationFlag {
    Yes,
    No,
}

impl LocalizationFlag {
    /// 宽松解析源表中的本地化标志
    ///
    /// yes/y/true/1/да -> Yes，no/n/false/0/нет -> No，其余 None
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "yes" | "y" | "true" | "1" | "да" => Some(LocalizationFlag::Yes),
            "no" | "n" | "false" | "0" | "нет" => Some(LocalizationFlag::No),
            _ => None,
        }
    }
}

impl DomainEnum for LocalizationFlag {
    fn all() -> &'static [Self] {
        &[LocalizationFlag::Yes, LocalizationFlag::No]
    }

    fn as_str(&self) -> &'static str {
        match self {
            LocalizationFlag::Yes => "yes",
            LocalizationFlag::No => "no",
        }
    }
}

// ==========================================
// 包装类型 (Packaging Type)
// ==========================================
// 编号前缀: A = 一次性, B = 周转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackagingType {
    Returnable,
    NonReturnable,
}

impl PackagingType {
    pub fn number_prefix(&self) -> char {
        match self {
            PackagingType::NonReturnable => 'A',
            PackagingType::Returnable => 'B',
        }
    }
}

impl DomainEnum for PackagingType {
    fn all() -> &'static [Self] {
        &[PackagingType::Returnable, PackagingType::NonReturnable]
    }

    fn as_str(&self) -> &'static str {
        match self {
            PackagingType::Returnable => "returnable",
            PackagingType::NonReturnable => "non-returnable",
        }
    }
}

// ==========================================
// 车型代码 / 车型名称
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelCode {
    A01,
    A08,
    B02,
    B04,
    B06,
    B16,
}

impl DomainEnum for ModelCode {
    fn all() -> &'static [Self] {
        &[
            ModelCode::A01,
            ModelCode::A08,
            ModelCode::B02,
            ModelCode::B04,
            ModelCode::B06,
            ModelCode::B16,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            ModelCode::A01 => "A01",
            ModelCode::A08 => "A08",
            ModelCode::B02 => "B02",
            ModelCode::B04 => "B04",
            ModelCode::B06 => "B06",
            ModelCode::B16 => "B16",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelName {
    Jolion,
    H3,
    F7,
    F7x,
    Dargo,
    H7,
}

impl DomainEnum for ModelName {
    fn all() -> &'static [Self] {
        &[
            ModelName::Jolion,
            ModelName::H3,
            ModelName::F7,
            ModelName::F7x,
            ModelName::Dargo,
            ModelName::H7,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            ModelName::Jolion => "Jolion",
            ModelName::H3 => "H3",
            ModelName::F7 => "F7",
            ModelName::F7x => "F7x",
            ModelName::Dargo => "Dargo",
            ModelName::H7 => "H7",
        }
    }
}

// ==========================================
// 车间代码 / 车间名称
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkshopCode {
    Assembly,
    Component,
    Painting,
    Welding,
    Stamping,
    Engine,
}

impl DomainEnum for WorkshopCode {
    fn all() -> &'static [Self] {
        &[
            WorkshopCode::Assembly,
            WorkshopCode::Component,
            WorkshopCode::Painting,
            WorkshopCode::Welding,
            WorkshopCode::Stamping,
            WorkshopCode::Engine,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            WorkshopCode::Assembly => "AS",
            WorkshopCode::Component => "COMP",
            WorkshopCode::Painting => "PAINT",
            WorkshopCode::Welding => "WELD",
            WorkshopCode::Stamping => "STAMP",
            WorkshopCode::Engine => "EN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkshopName {
    Assembly,
    Component,
    Painting,
    Welding,
    Stamping,
    Engine,
}

impl DomainEnum for WorkshopName {
    fn all() -> &'static [Self] {
        &[
            WorkshopName::Assembly,
            WorkshopName::Component,
            WorkshopName::Painting,
            WorkshopName::Welding,
            WorkshopName::Stamping,
            WorkshopName::Engine,
        ]
    }

    fn as_str(&self) -> &'static str {
        match self {
            WorkshopName::Assembly => "Assembly",
            WorkshopName::Component => "Component",
            WorkshopName::Painting => "Painting",
            WorkshopName::Welding => "Welding",
            WorkshopName::Stamping => "Stamping",
            WorkshopName::Engine => "Engine",
        }
    }
}

macro_rules! impl_display_via_as_str {
    ($($t:ty),*) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.as_str())
                }
            }
        )*
    };
}

impl_display_via_as_str!(
    LocalizationFlag,
    PackagingType,
    ModelCode,
    ModelName,
    WorkshopCode,
    WorkshopName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localization_normalize() {
        assert_eq!(LocalizationFlag::normalize(" YES "), Some(LocalizationFlag::Yes));
        assert_eq!(LocalizationFlag::normalize("нет"), Some(LocalizationFlag::No));
        assert_eq!(LocalizationFlag::normalize("maybe"), None);
    }

    #[test]
    fn test_packaging_parse_and_prefix() {
        let t = PackagingType::parse("non-returnable").unwrap();
        assert_eq!(t.number_prefix(), 'A');
        assert_eq!(PackagingType::Returnable.number_prefix(), 'B');
        assert_eq!(PackagingType::parse("Returnable"), None);
    }

    #[test]
    fn test_sql_in_list() {
        assert_eq!(LocalizationFlag::sql_in_list(), "'yes', 'no'");
        assert!(WorkshopCode::sql_in_list().contains("'STAMP'"));
    }
}
