// ==========================================
// 主数据 ETL - 列分类注册表
// ==========================================
// 职责: 列名 -> 转换方式 的确定性映射
// 顺序:
//   1. 特殊列精确匹配（大小写不敏感）
//   2. 模式表按声明顺序匹配，首个命中生效
//   3. 默认字符串转换
// 说明: 分类只依赖列名，与数据、列顺序、所属表无关
// ==========================================

use crate::domain::table::Table;
use crate::transform::error::{TransformError, TransformResult};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 转换方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transformation {
    Int,
    Float,
    Str,
    CleanText,
    Date,
    Flag,
}

impl Transformation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transformation::Int => "int",
            Transformation::Float => "float",
            Transformation::Str => "str",
            Transformation::CleanText => "clean_text",
            Transformation::Date => "date",
            Transformation::Flag => "flag",
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 特殊列（需定制清洗的专有名词字段等）
pub const SPECIAL_COLUMNS: &[(&str, Transformation)] = &[
    ("SUPPLIER_NAME", Transformation::CleanText),
    ("PART_NAME", Transformation::CleanText),
    ("LOCALIZATION", Transformation::Flag),
];

/// 列名模式（顺序即优先级）
pub const PATTERN_RULES: &[(&str, Transformation)] = &[
    (r"_ID$", Transformation::Str),
    (r"_(WEIGHT_KG|VOL_M3|AREA_M2)$", Transformation::Float),
    (r"_(LENGTH|WIDTH|HEIGHT)_MM$", Transformation::Int),
    (r"(_STACKING$|_PER_)", Transformation::Int),
    (r"_DATE$", Transformation::Date),
    (r"_(NUMBER|CODE|TYPE|NAME)$", Transformation::Str),
];

/// 单列计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub column: String,
    pub transformation: Transformation,
}

impl ColumnPlan {
    pub fn new(column: impl Into<String>, transformation: Transformation) -> Self {
        Self {
            column: column.into(),
            transformation,
        }
    }
}

/// 列分类注册表
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    special: Vec<(String, Transformation)>,
    rules: Vec<(Regex, Transformation)>,
    default: Transformation,
}

impl ColumnRegistry {
    /// 由特殊列表与模式表构建
    ///
    /// # 错误
    /// - 任一模式无法编译返回 InvalidPattern
    pub fn new(
        special: &[(&str, Transformation)],
        rules: &[(&str, Transformation)],
    ) -> TransformResult<Self> {
        let compiled = rules
            .iter()
            .map(|(pattern, t)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, *t))
                    .map_err(|e| TransformError::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<TransformResult<Vec<_>>>()?;

        Ok(Self {
            special: special
                .iter()
                .map(|(name, t)| (name.to_string(), *t))
                .collect(),
            rules: compiled,
            default: Transformation::Str,
        })
    }

    /// 标准注册表
    pub fn standard() -> TransformResult<Self> {
        Self::new(SPECIAL_COLUMNS, PATTERN_RULES)
    }

    /// 列名分类
    pub fn classify(&self, column: &str) -> Transformation {
        if let Some((_, t)) = self
            .special
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
        {
            return *t;
        }

        self.rules
            .iter()
            .find(|(re, _)| re.is_match(column))
            .map(|(_, t)| *t)
            .unwrap_or(self.default)
    }

    /// 为表的全部列生成计划
    pub fn plan_for(&self, table: &Table) -> Vec<ColumnPlan> {
        table
            .column_names()
            .into_iter()
            .map(|name| ColumnPlan::new(name, self.classify(name)))
            .collect()
    }
}
