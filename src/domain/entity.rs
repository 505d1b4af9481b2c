// ==========================================
// 主数据 ETL - 实体目录
// ==========================================
// 职责: 七类实体的元数据（表名 / 主键 / ID 前缀 / 列清单 / 自然键）
// 说明: 抽取投影、ID 分配、实体装载共用同一份目录
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体类型（按装载顺序声明: 被引用方在前）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Supplier,
    Part,
    Box,
    Pallet,
    Model,
    Workshop,
    Line,
}

impl EntityKind {
    /// 全部实体，顺序即装载顺序
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Supplier,
        EntityKind::Part,
        EntityKind::Box,
        EntityKind::Pallet,
        EntityKind::Model,
        EntityKind::Workshop,
        EntityKind::Line,
    ];

    /// 实体短名
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Supplier => "supplier",
            EntityKind::Part => "part",
            EntityKind::Box => "box",
            EntityKind::Pallet => "pallet",
            EntityKind::Model => "model",
            EntityKind::Workshop => "workshop",
            EntityKind::Line => "line",
        }
    }

    /// 目标表名
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Supplier => "supplier_data",
            EntityKind::Part => "part_data",
            EntityKind::Box => "box_data",
            EntityKind::Pallet => "pallet_data",
            EntityKind::Model => "model_data",
            EntityKind::Workshop => "workshop_data",
            EntityKind::Line => "line_data",
        }
    }

    /// 主键列
    pub fn primary_key(&self) -> &'static str {
        match self {
            EntityKind::Supplier => "SUPPLIER_ID",
            EntityKind::Part => "PART_ID",
            EntityKind::Box => "BOX_ID",
            EntityKind::Pallet => "PALLET_ID",
            EntityKind::Model => "MODEL_ID",
            EntityKind::Workshop => "WORKSHOP_ID",
            EntityKind::Line => "LINE_ID",
        }
    }

    /// 生成 ID 的类型前缀
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Supplier => "SUP_",
            EntityKind::Part => "PRT_",
            EntityKind::Box => "BOX_",
            EntityKind::Pallet => "PLT_",
            EntityKind::Model => "MDL_",
            EntityKind::Workshop => "WSP_",
            EntityKind::Line => "LNE_",
        }
    }

    /// 实体投影所需的列
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Supplier => &[
                "SUPPLIER_ID",
                "SUPPLIER_NAME",
                "LOCATION",
                "CITY",
                "STREET",
                "BUILDING",
                "LOCALIZATION",
            ],
            EntityKind::Part => &[
                "PART_ID",
                "PART_NUMBER",
                "PART_NAME",
                "PART_WEIGHT_KG",
                "SUPPLIER_ID",
            ],
            EntityKind::Box => &[
                "BOX_ID",
                "BOX_TYPE",
                "BOX_WEIGHT_KG",
                "BOX_LENGTH_MM",
                "BOX_WIDTH_MM",
                "BOX_HEIGHT_MM",
                "BOX_VOL_M3",
                "BOX_AREA_M2",
                "BOX_STACKING",
            ],
            EntityKind::Pallet => &[
                "PALLET_ID",
                "PALLET_TYPE",
                "PALLET_WEIGHT_KG",
                "PALLET_LENGTH_MM",
                "PALLET_WIDTH_MM",
                "PALLET_HEIGHT_MM",
                "PALLET_VOL_M3",
                "PALLET_AREA_M2",
                "PALLET_STACKING",
            ],
            EntityKind::Model => &["MODEL_ID", "MODEL_CODE", "MODEL_NAME"],
            EntityKind::Workshop => &["WORKSHOP_ID", "WORKSHOP_CODE", "WORKSHOP_NAME"],
            EntityKind::Line => &["LINE_ID", "LINE_CODE", "LINE_NAME", "WORKSHOP_ID"],
        }
    }

    /// 源表中可选携带的列（存在则一并投影）
    pub fn optional_columns(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Box => &["BOX_NUMBER"],
            EntityKind::Pallet => &["PALLET_NUMBER"],
            _ => &[],
        }
    }

    /// 自然键: 源表无 ID 列时据此派生确定性 ID
    pub fn natural_key(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Supplier => &["SUPPLIER_NAME"],
            EntityKind::Part => &["PART_NUMBER"],
            EntityKind::Box => &["BOX_TYPE", "BOX_LENGTH_MM", "BOX_WIDTH_MM", "BOX_HEIGHT_MM"],
            EntityKind::Pallet => &[
                "PALLET_TYPE",
                "PALLET_LENGTH_MM",
                "PALLET_WIDTH_MM",
                "PALLET_HEIGHT_MM",
            ],
            EntityKind::Model => &["MODEL_CODE"],
            EntityKind::Workshop => &["WORKSHOP_CODE"],
            EntityKind::Line => &["LINE_CODE"],
        }
    }

    /// 表集合中的键名，如 `transformed_supplier`
    pub fn table_key(&self) -> String {
        transformed_key(self.name())
    }

    pub fn from_table_name(table: &str) -> Option<EntityKind> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| k.table_name() == table)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 主表在表集合中的短名
pub const MAIN_TABLE: &str = "main";

/// 转换输出命名约定: `transformed_<name>`
pub fn transformed_key(name: &str) -> String {
    format!("transformed_{}", name)
}
