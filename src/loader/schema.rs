// ==========================================
// 主数据 ETL - 关系模型目录
// ==========================================
// 职责: 13 张目标表的 DDL、外键依赖、联结表定义
// 说明: 8 张实体表 + 5 张联结表；列名大写
// ==========================================

use crate::domain::types::{
    DomainEnum, LocalizationFlag, ModelCode, ModelName, PackagingType, WorkshopCode, WorkshopName,
};

// ==========================================
// 表名
// ==========================================

pub const BREAKPOINT_TABLE: &str = "breakpoint_data";
pub const PART_TO_BREAKPOINT_TABLE: &str = "part_to_breakpoint";

/// 实体表（按装载顺序）
pub const ENTITY_TABLES: [&str; 8] = [
    "supplier_data",
    "part_data",
    "box_data",
    "pallet_data",
    "model_data",
    "workshop_data",
    "line_data",
    BREAKPOINT_TABLE,
];

/// 联结表
pub const JUNCTION_TABLES: [&str; 5] = [
    "part_to_box",
    "box_to_pallet",
    "part_to_model",
    "part_to_line",
    PART_TO_BREAKPOINT_TABLE,
];

/// 全部已知表（校验计数范围）
pub fn all_tables() -> impl Iterator<Item = &'static str> {
    ENTITY_TABLES.iter().chain(JUNCTION_TABLES.iter()).copied()
}

pub fn is_known_table(name: &str) -> bool {
    all_tables().any(|t| t == name)
}

// ==========================================
// 外键依赖
// ==========================================

/// (子表, 子列, 父表, 父列)
pub const FOREIGN_KEYS: &[(&str, &str, &str, &str)] = &[
    ("part_data", "SUPPLIER_ID", "supplier_data", "SUPPLIER_ID"),
    ("line_data", "WORKSHOP_ID", "workshop_data", "WORKSHOP_ID"),
    ("part_to_box", "PART_ID", "part_data", "PART_ID"),
    ("part_to_box", "BOX_ID", "box_data", "BOX_ID"),
    ("box_to_pallet", "BOX_ID", "box_data", "BOX_ID"),
    ("box_to_pallet", "PALLET_ID", "pallet_data", "PALLET_ID"),
    ("part_to_model", "PART_ID", "part_data", "PART_ID"),
    ("part_to_model", "MODEL_ID", "model_data", "MODEL_ID"),
    ("part_to_line", "PART_ID", "part_data", "PART_ID"),
    ("part_to_line", "LINE_ID", "line_data", "LINE_ID"),
    ("part_to_breakpoint", "PART_ID", "part_data", "PART_ID"),
    ("part_to_breakpoint", "BREAKPOINT_ID", "breakpoint_data", "BREAKPOINT_ID"),
];

/// 级联清空顺序: 先子后父，末尾为表本身
pub fn cascade_order(table: &str) -> Vec<&'static str> {
    let mut order: Vec<&'static str> = Vec::new();
    collect_dependents(table, &mut order);
    if let Some(own) = all_tables().find(|t| *t == table) {
        order.push(own);
    }
    order
}

fn collect_dependents(table: &str, order: &mut Vec<&'static str>) {
    for (child, _, parent, _) in FOREIGN_KEYS {
        if *parent == table && !order.contains(child) {
            collect_dependents(child, order);
            if !order.contains(child) {
                order.push(*child);
            }
        }
    }
}

// ==========================================
// 联结表定义
// ==========================================

/// 联结键列的一致化类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Text,
    Integer,
}

/// 从主宽表派生的联结表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JunctionDef {
    pub table: &'static str,
    pub keys: &'static [(&'static str, KeyKind)],
    /// 附加属性列（主表中存在才携带）
    pub attributes: &'static [&'static str],
}

impl JunctionDef {
    pub fn key_names(&self) -> Vec<&'static str> {
        self.keys.iter().map(|(name, _)| *name).collect()
    }
}

pub const JUNCTIONS: [JunctionDef; 4] = [
    JunctionDef {
        table: "part_to_box",
        keys: &[("PART_ID", KeyKind::Text), ("BOX_ID", KeyKind::Text)],
        attributes: &["PART_PER_BOX"],
    },
    JunctionDef {
        table: "box_to_pallet",
        keys: &[("BOX_ID", KeyKind::Text), ("PALLET_ID", KeyKind::Text)],
        attributes: &["BOX_PER_PALLET"],
    },
    JunctionDef {
        table: "part_to_model",
        keys: &[("PART_ID", KeyKind::Text), ("MODEL_ID", KeyKind::Text)],
        attributes: &["CONFIGURATION", "PART_PER_VEHICLE"],
    },
    JunctionDef {
        table: "part_to_line",
        keys: &[("PART_ID", KeyKind::Text), ("LINE_ID", KeyKind::Text)],
        attributes: &[],
    },
];

// ==========================================
// DDL
// ==========================================

fn packaging_table_sql(table: &str, prefix: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            {p}_ID TEXT PRIMARY KEY,
            {p}_NUMBER TEXT,
            {p}_TYPE TEXT CHECK ({p}_TYPE IN ({types})),
            {p}_WEIGHT_KG REAL CHECK ({p}_WEIGHT_KG >= 0),
            {p}_LENGTH_MM INTEGER,
            {p}_WIDTH_MM INTEGER,
            {p}_HEIGHT_MM INTEGER,
            {p}_VOL_M3 REAL CHECK ({p}_VOL_M3 >= 0),
            {p}_AREA_M2 REAL CHECK ({p}_AREA_M2 >= 0),
            {p}_STACKING INTEGER
        )
        "#,
        table = table,
        p = prefix,
        types = PackagingType::sql_in_list(),
    )
}

/// 全部建表语句 (表名, SQL)，顺序满足外键引用
pub fn create_table_statements() -> Vec<(&'static str, String)> {
    let localization = LocalizationFlag::sql_in_list();

    vec![
        (
            "supplier_data",
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS supplier_data (
                    SUPPLIER_ID TEXT PRIMARY KEY,
                    SUPPLIER_NAME TEXT,
                    LOCATION TEXT,
                    CITY TEXT,
                    STREET TEXT,
                    BUILDING TEXT,
                    LOCALIZATION TEXT CHECK (LOCALIZATION IN ({localization}))
                )
                "#
            ),
        ),
        (
            "part_data",
            r#"
            CREATE TABLE IF NOT EXISTS part_data (
                PART_ID TEXT PRIMARY KEY,
                PART_NUMBER TEXT,
                PART_NAME TEXT,
                PART_WEIGHT_KG REAL CHECK (PART_WEIGHT_KG >= 0),
                SUPPLIER_ID TEXT REFERENCES supplier_data(SUPPLIER_ID)
            )
            "#
            .to_string(),
        ),
        ("box_data", packaging_table_sql("box_data", "BOX")),
        ("pallet_data", packaging_table_sql("pallet_data", "PALLET")),
        (
            "model_data",
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS model_data (
                    MODEL_ID TEXT PRIMARY KEY,
                    MODEL_CODE TEXT CHECK (MODEL_CODE IN ({codes})),
                    MODEL_NAME TEXT CHECK (MODEL_NAME IN ({names}))
                )
                "#,
                codes = ModelCode::sql_in_list(),
                names = ModelName::sql_in_list(),
            ),
        ),
        (
            "workshop_data",
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS workshop_data (
                    WORKSHOP_ID TEXT PRIMARY KEY,
                    WORKSHOP_CODE TEXT CHECK (WORKSHOP_CODE IN ({codes})),
                    WORKSHOP_NAME TEXT CHECK (WORKSHOP_NAME IN ({names}))
                )
                "#,
                codes = WorkshopCode::sql_in_list(),
                names = WorkshopName::sql_in_list(),
            ),
        ),
        (
            "line_data",
            r#"
            CREATE TABLE IF NOT EXISTS line_data (
                LINE_ID TEXT PRIMARY KEY,
                LINE_CODE TEXT,
                LINE_NAME TEXT,
                WORKSHOP_ID TEXT REFERENCES workshop_data(WORKSHOP_ID)
            )
            "#
            .to_string(),
        ),
        (
            "breakpoint_data",
            r#"
            CREATE TABLE IF NOT EXISTS breakpoint_data (
                BREAKPOINT_ID INTEGER PRIMARY KEY,
                INPUT_DATE TEXT NOT NULL DEFAULT (datetime('now')),
                BREAKPOINT_NUMBER TEXT NOT NULL,
                BREAKPOINT_DATE TEXT
            )
            "#
            .to_string(),
        ),
        (
            "part_to_box",
            r#"
            CREATE TABLE IF NOT EXISTS part_to_box (
                PART_ID TEXT NOT NULL REFERENCES part_data(PART_ID),
                BOX_ID TEXT NOT NULL REFERENCES box_data(BOX_ID),
                PART_PER_BOX INTEGER,
                PRIMARY KEY (PART_ID, BOX_ID)
            )
            "#
            .to_string(),
        ),
        (
            "box_to_pallet",
            r#"
            CREATE TABLE IF NOT EXISTS box_to_pallet (
                BOX_ID TEXT NOT NULL REFERENCES box_data(BOX_ID),
                PALLET_ID TEXT NOT NULL REFERENCES pallet_data(PALLET_ID),
                BOX_PER_PALLET INTEGER,
                PRIMARY KEY (BOX_ID, PALLET_ID)
            )
            "#
            .to_string(),
        ),
        (
            "part_to_model",
            r#"
            CREATE TABLE IF NOT EXISTS part_to_model (
                PART_ID TEXT NOT NULL REFERENCES part_data(PART_ID),
                MODEL_ID TEXT NOT NULL REFERENCES model_data(MODEL_ID),
                CONFIGURATION TEXT,
                PART_PER_VEHICLE INTEGER,
                PRIMARY KEY (PART_ID, MODEL_ID)
            )
            "#
            .to_string(),
        ),
        (
            "part_to_line",
            r#"
            CREATE TABLE IF NOT EXISTS part_to_line (
                PART_ID TEXT NOT NULL REFERENCES part_data(PART_ID),
                LINE_ID TEXT NOT NULL REFERENCES line_data(LINE_ID),
                PRIMARY KEY (PART_ID, LINE_ID)
            )
            "#
            .to_string(),
        ),
        (
            "part_to_breakpoint",
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS part_to_breakpoint (
                    PART_ID TEXT NOT NULL REFERENCES part_data(PART_ID),
                    BREAKPOINT_ID INTEGER NOT NULL REFERENCES breakpoint_data(BREAKPOINT_ID),
                    IS_ACTIVE_BEFORE INTEGER NOT NULL,
                    IS_ACTIVE_AFTER INTEGER NOT NULL,
                    PART_NUMBER_BEFORE_CHANGE TEXT,
                    SUPPLIER_NAME_BEFORE_CHANGE TEXT,
                    LOCALIZATION_BEFORE_CHANGE TEXT
                        CHECK (LOCALIZATION_BEFORE_CHANGE IN ({localization})),
                    LINE_NAME_BEFORE_CHANGE TEXT,
                    PRIMARY KEY (PART_ID, BREAKPOINT_ID)
                )
                "#
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirteen_tables() {
        assert_eq!(all_tables().count(), 13);
        assert_eq!(create_table_statements().len(), 13);
        for (name, _) in create_table_statements() {
            assert!(is_known_table(name), "{}", name);
        }
    }

    #[test]
    fn test_cascade_order_children_first() {
        let order = cascade_order("supplier_data");
        assert_eq!(order.last(), Some(&"supplier_data"));
        let part = order.iter().position(|t| *t == "part_data").unwrap();
        let link = order.iter().position(|t| *t == "part_to_box").unwrap();
        assert!(link < part);
        assert!(!order.contains(&"box_data"));
    }

    #[test]
    fn test_cascade_order_leaf() {
        assert_eq!(cascade_order("part_to_line"), vec!["part_to_line"]);
        assert!(cascade_order("nope").is_empty());
    }

    #[test]
    fn test_schema_executes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for (_, sql) in create_table_statements() {
            conn.execute_batch(&sql).unwrap();
        }
        conn.execute("INSERT INTO model_data VALUES ('MDL_1', 'A01', 'Jolion')", [])
            .unwrap();
        assert!(conn
            .execute("INSERT INTO model_data VALUES ('MDL_2', 'Z99', 'Jolion')", [])
            .is_err());
    }
}
