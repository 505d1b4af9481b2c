// ==========================================
// 主数据 ETL - 抽取模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 抽取模块错误类型
#[derive(Error, Debug)]
pub enum ExtractError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel 解析失败: {0}")]
    ExcelParse(String),

    #[error("CSV 解析失败: {0}")]
    CsvParse(String),

    #[error("文件无数据: {0}")]
    EmptySource(String),

    // ===== 结构错误 =====
    #[error("实体 {entity} 缺少列: {}", columns.join(", "))]
    MissingColumns {
        entity: String,
        columns: Vec<String>,
    },

    #[error("表结构错误: {0}")]
    Table(#[from] crate::domain::table::TableError),
}

impl From<calamine::Error> for ExtractError {
    fn from(err: calamine::Error) -> Self {
        ExtractError::ExcelParse(err.to_string())
    }
}

impl From<csv::Error> for ExtractError {
    fn from(err: csv::Error) -> Self {
        ExtractError::CsvParse(err.to_string())
    }
}

/// Result 类型别名
pub type ExtractResult<T> = Result<T, ExtractError>;
