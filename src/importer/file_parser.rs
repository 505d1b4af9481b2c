// ==========================================
// 主数据 ETL - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls，第一个工作表) / CSV (.csv)
// 约定: 第一行为表头，表头去除首尾空白，完全空白的行跳过
// 单元格类型:
//   空 -> Null；整数及整值浮点 -> Int；其余浮点 -> Float
//   布尔 -> Bool；Excel 日期 -> DateTime；文本 -> Text（空白 -> Null）
//   单元格错误 -> Null
// ==========================================

use crate::domain::table::{Table, Value};
use crate::importer::error::{ExtractError, ExtractResult};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// 文件解析接口
pub trait FileParser: Send + Sync {
    /// 解析文件为表格
    ///
    /// # 参数
    /// - file_path: 文件路径
    /// - table_name: 结果表名
    fn parse_table(&self, file_path: &Path, table_name: &str) -> ExtractResult<Table>;
}

fn ensure_exists(path: &Path) -> ExtractResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ExtractError::FileNotFound(path.display().to_string()))
    }
}

/// 表头规范化: 去除首尾空白，空表头命名为 COLUMN_<序号>
fn normalize_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    raw.enumerate()
        .map(|(idx, h)| {
            let trimmed = h.trim();
            if trimmed.is_empty() {
                format!("COLUMN_{}", idx + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

fn float_value(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Int(f as i64)
    } else if f.is_finite() {
        Value::Float(f)
    } else {
        Value::Null
    }
}

fn text_value(s: &str) -> Value {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Value::Null
    } else {
        Value::Text(trimmed.to_string())
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// CSV 文本单元格类型推断
    ///
    /// 带前导零的数字串（如 "007"）保持文本，避免编号丢失前导零
    pub fn infer_value(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        let digits = s.strip_prefix('-').unwrap_or(s);
        let leading_zero = digits.len() > 1
            && digits.starts_with('0')
            && digits.as_bytes().get(1).is_some_and(|b| b.is_ascii_digit());
        if leading_zero {
            return Value::Text(s.to_string());
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Int(i);
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Float(f),
            _ => Value::Text(s.to_string()),
        }
    }
}

impl FileParser for CsvParser {
    fn parse_table(&self, file_path: &Path, table_name: &str) -> ExtractResult<Table> {
        ensure_exists(file_path)?;

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers = normalize_headers(reader.headers()?.iter().map(str::to_string));

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<Value> = record.iter().map(Self::infer_value).collect();

            // 跳过完全空白的行
            if row.iter().all(Value::is_null) {
                continue;
            }
            rows.push(row);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "CSV 解析完成");
        Ok(Table::from_rows(table_name, headers, rows))
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// Excel 单元格 -> Value
    pub fn cell_value(cell: &Data) -> Value {
        match cell {
            Data::Empty | Data::Error(_) => Value::Null,
            Data::Int(i) => Value::Int(*i),
            Data::Float(f) => float_value(*f),
            Data::Bool(b) => Value::Bool(*b),
            Data::String(s) => text_value(s),
            Data::DateTime(_) => cell.as_datetime().map(Value::DateTime).unwrap_or(Value::Null),
            Data::DateTimeIso(s) => cell
                .as_datetime()
                .map(Value::DateTime)
                .unwrap_or_else(|| text_value(s)),
            Data::DurationIso(s) => text_value(s),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_table(&self, file_path: &Path, table_name: &str) -> ExtractResult<Table> {
        ensure_exists(file_path)?;

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ExtractError::ExcelParse("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut raw_rows = range.rows();
        let header_row = raw_rows
            .next()
            .ok_or_else(|| ExtractError::EmptySource(file_path.display().to_string()))?;
        let headers = normalize_headers(header_row.iter().map(|cell| cell.to_string()));

        let mut rows = Vec::new();
        for data_row in raw_rows {
            let row: Vec<Value> = data_row.iter().map(Self::cell_value).collect();

            // 跳过完全空白的行
            if row.iter().all(Value::is_null) {
                continue;
            }
            rows.push(row);
        }

        debug!(
            file = %file_path.display(),
            sheet = %sheet_name,
            rows = rows.len(),
            "Excel 解析完成"
        );
        Ok(Table::from_rows(table_name, headers, rows))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_table(&self, file_path: &Path, table_name: &str) -> ExtractResult<Table> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_table(file_path, table_name),
            "xlsx" | "xls" | "xlsm" => ExcelParser.parse_table(file_path, table_name),
            _ => Err(ExtractError::UnsupportedFormat(ext)),
        }
    }
}
