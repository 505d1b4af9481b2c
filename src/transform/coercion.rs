// ==========================================
// 主数据 ETL - 类型强制转换
// ==========================================
// 职责: 整数 / 浮点 / 字符串 / 日期 / 本地化标志的单值转换
// 约定: 每次转换返回带标签的结果 Coerced，而不是静默回退
// - Converted: 成功
// - Defaulted: 输入为空（Null 或空白文本），结果为 Null
// - Failed:    无法解析，结果为 Null，附原因
// ==========================================

use crate::domain::table::{Value, DATETIME_FORMAT};
use crate::domain::types::{DomainEnum, LocalizationFlag};
use chrono::{NaiveDate, NaiveDateTime};

/// 单值转换结果
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    Converted(Value),
    Defaulted,
    Failed(String),
}

impl Coerced {
    /// 结果值；Defaulted / Failed 均为 Null
    pub fn into_value(self) -> Value {
        match self {
            Coerced::Converted(v) => v,
            Coerced::Defaulted | Coerced::Failed(_) => Value::Null,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Coerced::Failed(_))
    }
}

/// 列级转换统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionStats {
    pub converted: usize,
    pub defaulted: usize,
    pub failed: usize,
}

impl CoercionStats {
    pub fn record(&mut self, outcome: &Coerced) {
        match outcome {
            Coerced::Converted(_) => self.converted += 1,
            Coerced::Defaulted => self.defaulted += 1,
            Coerced::Failed(_) => self.failed += 1,
        }
    }
}

/// 保留两位小数；放大后溢出的值本身已无小数位，原样返回
pub fn round2(x: f64) -> f64 {
    let scaled = x * 100.0;
    if !scaled.is_finite() {
        return x;
    }
    scaled.round() / 100.0
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// ==========================================
// 整数
// ==========================================

/// 转为 64 位整数
///
/// 文本先按原样解析，失败后去除首尾空白再解析，
/// 最后接受整值小数文本（"600.0"）
pub fn coerce_int(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::Defaulted,
        Value::Int(i) => Coerced::Converted(Value::Int(*i)),
        Value::Bool(b) => Coerced::Converted(Value::Int(i64::from(*b))),
        Value::Float(f) => float_to_int(*f),
        Value::Text(s) if is_blank(s) => Coerced::Defaulted,
        Value::Text(s) => {
            if let Ok(i) = s.parse::<i64>() {
                return Coerced::Converted(Value::Int(i));
            }
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Coerced::Converted(Value::Int(i));
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 => float_to_int(f),
                _ => Coerced::Failed(format!("无法解析为整数: {:?}", s)),
            }
        }
        Value::DateTime(_) => Coerced::Failed("日期时间无法转为整数".to_string()),
    }
}

fn float_to_int(f: f64) -> Coerced {
    // i64::MAX as f64 向上取整为 2^63，需用半开区间
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Coerced::Converted(Value::Int(f.trunc() as i64))
    } else {
        Coerced::Failed(format!("超出 i64 范围: {}", f))
    }
}

// ==========================================
// 浮点
// ==========================================

/// 转为 64 位浮点并保留两位小数；非有限值视为失败
pub fn coerce_float(value: &Value) -> Coerced {
    let parsed = match value {
        Value::Null => return Coerced::Defaulted,
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Text(s) if is_blank(s) => return Coerced::Defaulted,
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(f) => f,
            Err(_) => return Coerced::Failed(format!("无法解析为浮点数: {:?}", s)),
        },
        Value::DateTime(_) => {
            return Coerced::Failed("日期时间无法转为浮点数".to_string());
        }
    };

    let rounded = round2(parsed);
    if rounded.is_finite() {
        Coerced::Converted(Value::Float(rounded))
    } else {
        Coerced::Failed(format!("非有限数值: {}", parsed))
    }
}

/// 整列浮点转换是否会结构性失败（列中混有日期时间）
pub fn float_column_is_structurally_invalid(values: &[Value]) -> bool {
    values.iter().any(|v| matches!(v, Value::DateTime(_)))
}

// ==========================================
// 字符串
// ==========================================

/// 转为文本；Null 保持 Null
pub fn coerce_string(value: &Value) -> Coerced {
    match value.to_text() {
        Some(s) => Coerced::Converted(Value::Text(s)),
        None => Coerced::Defaulted,
    }
}

// ==========================================
// 日期
// ==========================================

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y"];

/// 转为日期时间；仅含日期的文本取当日零点
pub fn coerce_date(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::Defaulted,
        Value::DateTime(dt) => Coerced::Converted(Value::DateTime(*dt)),
        Value::Text(s) if is_blank(s) => Coerced::Defaulted,
        Value::Text(s) => match parse_datetime(s.trim()) {
            Some(dt) => Coerced::Converted(Value::DateTime(dt)),
            None => Coerced::Failed(format!("无法解析为日期: {:?}", s)),
        },
        Value::Int(i) => match parse_datetime(&i.to_string()) {
            Some(dt) => Coerced::Converted(Value::DateTime(dt)),
            None => Coerced::Failed(format!("无法解析为日期: {}", i)),
        },
        other => Coerced::Failed(format!("{} 无法转为日期", other.type_name())),
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ==========================================
// 本地化标志
// ==========================================

/// 归一化为 "yes" / "no"
pub fn coerce_flag(value: &Value) -> Coerced {
    let flag = match value {
        Value::Null => return Coerced::Defaulted,
        Value::Text(s) if is_blank(s) => return Coerced::Defaulted,
        Value::Text(s) => LocalizationFlag::normalize(s),
        Value::Bool(true) | Value::Int(1) => Some(LocalizationFlag::Yes),
        Value::Bool(false) | Value::Int(0) => Some(LocalizationFlag::No),
        _ => None,
    };

    match flag {
        Some(f) => Coerced::Converted(Value::Text(f.as_str().to_string())),
        None => Coerced::Failed(format!("无法识别的本地化标志: {}", value)),
    }
}
