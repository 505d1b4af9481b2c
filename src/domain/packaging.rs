// ==========================================
// 主数据 ETL - 包装编号
// ==========================================
// 规则: "<A|B> <长>-<宽>-<高>"，A = 一次性包装，B = 周转包装
// 性质: 纯函数，同一组 (类型, 尺寸) 恒得同一编号
// ==========================================

use crate::domain::table::Value;
use crate::domain::types::{DomainEnum, PackagingType};

/// 由包装类型与尺寸计算包装编号
pub fn packaging_number(
    kind: PackagingType,
    length_mm: i64,
    width_mm: i64,
    height_mm: i64,
) -> String {
    format!(
        "{} {}-{}-{}",
        kind.number_prefix(),
        length_mm,
        width_mm,
        height_mm
    )
}

/// 由单元格值计算包装编号
///
/// 任一输入缺失或无法识别时返回 None（调用方保留源值）
pub fn packaging_number_from_values(
    kind: &Value,
    length: &Value,
    width: &Value,
    height: &Value,
) -> Option<String> {
    let kind = kind.as_text().and_then(PackagingType::parse)?;
    Some(packaging_number(
        kind,
        dimension(length)?,
        dimension(width)?,
        dimension(height)?,
    ))
}

fn dimension(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packaging_number_format() {
        assert_eq!(
            packaging_number(PackagingType::NonReturnable, 600, 400, 300),
            "A 600-400-300"
        );
        assert_eq!(
            packaging_number(PackagingType::Returnable, 1200, 800, 150),
            "B 1200-800-150"
        );
    }

    #[test]
    fn test_from_values_requires_all_inputs() {
        let kind = Value::from("returnable");
        assert_eq!(
            packaging_number_from_values(&kind, &Value::Int(1), &Value::Float(2.0), &Value::Int(3)),
            Some("B 1-2-3".to_string())
        );
        assert_eq!(
            packaging_number_from_values(&kind, &Value::Int(1), &Value::Null, &Value::Int(3)),
            None
        );
        assert_eq!(
            packaging_number_from_values(
                &Value::from("crate"),
                &Value::Int(1),
                &Value::Int(2),
                &Value::Int(3),
            ),
            None
        );
    }
}
