// ==========================================
// 主数据 ETL - 文本清洗流水线
// ==========================================
// 职责: 名称类自由文本的多语言归一化
// 流程:
//   1. 含汉字 -> 转拼音（失败则保留原值继续清洗）
//   2. 小写后接大写处插入空格（camelCase）
//   3. 每个大写字母（拉丁 / 西里尔）前插入空格（PascalCase）
//   4. 数字片段前后插入空格
//   5. 特殊字符、制表符、换行替换为空格
//   6. 合并连续空白并去除首尾空白
//   7. 按空格分词首字母大写
// 降级: 单值失败时仅执行 5-7
// ==========================================

use crate::transform::error::{CleanError, TransformError, TransformResult};
use pinyin::ToPinyin;
use regex::Regex;

/// 单值长度上限（字符数），超出则降级
pub const MAX_CLEAN_CHARS: usize = 4_096;

/// 需替换为空格的特殊字符
pub const SPECIAL_CHARS: &str = r#"-)(][.,;:_/\|+*&^%$#@!~`"'<>?{}"#;

const CJK_PATTERN: &str = r"[\u{4e00}-\u{9fff}\u{3400}-\u{4dbf}\u{f900}-\u{faff}]";
const CAMEL_PATTERN: &str = r"([a-z])([A-Z])";
const UPPER_RUN_PATTERN: &str = r"([A-ZА-ЯЁ][^A-ZА-ЯЁ]*)";
const NUMBER_PATTERN: &str = r"(\d+(?:\.\d+)?)";
const WHITESPACE_PATTERN: &str = r"\s+";

/// 单值清洗结果
#[derive(Debug, Clone, PartialEq)]
pub enum CleanOutcome {
    /// 完整流水线
    Cleaned(String),
    /// 降级为基础清洗（5-7）
    Degraded { value: String, reason: CleanError },
}

impl CleanOutcome {
    pub fn value(&self) -> &str {
        match self {
            CleanOutcome::Cleaned(v) => v,
            CleanOutcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> String {
        match self {
            CleanOutcome::Cleaned(v) => v,
            CleanOutcome::Degraded { value, .. } => value,
        }
    }
}

/// 文本清洗器（正则在构造时一次编译）
#[derive(Debug, Clone)]
pub struct TextCleaner {
    cjk: Regex,
    camel: Regex,
    upper_run: Regex,
    number: Regex,
    special: Regex,
    whitespace: Regex,
    max_chars: usize,
}

impl TextCleaner {
    /// 创建清洗器
    ///
    /// # 错误
    /// - 正则编译失败返回 InvalidPattern（启动期致命）
    pub fn new() -> TransformResult<Self> {
        let special = format!("[{}\n\t]", regex::escape(SPECIAL_CHARS));
        Ok(Self {
            cjk: compile(CJK_PATTERN)?,
            camel: compile(CAMEL_PATTERN)?,
            upper_run: compile(UPPER_RUN_PATTERN)?,
            number: compile(NUMBER_PATTERN)?,
            special: compile(&special)?,
            whitespace: compile(WHITESPACE_PATTERN)?,
            max_chars: MAX_CLEAN_CHARS,
        })
    }

    /// 调整单值长度上限
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn contains_cjk(&self, text: &str) -> bool {
        self.cjk.is_match(text)
    }

    /// 汉字转拼音（同一连续汉字段拼写相连）
    ///
    /// 存在无读音的汉字时返回 None
    pub fn transliterate(&self, text: &str) -> Option<String> {
        let mut out = String::with_capacity(text.len() * 2);
        for ch in text.chars() {
            match ch.to_pinyin() {
                Some(p) => out.push_str(p.plain()),
                None => out.push(ch),
            }
        }

        if self.contains_cjk(&out) {
            None
        } else {
            Some(out)
        }
    }

    /// 清洗单个值
    pub fn clean(&self, input: &str) -> CleanOutcome {
        let len = input.chars().count();
        if len > self.max_chars {
            let reason = CleanError::InputTooLong {
                len,
                max: self.max_chars,
            };
            tracing::warn!(error = %reason, "文本清洗降级为基础清洗");
            return CleanOutcome::Degraded {
                value: self.basic_clean(input),
                reason,
            };
        }

        let text = if self.contains_cjk(input) {
            match self.transliterate(input) {
                Some(latin) => latin,
                None => {
                    tracing::debug!(input, "存在无法转写的汉字，保留原值");
                    input.to_string()
                }
            }
        } else {
            input.to_string()
        };

        let text = self.camel.replace_all(&text, "$1 $2");
        let text = self.upper_run.replace_all(&text, " $1");
        let text = self.number.replace_all(&text, " $1 ");
        CleanOutcome::Cleaned(self.basic_clean(&text))
    }

    /// 基础清洗: 特殊字符 -> 空格，合并空白，首字母大写
    pub fn basic_clean(&self, input: &str) -> String {
        let text = self.special.replace_all(input, " ");
        let text = self.whitespace.replace_all(&text, " ");
        title_case(text.trim())
    }
}

fn compile(pattern: &str) -> TransformResult<Regex> {
    Regex::new(pattern).map_err(|e| TransformError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// 按单个空格分词，首字母大写、其余小写
///
/// 首字母大写后变为多字符时（如 ß）保持原样
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut upper = first.to_uppercase();
                    let head = match (upper.next(), upper.next()) {
                        (Some(u), None) => u,
                        _ => first,
                    };
                    std::iter::once(head)
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect::<String>()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> TextCleaner {
        TextCleaner::new().unwrap()
    }

    #[test]
    fn test_cjk_supplier_name() {
        let out = cleaner().clean("beijingAutoParts 有限公司").into_value();
        assert_eq!(out, "Beijing Auto Parts Youxiangongsi");
        assert!(out.is_ascii());
    }

    #[test]
    fn test_camel_and_pascal_split() {
        assert_eq!(cleaner().clean("SteeringWheelCover").into_value(), "Steering Wheel Cover");
        assert_eq!(cleaner().clean("frontBumper").into_value(), "Front Bumper");
    }

    #[test]
    fn test_cyrillic_split() {
        assert_eq!(cleaner().clean("ЗаводАвто").into_value(), "Завод Авто");
    }

    #[test]
    fn test_numbers_and_specials() {
        assert_eq!(cleaner().clean("bolt_M8x25").into_value(), "Bolt M 8 X 25");
        assert_eq!(cleaner().clean("  (clip)\tholder\n").into_value(), "Clip Holder");
        assert_eq!(cleaner().clean("cap1.5mm").into_value(), "Cap 1 5 Mm");
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let c = cleaner();
        for raw in ["beijingAutoParts 有限公司", "ООО \"РусАвто\"", "seal-ring#12.5", "ßtraße"] {
            let once = c.clean(raw).into_value();
            assert_eq!(c.clean(&once).into_value(), once, "input: {}", raw);
        }
    }

    #[test]
    fn test_too_long_degrades() {
        let c = cleaner().with_max_chars(8);
        let outcome = c.clean("veryLongName_here");
        match outcome {
            CleanOutcome::Degraded { value, reason } => {
                assert_eq!(value, "Verylongname Here");
                assert_eq!(reason, CleanError::InputTooLong { len: 17, max: 8 });
            }
            other => panic!("expected degraded, got {:?}", other),
        }
    }

    #[test]
    fn test_title_case_keeps_multichar_upper() {
        assert_eq!(title_case("ßa"), "ßa");
        assert_eq!(title_case("hELLO wORLD"), "Hello World");
    }
}
