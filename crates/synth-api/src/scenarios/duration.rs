//! 时长解析
//!
//! 场景文件与查询参数中的延迟既可以写成 `"250ms"`、`"1m30s"` 这样的带单位字符串，
//! 也可以写成不带单位的整数（按毫秒解释）。

use std::time::Duration;

use thiserror::Error;

/// 时长解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("时长不能为空")]
    Empty,

    #[error("无法解析的时长 `{0}`，示例: \"100ms\", \"2s\", \"1m30s\" 或整数毫秒")]
    Invalid(String),

    #[error("时长 `{input}` 缺少单位")]
    MissingUnit { input: String },

    #[error("时长 `{input}` 包含未知单位 `{unit}`，可用单位: ns, us, µs, ms, s, m, h")]
    UnknownUnit { input: String, unit: String },

    #[error("时长 `{0}` 超出可表示范围")]
    Overflow(String),
}

/// 解析时长字符串
///
/// 纯数字按毫秒解释；否则由一个或多个 `<数字><单位>` 片段组成，数字可带小数。
/// 负数不被接受。
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        let ms: u64 = s
            .parse()
            .map_err(|_| DurationError::Overflow(s.to_string()))?;
        return Ok(Duration::from_millis(ms));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return Err(DurationError::Invalid(s.to_string()));
        }
        let (number, tail) = rest.split_at(num_end);

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        let value: f64 = number
            .parse()
            .map_err(|_| DurationError::Invalid(s.to_string()))?;

        let nanos_per_unit: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            "" => {
                return Err(DurationError::MissingUnit {
                    input: s.to_string(),
                });
            }
            other => {
                return Err(DurationError::UnknownUnit {
                    input: s.to_string(),
                    unit: other.to_string(),
                });
            }
        };

        let nanos = value * nanos_per_unit;
        if !nanos.is_finite() || nanos > u64::MAX as f64 {
            return Err(DurationError::Overflow(s.to_string()));
        }

        total = total
            .checked_add(Duration::from_nanos(nanos.round() as u64))
            .ok_or_else(|| DurationError::Overflow(s.to_string()))?;
        rest = next;
    }

    Ok(total)
}

/// 解析 JSON 中的时长值（字符串或非负整数毫秒）
pub fn parse_duration_value(value: &serde_json::Value) -> Result<Duration, DurationError> {
    match value {
        serde_json::Value::String(s) => parse_duration(s),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(Duration::from_millis)
            .ok_or_else(|| DurationError::Invalid(n.to_string())),
        other => Err(DurationError::Invalid(other.to_string())),
    }
}

/// 宽松解析查询参数中的延迟
///
/// 与 [`parse_duration`] 相同，但额外接受负整数毫秒：负延迟按原样视为无需等待，
/// 因此映射为零时长。
pub fn parse_query_delay(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if let Some(digits) = s.strip_prefix('-')
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Ok(Duration::ZERO);
    }
    parse_duration(s)
}

/// 以毫秒表示时长（用于日志与列表展示）
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
