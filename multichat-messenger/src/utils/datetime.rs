//! 日期过滤参数解析
//!
//! 工具参数中的日期均为 RFC 3339 字符串，解析失败时返回带字段名的 `InvalidDate`。

use chrono::{DateTime, Utc};

use crate::error::{MessengerError, Result};

/// 解析单个 RFC 3339 日期字段
pub fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MessengerError::InvalidDate {
            field: field.to_string(),
            detail: e.to_string(),
        })
}

/// 解析可选日期字段，空字符串视为未提供
pub fn parse_optional_rfc3339(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_rfc3339(field, v).map(Some),
        _ => Ok(None),
    }
}
