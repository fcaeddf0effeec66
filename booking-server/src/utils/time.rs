//! 时间格式约定
//!
//! 全系统时间戳统一为 RFC3339 UTC 毫秒格式（JS toISOString 同款），
//! 字典序即时间序，数据库里直接按字符串比较。

use chrono::{SecondsFormat, Utc};

/// Current instant, `2024-01-01T09:00:00.000Z` style
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso_shape() {
        let now = now_iso();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2024-01-01T09:00:00.000Z".len());
    }
}
