//! 游标编解码
//!
//! 游标是 `v1:{start}:{size}` 的 URL 安全 base64（无填充），可无损还原起始位置与页大小。

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const CURSOR_VERSION: &str = "v1";

/// 编码续传位置
pub fn encode(start: u64, size: u64) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}:{}", CURSOR_VERSION, start, size))
}

/// 解码游标，格式不合法时返回 None
pub fn decode(cursor: &str) -> Option<(u64, u64)> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor.trim()).ok()?;
    let text = String::from_utf8(bytes).ok()?;

    let mut parts = text.split(':');
    if parts.next()? != CURSOR_VERSION {
        return None;
    }
    let start = parts.next()?.parse().ok()?;
    let size = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((start, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_is_lossless() {
        for (start, size) in [(0, 1), (100, 100), (999_900, 1000), (u64::MAX, 7)] {
            assert_eq!(decode(&encode(start, size)), Some((start, size)));
        }
    }

    #[test]
    fn test_cursor_is_url_safe() {
        let cursor = encode(123_456, 250);
        assert!(
            cursor
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        );
    }

    #[test]
    fn test_garbage_cursor() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("!!!"), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("v2:1:2")), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("v1:abc:2")), None);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("v1:1:2:3")), None);
    }
}
