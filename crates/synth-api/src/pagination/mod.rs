//! 分页解析
//!
//! 三种寻址方式（offset/limit、page/size、cursor）统一归一化为
//! `(起始位置, 页大小)`，再按 `total` 上限截取记录区间并生成续传元数据。

pub mod cursor;

use serde::Serialize;

use crate::generators::{RecordGenerator, SyntheticRecord};

/// 寻址方式
///
/// 参数保留原始值，越界或缺失在 [`resolve`] 中统一处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    Offset {
        offset: Option<i64>,
        limit: Option<i64>,
    },
    Page {
        page: Option<i64>,
        size: Option<i64>,
    },
    Cursor(Option<String>),
}

impl Addressing {
    /// 指标标签
    pub fn style(&self) -> &'static str {
        match self {
            Self::Offset { .. } => "offset",
            Self::Page { .. } => "page",
            Self::Cursor(_) => "cursor",
        }
    }
}

impl Default for Addressing {
    fn default() -> Self {
        Self::Offset {
            offset: None,
            limit: None,
        }
    }
}

/// 页大小限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub max_page_size: u64,
    pub default_page_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            default_page_size: 100,
        }
    }
}

impl PageLimits {
    fn size_or_default(&self, requested: Option<i64>) -> u64 {
        match requested {
            Some(size) if size >= 1 && size as u64 <= self.max_page_size => size as u64,
            _ => self.default_page_size,
        }
    }
}

/// 归一化后的记录区间：记录序号为 `start + 1 ..= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: u64,
    pub size: u64,
    pub end: u64,
    pub total: u64,
}

impl PageWindow {
    pub fn has_more(&self) -> bool {
        self.end < self.total
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 区间内第一条记录的序号（用于页级延迟）
    pub fn first_index(&self) -> u64 {
        self.start.saturating_add(1)
    }
}

/// 分页元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub total_count: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// 分页响应体
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub result: Vec<SyntheticRecord>,
    pub metadata: PageMetadata,
}

/// 计算记录区间与续传元数据
///
/// 起始位置超出 `total` 时返回空区间，不视为错误。
pub fn resolve(addressing: &Addressing, total: u64, limits: &PageLimits) -> (PageWindow, PageMetadata) {
    let (start, size) = match addressing {
        Addressing::Offset { offset, limit } => {
            let start = offset.unwrap_or(0).max(0) as u64;
            (start, limits.size_or_default(*limit))
        }
        Addressing::Page { page, size } => {
            let size = limits.size_or_default(*size);
            let page = page.unwrap_or(1).max(1) as u64;
            ((page - 1).saturating_mul(size), size)
        }
        Addressing::Cursor(token) => match token.as_deref().and_then(cursor::decode) {
            Some((start, size)) => {
                let size = i64::try_from(size).ok();
                (start, limits.size_or_default(size))
            }
            None => (0, limits.default_page_size),
        },
    };

    let end = if start >= total {
        start
    } else {
        start.saturating_add(size).min(total)
    };
    let window = PageWindow {
        start,
        size,
        end,
        total,
    };
    let has_more = window.has_more();

    let mut metadata = PageMetadata {
        total_count: total,
        has_more,
        ..Default::default()
    };
    match addressing {
        Addressing::Offset { .. } => {
            metadata.limit = Some(size);
            metadata.offset = Some(start);
            metadata.next_offset = has_more.then_some(end);
        }
        Addressing::Page { page, .. } => {
            let page = page.unwrap_or(1).max(1) as u64;
            metadata.page = Some(page);
            metadata.size = Some(size);
            metadata.next_page = has_more.then(|| page.saturating_add(1));
        }
        Addressing::Cursor(_) => {
            metadata.next_cursor = has_more.then(|| cursor::encode(end, size));
        }
    }

    (window, metadata)
}

/// 生成区间内的记录
pub fn build_page(window: &PageWindow, metadata: PageMetadata, generator: &RecordGenerator) -> Page {
    let result = if window.is_empty() {
        Vec::new()
    } else {
        (window.start + 1..=window.end)
            .map(|index| generator.generate(index))
            .collect()
    };
    Page { result, metadata }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(offset: i64, limit: i64) -> Addressing {
        Addressing::Offset {
            offset: Some(offset),
            limit: Some(limit),
        }
    }

    fn page(page: i64, size: i64) -> Addressing {
        Addressing::Page {
            page: Some(page),
            size: Some(size),
        }
    }

    fn ids(page: &Page) -> Vec<u64> {
        page.result.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_last_partial_page() {
        let (window, metadata) = resolve(&offset(100, 100), 150, &PageLimits::default());
        let page = build_page(&window, metadata, &RecordGenerator::default());

        assert_eq!(page.result.len(), 50);
        assert_eq!(page.result[0].id, 101);
        assert_eq!(page.result[49].id, 150);
        assert!(!page.metadata.has_more);
        assert_eq!(page.metadata.next_offset, None);

        let json = serde_json::to_value(&page.metadata).unwrap();
        assert!(json.get("next_offset").is_none());
        assert_eq!(json["limit"], 100);
        assert_eq!(json["offset"], 100);
    }

    #[test]
    fn test_start_beyond_total_is_empty() {
        let (window, metadata) = resolve(&offset(200, 100), 100, &PageLimits::default());
        assert!(window.is_empty());
        assert!(!metadata.has_more);
        let page = build_page(&window, metadata, &RecordGenerator::default());
        assert!(page.result.is_empty());
    }

    #[test]
    fn test_offset_and_page_styles_agree() {
        let limits = PageLimits::default();
        let generator = RecordGenerator::default();

        let (w1, m1) = resolve(&offset(100, 100), 1000, &limits);
        let (w2, m2) = resolve(&page(2, 100), 1000, &limits);
        assert_eq!(w1, w2);

        let by_offset = build_page(&w1, m1, &generator);
        let by_page = build_page(&w2, m2, &generator);
        assert_eq!(ids(&by_offset), (101..=200).collect::<Vec<_>>());
        assert_eq!(ids(&by_offset), ids(&by_page));
        assert_eq!(by_offset.metadata.next_offset, Some(200));
        assert_eq!(by_page.metadata.next_page, Some(3));
    }

    #[test]
    fn test_invalid_sizes_fall_back_to_default() {
        let limits = PageLimits::default();
        for bad in [0, -5, 1001] {
            let (window, _) = resolve(&offset(0, bad), 10_000, &limits);
            assert_eq!(window.size, 100);
            let (window, _) = resolve(&page(1, bad), 10_000, &limits);
            assert_eq!(window.size, 100);
        }
        let (window, _) = resolve(&offset(0, 1000), 10_000, &limits);
        assert_eq!(window.size, 1000);
    }

    #[test]
    fn test_negative_offset_and_page_are_clamped() {
        let limits = PageLimits::default();
        let (window, metadata) = resolve(&offset(-10, 10), 100, &limits);
        assert_eq!(window.start, 0);
        assert_eq!(metadata.offset, Some(0));

        let (window, metadata) = resolve(&page(0, 10), 100, &limits);
        assert_eq!(window.start, 0);
        assert_eq!(metadata.page, Some(1));
    }

    #[test]
    fn test_missing_parameters_use_defaults() {
        let (window, metadata) = resolve(&Addressing::default(), 500, &PageLimits::default());
        assert_eq!((window.start, window.end), (0, 100));
        assert_eq!(metadata.next_offset, Some(100));
    }

    #[test]
    fn test_cursor_walk_covers_everything_once() {
        let limits = PageLimits::default();
        let generator = RecordGenerator::default();
        let mut token: Option<String> = None;
        let mut seen = Vec::new();

        loop {
            let (window, metadata) = resolve(&Addressing::Cursor(token.clone()), 250, &limits);
            let page = build_page(&window, metadata, &generator);
            seen.extend(ids(&page));
            match page.metadata.next_cursor {
                Some(next) => token = Some(next),
                None => {
                    assert!(!page.metadata.has_more);
                    break;
                }
            }
        }

        assert_eq!(seen, (1..=250).collect::<Vec<_>>());
    }

    #[test]
    fn test_cursor_metadata_shape() {
        let (_, metadata) = resolve(&Addressing::Cursor(None), 150, &PageLimits::default());
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["total_count"], 150);
        assert_eq!(json["has_more"], true);
        assert!(json.get("next_cursor").is_some());
        assert!(json.get("offset").is_none());
        assert!(json.get("page").is_none());

        let next = metadata.next_cursor.unwrap();
        assert_eq!(cursor::decode(&next), Some((100, 100)));
    }

    #[test]
    fn test_garbage_cursor_starts_over() {
        let (window, _) = resolve(
            &Addressing::Cursor(Some("definitely-not-a-cursor".into())),
            500,
            &PageLimits::default(),
        );
        assert_eq!((window.start, window.size), (0, 100));
    }

    #[test]
    fn test_page_overflow_saturates() {
        let (window, metadata) = resolve(&page(i64::MAX, 1000), 100, &PageLimits::default());
        assert!(window.is_empty());
        assert!(!metadata.has_more);
    }
}
