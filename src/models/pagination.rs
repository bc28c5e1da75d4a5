//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationParams {
    /// 页码最小为 1，每页数量限制在 1..=100
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn get_offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    pub fn get_limit(&self) -> u64 {
        self.page_size as u64
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, params: PaginationParams, total: i64) -> Self {
        let page_size = params.page_size as i64;
        let total_pages = (total + page_size - 1) / page_size;
        Self {
            data,
            page: params.page as i64,
            page_size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let p = PaginationParams::new(None, None);
        assert_eq!((p.page, p.page_size), (1, 20));
        assert_eq!(p.get_offset(), 0);

        let p = PaginationParams::new(Some(0), Some(1000));
        assert_eq!((p.page, p.page_size), (1, 100));

        let p = PaginationParams::new(Some(3), Some(10));
        assert_eq!(p.get_offset(), 20);
        assert_eq!(p.get_limit(), 10);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let params = PaginationParams::new(Some(1), Some(20));
        let page = PaginatedResponse::new(vec![1, 2, 3], params, 41);
        assert_eq!(page.total_pages, 3);

        let empty: PaginatedResponse<i32> = PaginatedResponse::new(vec![], params, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
