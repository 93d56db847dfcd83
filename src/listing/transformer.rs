use serde::{Deserialize, Serialize};

use crate::models::{EventRow, EventView};

/// Блок пагинации ответа списка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: i64,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub offset: i64,
}

impl Pagination {
    pub fn compute(page: u32, limit: u32, total_count: i64) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total_count = total_count.max(0);
        let total_pages = u32::try_from((total_count + limit as i64 - 1) / limit as i64).unwrap_or(u32::MAX);

        Pagination {
            current_page: page,
            total_pages,
            total_count,
            limit,
            has_next_page: page < total_pages,
            has_prev_page: page > 1 && total_count > 0,
            offset: (page as i64 - 1) * limit as i64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub events: Vec<EventView>,
    pub pagination: Pagination,
}

pub fn transform(rows: Vec<EventRow>, page: u32, limit: u32, total_count: i64) -> ListingPage {
    ListingPage {
        events: rows.into_iter().map(EventView::from).collect(),
        pagination: Pagination::compute(page, limit, total_count),
    }
}
