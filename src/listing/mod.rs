//! Публичный список событий: выполнение предиката и сборка ответа с пагинацией.

pub mod executor;
pub mod transformer;

pub use transformer::{ListingPage, Pagination};

use crate::error::AppResult;
use crate::filter::ListingQuery;
use crate::repository::EventRepository;

pub async fn fetch(events: &dyn EventRepository, query: &ListingQuery) -> AppResult<ListingPage> {
    let (rows, total_count) = executor::execute(events, query).await?;
    Ok(transformer::transform(rows, query.page, query.limit, total_count))
}
