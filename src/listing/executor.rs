use tracing::error;

use crate::error::{AppError, AppResult};
use crate::filter::ListingQuery;
use crate::models::EventRow;
use crate::repository::EventRepository;

/// Страница и общий счетчик по одному и тому же предикату. Два чтения идут
/// параллельно и не образуют транзакцию.
pub async fn execute(
    events: &dyn EventRepository,
    query: &ListingQuery,
) -> AppResult<(Vec<EventRow>, i64)> {
    let result = tokio::try_join!(
        events.fetch_page(&query.predicate, query.offset, query.limit as i64),
        events.count(&query.predicate),
    );

    result.map_err(|e| {
        error!("Listing query failed: {:?}", e);
        AppError::into_query_failed(e)
    })
}
