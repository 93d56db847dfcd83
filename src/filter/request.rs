use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date_range;
use super::predicate::{Clause, Field, Predicate};
use super::tags::TagsInput;
use crate::config::ListingConfig;

/// Страница и размер страницы приходят и числом (JSON), и строкой (query).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Int(i64),
    Text(String),
}

impl NumberInput {
    pub fn value(&self) -> Option<i64> {
        match self {
            NumberInput::Int(n) => Some(*n),
            NumberInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Сырые параметры фильтра - одинаковые для GET (query) и POST (JSON).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub category: Option<String>,
    pub tags: Option<TagsInput>,
    pub time_filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub page: Option<NumberInput>,
    pub limit: Option<NumberInput>,
}

impl FilterParams {
    /// Собирает параметры из пар query-строки. Повторяющийся `tags` становится
    /// списком, одиночный - строкой (JSON или через запятую).
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = FilterParams::default();
        let mut tags: Vec<String> = Vec::new();

        for (key, value) in pairs {
            let value = value.clone();
            match key.as_str() {
                "category" => params.category = Some(value),
                "tags" | "tags[]" => tags.push(value),
                "timeFilter" => params.time_filter = Some(value),
                "startDate" => params.start_date = Some(value),
                "endDate" => params.end_date = Some(value),
                "location" => params.location = Some(value),
                "search" => params.search = Some(value),
                "page" => params.page = Some(NumberInput::Text(value)),
                "limit" => params.limit = Some(NumberInput::Text(value)),
                _ => {}
            }
        }

        params.tags = match tags.len() {
            0 => None,
            1 => tags.pop().map(TagsInput::Text),
            _ => Some(TagsInput::List(tags)),
        };
        params
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Нормализованный запрос фильтра. Некорректные необязательные поля
/// превращаются в "без ограничения", а не в ошибку.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub time_filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl FilterRequest {
    pub fn from_params(params: &FilterParams, listing: &ListingConfig) -> Self {
        let category = non_blank(&params.category)
            .filter(|c| !c.eq_ignore_ascii_case("anything"))
            .map(|c| c.to_uppercase());
        let location = non_blank(&params.location).filter(|l| !l.eq_ignore_ascii_case("anywhere"));

        let page = params
            .page
            .as_ref()
            .and_then(NumberInput::value)
            .unwrap_or(1)
            .clamp(1, u32::MAX as i64) as u32;
        let limit = params
            .limit
            .as_ref()
            .and_then(NumberInput::value)
            .unwrap_or(listing.default_page_size as i64)
            .clamp(1, listing.max_page_size.max(1) as i64) as u32;

        FilterRequest {
            category,
            tags: params.tags.as_ref().map(TagsInput::normalize).unwrap_or_default(),
            time_filter: non_blank(&params.time_filter),
            start_date: non_blank(&params.start_date),
            end_date: non_blank(&params.end_date),
            location,
            search: non_blank(&params.search),
            page,
            limit,
        }
    }

    /// Строит предикат и окно пагинации. `today` - локальная полночь вызывающего.
    pub fn build(&self, today: NaiveDate) -> ListingQuery {
        let mut predicate = Predicate::public();

        if let Some(category) = &self.category {
            predicate = predicate.and(Clause::Category(category.clone()));
        }

        if let Some(range) = date_range::resolve(
            self.time_filter.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            today,
        ) {
            if let Some(from) = range.from {
                predicate = predicate.and(Clause::StartsFrom(from));
            }
            if let Some(to) = range.to {
                predicate = predicate.and(Clause::StartsBefore(to));
            }
        }

        if let Some(location) = &self.location {
            predicate = predicate.and(Clause::Contains(Field::Venue, location.clone()));
        }

        predicate = predicate.and(Clause::Any(
            self.tags
                .iter()
                .map(|tag| Clause::Contains(Field::Tags, tag.clone()))
                .collect(),
        ));

        if let Some(search) = &self.search {
            predicate = predicate.and(Clause::Any(
                [Field::Title, Field::Description, Field::Organizer, Field::Venue]
                    .into_iter()
                    .map(|field| Clause::Contains(field, search.clone()))
                    .collect(),
            ));
        }

        ListingQuery::new(predicate, self.page, self.limit)
    }
}

/// Предикат плюс окно: `offset = (page - 1) * limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub predicate: Predicate,
    pub page: u32,
    pub limit: u32,
    pub offset: i64,
}

impl ListingQuery {
    pub fn new(predicate: Predicate, page: u32, limit: u32) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        ListingQuery {
            predicate,
            page,
            limit,
            offset: (page as i64 - 1) * limit as i64,
        }
    }
}

/// Предикат легкого поиска `/search`: подстрока по названию, организатору,
/// описанию, площадке и тегам среди одобренных событий.
pub fn search_predicate(term: &str) -> Predicate {
    Predicate::public().and(Clause::Any(
        [Field::Title, Field::Organizer, Field::Description, Field::Venue, Field::Tags]
            .into_iter()
            .map(|field| Clause::Contains(field, term.trim().to_string()))
            .collect(),
    ))
}
