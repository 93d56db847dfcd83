use serde::{Deserialize, Serialize};

/// Текущий выбор фильтров на стороне клиента.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub category: String,
    pub tags: Vec<String>,
    pub time_filter: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub search: String,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            category: "anything".to_string(),
            tags: Vec::new(),
            time_filter: "anytime".to_string(),
            start_date: String::new(),
            end_date: String::new(),
            location: String::new(),
            search: String::new(),
        }
    }
}

/// Изменение одного поля фильтра.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Category(String),
    Tags(Vec<String>),
    TimeFilter(String),
    StartDate(String),
    EndDate(String),
    Location(String),
    Search(String),
}

impl FilterState {
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Category(v) => self.category = v,
            FilterUpdate::Tags(v) => self.tags = v,
            FilterUpdate::TimeFilter(v) => self.time_filter = v,
            FilterUpdate::StartDate(v) => self.start_date = v,
            FilterUpdate::EndDate(v) => self.end_date = v,
            FilterUpdate::Location(v) => self.location = v,
            FilterUpdate::Search(v) => self.search = v,
        }
    }

    /// Сколько фильтров отличается от значений по умолчанию.
    pub fn active_count(&self) -> usize {
        [
            !self.category.is_empty() && !self.category.eq_ignore_ascii_case("anything"),
            !self.tags.is_empty(),
            !self.time_filter.is_empty() && self.time_filter != "anytime",
            !self.location.trim().is_empty(),
            !self.search.trim().is_empty(),
            !self.start_date.is_empty(),
            !self.end_date.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Query-строка для `GET /api/events`. Значения по умолчанию опускаются,
    /// теги уходят одной JSON-строкой.
    pub fn to_query(&self, page: u32, limit: u32) -> String {
        let mut pairs: Vec<(&str, String)> = vec![("page", page.to_string()), ("limit", limit.to_string())];

        if !self.category.is_empty() && !self.category.eq_ignore_ascii_case("anything") {
            pairs.push(("category", self.category.clone()));
        }
        if !self.tags.is_empty() {
            // Vec<String> в JSON не может не сериализоваться
            let tags = serde_json::to_string(&self.tags).unwrap_or_default();
            pairs.push(("tags", tags));
        }
        if !self.time_filter.is_empty() && self.time_filter != "anytime" {
            pairs.push(("timeFilter", self.time_filter.clone()));
        }
        for (key, value) in [
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
            ("location", &self.location),
            ("search", &self.search),
        ] {
            if !value.is_empty() {
                pairs.push((key, value.clone()));
            }
        }

        serde_urlencoded::to_string(&pairs).unwrap_or_default()
    }
}
