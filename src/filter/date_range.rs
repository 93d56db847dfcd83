//! Перевод символьного временного фильтра (`today`, `thisWeek`, ...) в
//! полуоткрытый интервал `[from, to)` по локальному времени.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeFilter {
    Anytime,
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    ThisMonth,
    NextMonth,
    Custom,
}

impl TimeFilter {
    /// Неизвестный токен - `None`, то есть без ограничения по времени.
    pub fn parse(token: &str) -> Option<TimeFilter> {
        match token.trim() {
            "anytime" => Some(TimeFilter::Anytime),
            "today" => Some(TimeFilter::Today),
            "tomorrow" => Some(TimeFilter::Tomorrow),
            "thisWeek" => Some(TimeFilter::ThisWeek),
            "nextWeek" => Some(TimeFilter::NextWeek),
            "thisMonth" => Some(TimeFilter::ThisMonth),
            "nextMonth" => Some(TimeFilter::NextMonth),
            "custom" => Some(TimeFilter::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Anytime => "anytime",
            TimeFilter::Today => "today",
            TimeFilter::Tomorrow => "tomorrow",
            TimeFilter::ThisWeek => "thisWeek",
            TimeFilter::NextWeek => "nextWeek",
            TimeFilter::ThisMonth => "thisMonth",
            TimeFilter::NextMonth => "nextMonth",
            TimeFilter::Custom => "custom",
        }
    }
}

/// Интервал по `startDateTime`. Хотя бы одна граница всегда задана.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDateTime>,
    /// Исключающая граница.
    pub to: Option<NaiveDateTime>,
}

impl DateRange {
    fn between(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange {
            from: Some(midnight(from)),
            to: Some(midnight(to)),
        }
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

// Первое число месяца, сдвинутого на `offset` вперед, с переходом через год.
fn month_start(today: NaiveDate, offset: u32) -> Option<NaiveDate> {
    let zero_based = today.month0() + offset;
    let year = today.year() + (zero_based / 12) as i32;
    first_of_month(year, zero_based % 12 + 1)
}

/// Разбирает дату из фильтра или формы. Поддерживаются `YYYY-MM-DD`,
/// `YYYY-MM-DDTHH:MM[:SS[.fff]]` и RFC 3339 (переводится в локальное время).
/// Всё, что не разобралось, считается отсутствующим.
pub fn parse_date_input(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(midnight(date));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Считает интервал для токена относительно `today` (локальная полночь).
/// `anytime`, неизвестный токен или `custom` без валидных дат дают `None`.
pub fn resolve(
    token: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    today: NaiveDate,
) -> Option<DateRange> {
    let filter = TimeFilter::parse(token?)?;
    let day = Duration::days(1);

    match filter {
        TimeFilter::Anytime => None,
        TimeFilter::Today => Some(DateRange::between(today, today + day)),
        TimeFilter::Tomorrow => Some(DateRange::between(today + day, today + day * 2)),
        TimeFilter::ThisWeek => {
            let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
            Some(DateRange::between(start, start + Duration::days(7)))
        }
        TimeFilter::NextWeek => {
            let start = today - Duration::days(today.weekday().num_days_from_sunday() as i64)
                + Duration::days(7);
            Some(DateRange::between(start, start + Duration::days(7)))
        }
        TimeFilter::ThisMonth => Some(DateRange::between(
            month_start(today, 0)?,
            month_start(today, 1)?,
        )),
        TimeFilter::NextMonth => Some(DateRange::between(
            month_start(today, 1)?,
            month_start(today, 2)?,
        )),
        TimeFilter::Custom => {
            let from = start_date.and_then(parse_date_input);
            // Конечная дата включительно: граница сдвигается на сутки вперед.
            // Непредставимая граница (конец диапазона chrono) считается отсутствующей.
            let to = end_date
                .and_then(parse_date_input)
                .and_then(|end| end.checked_add_signed(day));
            if from.is_none() && to.is_none() {
                None
            } else {
                Some(DateRange { from, to })
            }
        }
    }
}
