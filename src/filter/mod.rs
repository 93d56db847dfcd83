//! Фильтрация публичного списка: временные интервалы, теги, сборка предиката.

pub mod date_range;
pub mod predicate;
pub mod request;
pub mod tags;

pub use date_range::{DateRange, TimeFilter};
pub use predicate::{Clause, Field, Predicate};
pub use request::{search_predicate, FilterParams, FilterRequest, ListingQuery, NumberInput};
pub use tags::TagsInput;
