//! Предикат публичного списка: конъюнкция условий, каждое из которых может
//! быть OR-группой. Одна и та же структура и для SQL, и для памяти, поэтому
//! выборка и подсчет всегда идут по одинаковой логике.

use chrono::NaiveDateTime;

use crate::models::EventRow;

/// Текстовые поля события, по которым ищется подстрока.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
    Organizer,
    Venue,
    Tags,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Title => "e.title",
            Field::Description => "e.description",
            Field::Organizer => "e.organizer",
            Field::Venue => "e.venue",
            Field::Tags => "e.tags",
        }
    }

    fn value<'a>(&self, row: &'a EventRow) -> &'a str {
        match self {
            Field::Title => &row.title,
            Field::Description => &row.description,
            Field::Organizer => &row.organizer,
            Field::Venue => &row.venue,
            Field::Tags => &row.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `adminApproved = true`
    Approved,
    /// Точное совпадение категории (значение уже в верхнем регистре).
    Category(String),
    /// `startDateTime >= from`
    StartsFrom(NaiveDateTime),
    /// `startDateTime < to`
    StartsBefore(NaiveDateTime),
    /// Подстрока без учета регистра.
    Contains(Field, String),
    /// OR-группа; сама группа AND-ится с остальными условиями.
    Any(Vec<Clause>),
}

impl Clause {
    pub fn matches(&self, row: &EventRow) -> bool {
        match self {
            Clause::Approved => row.admin_approved,
            Clause::Category(category) => row.category == *category,
            Clause::StartsFrom(from) => row.start_date_time >= *from,
            Clause::StartsBefore(to) => row.start_date_time < *to,
            Clause::Contains(field, needle) => field
                .value(row)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Clause::Any(group) => group.iter().any(|clause| clause.matches(row)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Базовый предикат любой публичной выдачи: только одобренные события.
    pub fn public() -> Self {
        Predicate {
            clauses: vec![Clause::Approved],
        }
    }

    pub fn and(mut self, clause: Clause) -> Self {
        match clause {
            Clause::Any(group) if group.is_empty() => {}
            Clause::Any(mut group) if group.len() == 1 => {
                if let Some(single) = group.pop() {
                    self.clauses.push(single);
                }
            }
            other => self.clauses.push(other),
        }
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, row: &EventRow) -> bool {
        self.clauses.iter().all(|clause| clause.matches(row))
    }
}
