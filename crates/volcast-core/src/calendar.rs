//! Weekday-only business calendar. Holidays are not modelled.

use time::{Date, Weekday};

pub fn is_business_day(date: Date) -> bool {
    !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// The `count` business days strictly after `anchor`, ascending.
pub fn business_days_after(anchor: Date, count: usize) -> Vec<Date> {
    let mut days = Vec::with_capacity(count);
    let mut cursor = anchor;
    while days.len() < count {
        match cursor.next_day() {
            Some(next) => cursor = next,
            None => break,
        }
        if is_business_day(cursor) {
            days.push(cursor);
        }
    }
    days
}
