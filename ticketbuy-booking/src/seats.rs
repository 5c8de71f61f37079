//! Seat-code normalization and the conflict check run before every write.

use std::collections::HashSet;

use crate::error::{BookingError, BookingResult};

const MAX_SEAT_CODE_LEN: usize = 8;

pub fn normalize_seat(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_SEAT_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

/// Drops blank entries and normalizes the rest, keeping request order.
/// Rejects malformed codes, duplicates and an empty result.
pub fn normalize_seat_list(raw: &[String]) -> BookingResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut seats = Vec::with_capacity(raw.len());

    for entry in raw {
        let code = normalize_seat(entry);
        if code.is_empty() {
            continue;
        }
        if !is_valid_code(&code) {
            return Err(BookingError::Validation(format!("Invalid seat code: {}", entry.trim())));
        }
        if !seen.insert(code.clone()) {
            return Err(BookingError::Validation(format!("Seat {} is listed more than once", code)));
        }
        seats.push(code);
    }

    if seats.is_empty() {
        return Err(BookingError::Validation("Please select at least one seat".to_string()));
    }
    Ok(seats)
}

pub fn ensure_quantity(seats: &[String], seat_quantity: i32) -> BookingResult<()> {
    if seats.len() as i64 != seat_quantity as i64 {
        return Err(BookingError::Validation(format!(
            "Selected {} seats but seat_quantity is {}",
            seats.len(),
            seat_quantity
        )));
    }
    Ok(())
}

/// Requested seats already present in `occupied`, in request order.
pub fn find_conflicts<I, S>(occupied: I, requested: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let taken: HashSet<String> = occupied.into_iter().map(|s| normalize_seat(s.as_ref())).collect();
    requested
        .iter()
        .map(|s| normalize_seat(s))
        .filter(|s| taken.contains(s))
        .collect()
}
