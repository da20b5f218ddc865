use chrono::{DateTime, Utc};

use crate::error::{ApiError, SchedulerError};

pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedulerError> {
    if end > start {
        Ok(())
    } else {
        Err(SchedulerError::invalid_argument(
            "end time must be after start time",
        ))
    }
}

pub fn validate_capacity(value: u32) -> Result<u32, SchedulerError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(SchedulerError::invalid_argument(
            "max capacity must be a positive integer",
        ))
    }
}

pub fn validate_room(room: &str) -> Result<String, SchedulerError> {
    let trimmed = room.trim();
    if trimmed.is_empty() {
        Err(SchedulerError::invalid_argument("room is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn validate_days(value: u8) -> Result<u8, ApiError> {
    if (1..=31).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest("days must be between 1 and 31".into()))
    }
}
