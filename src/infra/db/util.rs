use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::application::repos::RepoError;

const UNIQUE_PREFIX: &str = "UNIQUE constraint failed: ";

/// Fixed-width RFC 3339 in UTC, so text order equals time order.
const STORED_TIMESTAMP: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Encode a timestamp for a `TEXT` column that is sorted or compared in SQL.
pub fn stored_timestamp(value: OffsetDateTime) -> Result<String, RepoError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(STORED_TIMESTAMP)
        .map_err(RepoError::from_persistence)
}

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) if db.message().starts_with(UNIQUE_PREFIX) => {
            RepoError::Duplicate {
                constraint: db.message()[UNIQUE_PREFIX.len()..].to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("FOREIGN KEY constraint failed") => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("constraint failed") => {
            RepoError::Integrity {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("database is locked")
                || db.message().contains("database is busy") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn whole_seconds_keep_a_full_fraction() {
        let encoded = stored_timestamp(datetime!(2025-01-01 12:00:00 UTC)).expect("format");
        assert_eq!(encoded, "2025-01-01T12:00:00.000000000Z");
    }

    #[test]
    fn text_order_follows_time_order() {
        let earlier = stored_timestamp(datetime!(2025-01-01 12:00:00 UTC)).expect("format");
        let later = stored_timestamp(datetime!(2025-01-01 12:00:00.5 UTC)).expect("format");
        assert!(earlier < later);
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let encoded = stored_timestamp(datetime!(2025-01-01 14:00:00 +2)).expect("format");
        assert_eq!(encoded, "2025-01-01T12:00:00.000000000Z");
    }
}
