/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Optimistic-concurrency token stored on the employee row.
pub type Version = i32;

/// Returns the id when it names a persisted row (present and positive).
///
/// Clients send `0` or omit the field for nodes that do not exist yet.
pub fn declared_id(id: Option<DbId>) -> Option<DbId> {
    id.filter(|id| *id > 0)
}
