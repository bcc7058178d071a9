use crate::model::Ms;

const MINUTE_MS: Ms = 60_000;
const DAY_MS: Ms = 24 * 60 * MINUTE_MS;

pub const MAX_RESOURCES: usize = 1024;
pub const MAX_LABEL_LEN: usize = 64;
pub const MAX_CLIENT_NAME_LEN: usize = 128;
pub const MAX_REASON_LEN: usize = 512;
pub const MAX_RESOURCES_PER_RESERVATION: usize = 64;
pub const MAX_INTERVALS_PER_RESOURCE: usize = 10_000;

/// 2000-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = 946_684_800_000;
/// 2100-01-01T00:00:00Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

pub const MAX_SPAN_DURATION_MS: Ms = 7 * DAY_MS;
pub const MAX_QUERY_WINDOW_MS: Ms = 31 * DAY_MS;
pub const MAX_OCCUPANCY_BUCKETS: usize = 2_000;

/// How far ahead `start_now` may pull a reservation forward.
pub const DEFAULT_START_GRACE_MS: Ms = 5 * MINUTE_MS;
