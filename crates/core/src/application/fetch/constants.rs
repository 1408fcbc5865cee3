// Fetch constants (no magic values)

/// Concurrent record workers per source (independent of listing count)
pub const MAX_FETCH_WORKERS: usize = 8;
