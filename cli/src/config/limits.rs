/// Hard limits for bulk runs against the record service

/// Largest request group the service accepts in one multi-operation call
pub const MAX_BATCH_SIZE: usize = 1000;

/// Concurrent requests the service allows per user
pub const MAX_CONCURRENT_SESSIONS: usize = 52;

/// Upper bound for attempts per batch
pub const MAX_ATTEMPTS: u32 = 20;

/// Fastest useful refresh of the live progress line
pub const MIN_REFRESH_INTERVAL_MS: u64 = 20;

/// Largest trailing window of failure diagnostics kept for display
pub const MAX_FAILURE_WINDOW: usize = 100;
