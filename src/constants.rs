//! Global constants for the boxmark client

/// Default API root; endpoint paths are joined onto it.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/api/";

/// Images requested per batch fetch
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Queue length below which a background replenish starts
pub const DEFAULT_LOW_WATER_MARK: usize = 5;

/// Maximum retained processed-image history entries
pub const DEFAULT_PROCESSED_HISTORY: usize = 50;

/// Maximum retained undo snapshots per image
pub const DEFAULT_UNDO_HISTORY: usize = 100;

/// How long a notification stays visible, in seconds
pub const NOTIFICATION_TTL_SECS: u64 = 5;

/// Default canvas size used by the native binary before a host reports one
pub const DEFAULT_CONTAINER_SIZE: (f64, f64) = (1280.0, 800.0);
