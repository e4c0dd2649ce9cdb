/// Upper bound for a single usage quantity (inclusive)
pub const MAX_DIMENSION_QUANTITY: u64 = 10_000_000_000;

/// Maximum number of items accepted by a batch estimate
pub const MAX_BATCH_SIZE: usize = 100;

/// Fractional digits kept on every finalized cost
pub const COST_SCALE: u32 = 6;

/// Most fractional digits a rate may carry, so `quantity x rate / 1M` stays exact
pub const MAX_RATE_SCALE: u32 = 12;

/// Registry metadata schema version this build understands
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Requested pricing version that always means "the loaded snapshot"
pub const LATEST_VERSION: &str = "latest";

/// Version string stamped on every estimate
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
