// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

// Pivots smaller than this make a linear system singular
pub const SINGULAR_EPSILON: f64 = 1e-12;

// Ray continuation policy
pub const MAX_BOUNCE_DEPTH: u32 = 700;
pub const ENERGY_THRESHOLD: f64 = 1.0 / 256.0;

// Runtime parameters
pub const PREVIEW_INTERVAL_MS: u64 = 30;
pub const OUT_DIR: &str = ".";
pub const OUT_FORMAT: &str = "png";
