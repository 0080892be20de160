mod resolver;

pub use resolver::{FeeResolver, FeeSource, HARD_FALLBACK_FEE_PERCENT, ResolvedFee};
