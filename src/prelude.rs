pub use crate::builder::{CacheBuilder, CacheConfig};
pub use crate::cache::{PatternCache, Resolved};
pub use crate::ds::SlotId;
pub use crate::engine::{AutomataEngine, JitStackSize, RegexEngine};
pub use crate::entry::{EntryId, EntryState, EntryView};
pub use crate::error::{ConfigError, InvariantError, RegexpError};
pub use crate::host::{RegexpFunctions, Value};
pub use crate::pattern::{CaseMode, Pattern};
pub use crate::pin::{Lease, Pin};
pub use crate::stats::StatsSnapshot;

#[cfg(feature = "concurrency")]
pub use crate::shared::{SharedLease, SharedPatternCache};
#[cfg(feature = "metrics")]
pub use crate::metrics::CacheMetricsSnapshot;
