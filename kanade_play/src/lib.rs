mod autoplay;
pub mod config;
pub mod judge;
pub mod session;
pub mod state;
pub mod timing;

pub use config::{ConfigError, KeyBindings, PlayConfig};
pub use judge::{HitWindows, Judge, Judgment, Tier, TierWindow};
pub use session::{MonotonicClock, Session, SessionError, SessionStatus, TimeSource};
pub use state::{Combo, Feedback, Ledger, PlayState, TierCounts};
pub use timing::TimingSectionTracker;
