//! The calendar and duration engine.
//!
//! Five point-in-time shapes — [`PlainDate`], [`PlainTime`],
//! [`PlainDateTime`], [`Instant`], [`ZonedDateTime`] — plus a signed
//! component [`Duration`]. Calendar arithmetic is *constrained*: adding
//! months or years clamps the day-of-month to the last valid day of the
//! target month, never rolling over.

pub mod date;
pub mod datetime;
pub mod duration;
pub mod instant;
pub mod now;
pub mod time;
pub(crate) mod util;
pub mod zoneddatetime;

pub use date::PlainDate;
pub use datetime::PlainDateTime;
pub use time::PlainTime;
pub use duration::Duration;
pub use instant::Instant;
pub use now::{Clock, FixedClock, SystemClock};
pub use zoneddatetime::ZonedDateTime;
