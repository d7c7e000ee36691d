//! `numdown` is the language core of a notebook calculator: each line
//! of a free-form document is independently parsed and evaluated as an
//! expression, an assignment, a heading, or plain text.
//!
//! The language's distinguishing feature is unit-aware arithmetic:
//! every number may carry a physical unit, units compose into derived
//! units, and dimensional compatibility is enforced through
//! arithmetic, comparison and conversion. Calendar and timezone-aware
//! date/time values, composite magnitudes (`5 ft 3 in`), multiple
//! numeric presentations, and rate-table-driven currency conversion
//! round out the value model.
//!
//! The grammar is intentionally ambiguous; a line parses into a whole
//! candidate set, and the pipeline trial-evaluates the candidates so
//! only readings that evaluate without error compete for selection.
//!
//! ```
//! use numdown::Session;
//!
//! let mut session = Session::new();
//! let result = session.evaluate_document("x = 10 m\nx + 20 cm");
//! assert_eq!(result.errors.len(), 0);
//! ```
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]
#![allow(
    clippy::module_name_repetitions,
    clippy::redundant_pub_crate,
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]

pub mod datetime;
pub mod error;
pub mod eval;
pub mod pipeline;
pub mod settings;
pub mod syntax;
pub mod tz;
pub mod units;

#[doc(inline)]
pub use error::{CalcError, ErrorKind};

/// The crate's result type.
pub type CalcResult<T> = Result<T, CalcError>;

pub use datetime::{
    Duration, Instant, PlainDate, PlainDateTime, PlainTime, ZonedDateTime,
};
pub use eval::{EvaluationContext, Format, Value};
pub use pipeline::{DocumentResult, LineError, Session};
pub use settings::{AngleUnit, Settings, UnitVariant};
pub use tz::{TimeZone, TimeZoneProvider, TimezoneTable};
pub use units::UnitRegistry;

// Relevant numeric constants.
/// Milliseconds per day constant: 8.64e+7
pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
/// Milliseconds per hour constant: 3.6e+6
pub const MS_PER_HOUR: i64 = 60 * 60 * 1000;
