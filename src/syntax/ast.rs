//! The expression AST the parser produces.
//!
//! Unit references are resolved during parsing against the registry,
//! with one exception: currency units are kept symbolic so their
//! conversion factor is re-derived from the live rate table at
//! evaluation time (parse results may be cached across rate swaps).

use std::sync::Arc;

use crate::datetime::{Instant, PlainDate, PlainDateTime, PlainTime};
use crate::error::CalcError;
use crate::eval::Format;
use crate::units::{Unit, UnitRegistry};
use crate::CalcResult;

/// A unit occurrence in source.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitRef {
    /// A registry unit; immutable for the life of the process.
    Fixed(Arc<Unit>),
    /// A currency, synthesised at evaluation time from the current
    /// rate table.
    Currency(Box<str>),
}

impl UnitRef {
    pub fn resolve(&self, registry: &UnitRegistry) -> CalcResult<Arc<Unit>> {
        match self {
            Self::Fixed(unit) => Ok(unit.clone()),
            Self::Currency(code) => registry.lookup_currency(code).ok_or_else(|| {
                CalcError::conversion()
                    .with_message(format!("no exchange rate loaded for {code}"))
            }),
        }
    }

    /// The dimension id, readable without rate data.
    #[must_use]
    pub fn dimension_id(&self) -> &str {
        match self {
            Self::Fixed(unit) => &unit.dimension.id,
            Self::Currency(_) => "currency",
        }
    }
}

/// A simple or derived unit expression: `(unit, exponent)` terms.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitExpr {
    pub terms: Vec<(UnitRef, i32)>,
}

impl UnitExpr {
    #[must_use]
    pub fn simple(unit: UnitRef) -> Self {
        Self {
            terms: vec![(unit, 1)],
        }
    }

    /// Whether this is a single unit at exponent one.
    #[must_use]
    pub fn as_simple(&self) -> Option<&UnitRef> {
        match self.terms.as_slice() {
            [(unit, 1)] => Some(unit),
            _ => None,
        }
    }
}

/// Built-in constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    Tau,
    E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Mod,
    Pow,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

/// Date/time properties extractable through the conversion operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateProperty {
    Year,
    Month,
    Day,
    Weekday,
    DayOfYear,
    WeekOfYear,
    Hour,
    Minute,
    Second,
    Millisecond,
    Offset,
}

impl DateProperty {
    /// Property spelled by a word, if any.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "weekday" => Some(Self::Weekday),
            "dayOfYear" => Some(Self::DayOfYear),
            "weekOfYear" => Some(Self::WeekOfYear),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            "second" => Some(Self::Second),
            "millisecond" => Some(Self::Millisecond),
            "offset" => Some(Self::Offset),
            _ => None,
        }
    }
}

/// The target of a conversion expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertTarget {
    /// A unit or derived-unit expression.
    Unit(UnitExpr),
    /// An ordered list of same-dimension units (`ft in`).
    Composite(Vec<UnitRef>),
    /// A timezone (`now in Tokyo`).
    Timezone(Box<str>),
    /// A date/time property (`to weekday`).
    Property(DateProperty),
    /// A presentation directive (`to hex`, `to 2 decimals`).
    Presentation(Format),
}

/// Direction of a relative instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDirection {
    Ago,
    FromNow,
}

/// One parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number {
        value: f64,
        unit: Option<UnitExpr>,
        /// Decimal places written in the source.
        decimals: u8,
    },
    Composite(Vec<(f64, UnitRef)>),
    Date(PlainDate),
    Time(PlainTime),
    DateTime(PlainDateTime),
    Instant(Instant),
    Bool(bool),
    Const(Constant),
    /// `now`, `today`, `tomorrow`, `yesterday`.
    RelativeKeyword(RelativeKeyword),
    Ident(Box<str>),
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Factorial(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: Box<str>,
        args: Vec<Expr>,
    },
    Convert {
        value: Box<Expr>,
        target: ConvertTarget,
    },
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `<duration-expr> ago` / `<duration-expr> from now`.
    Relative {
        amount: Box<Expr>,
        direction: RelativeDirection,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeKeyword {
    Now,
    Today,
    Tomorrow,
    Yesterday,
}

impl Expr {
    /// Free identifiers referenced by this expression, for the pruner.
    pub fn collect_idents<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ident(name) => out.push(name),
            Self::Group(inner) | Self::Factorial(inner) => inner.collect_idents(out),
            Self::Unary { operand, .. } => operand.collect_idents(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_idents(out);
                rhs.collect_idents(out);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_idents(out);
                }
            }
            Self::Convert { value, .. } => value.collect_idents(out),
            Self::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_idents(out);
                then_branch.collect_idents(out);
                else_branch.collect_idents(out);
            }
            Self::Relative { amount, .. } => amount.collect_idents(out),
            _ => {}
        }
    }
}

/// Structural statistics the selector scores candidates by.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateStats {
    /// Source characters consumed as unit tokens.
    pub unit_chars: usize,
    /// Tokens skipped as plain text around the expression.
    pub text_fragments: u32,
    /// Conversion targets resolved as timezone aliases.
    pub timezone_hits: u32,
    /// Composite magnitude literals formed.
    pub composite_literals: u32,
    /// `per` consumed as a division operator.
    pub per_divisor: u32,
    /// `per` consumed inside a unit expression.
    pub per_unit_former: u32,
    /// Position in the grammar's preferred candidate order.
    pub ordinal: u32,
}

/// One parse candidate for a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub expr: Expr,
    /// Variable name when the line is an assignment.
    pub assign: Option<Box<str>>,
    pub stats: CandidateStats,
}
