//! The evaluator: typed runtime values and expression walking.
//!
//! Evaluation never mutates the variable scope; assignments are
//! computed as values and committed separately by the orchestrator
//! once a candidate wins (evaluate-then-pick).

pub mod context;
pub mod convert;
pub mod datetime_ops;
pub mod functions;
pub mod value;

pub use context::EvaluationContext;
pub use value::{Format, NumberValue, Value};

use std::sync::Arc;

use crate::datetime::now::Clock;
use crate::datetime::Instant;
use crate::error::CalcError;
use crate::settings::Settings;
use crate::syntax::ast::{
    BinaryOp, Candidate, Constant, Expr, RelativeDirection, RelativeKeyword, UnaryOp, UnitExpr,
};
use crate::tz::{TimeZoneProvider, TimezoneTable};
use crate::units::dimension::{self, UnitTerm};
use crate::units::{Unit, UnitRegistry};
use crate::CalcResult;

/// The outcome of a non-committing line evaluation.
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub value: Value,
    /// The variable this line would assign, had it been committed.
    pub assign: Option<Box<str>>,
}

/// Expression evaluator borrowing the immutable session services.
pub struct Evaluator<'a> {
    pub(crate) registry: &'a UnitRegistry,
    pub(crate) timezones: &'a TimezoneTable,
    pub(crate) settings: Settings,
    pub(crate) clock: &'a dyn Clock,
    pub(crate) tz_provider: &'a dyn TimeZoneProvider,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(
        registry: &'a UnitRegistry,
        timezones: &'a TimezoneTable,
        settings: Settings,
        clock: &'a dyn Clock,
        tz_provider: &'a dyn TimeZoneProvider,
    ) -> Self {
        Self {
            registry,
            timezones,
            settings,
            clock,
            tz_provider,
        }
    }

    /// Evaluates a candidate without committing its assignment.
    #[must_use]
    pub fn try_evaluate_line(
        &self,
        candidate: &Candidate,
        context: &EvaluationContext,
    ) -> TrialResult {
        TrialResult {
            value: self.eval(&candidate.expr, context),
            assign: candidate.assign.clone(),
        }
    }

    /// Evaluates an expression; failures come back as error values.
    #[must_use]
    pub fn eval(&self, expr: &Expr, context: &EvaluationContext) -> Value {
        match self.eval_inner(expr, context) {
            Ok(value) => value,
            Err(err) => Value::Error(err),
        }
    }

    fn eval_inner(&self, expr: &Expr, context: &EvaluationContext) -> CalcResult<Value> {
        match expr {
            Expr::Number {
                value,
                unit,
                decimals,
            } => self.eval_number_literal(*value, unit.as_ref(), *decimals),
            Expr::Composite(components) => {
                let mut parts = Vec::with_capacity(components.len());
                for (value, unit) in components {
                    parts.push((*value, unit.resolve(self.registry)?));
                }
                Ok(Value::Composite(parts))
            }
            Expr::Date(date) => Ok(Value::Date(*date)),
            Expr::Time(time) => Ok(Value::Time(*time)),
            Expr::DateTime(datetime) => Ok(Value::DateTime(*datetime)),
            Expr::Instant(instant) => Ok(Value::Instant(*instant)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Const(constant) => Ok(Value::Number(NumberValue::plain(match constant {
                Constant::Pi => core::f64::consts::PI,
                Constant::Tau => core::f64::consts::TAU,
                Constant::E => core::f64::consts::E,
            }))),
            Expr::RelativeKeyword(keyword) => Ok(self.eval_relative_keyword(*keyword)),
            Expr::Ident(name) => self.resolve_identifier(name, context),
            Expr::Group(inner) => self.eval_inner(inner, context),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, context);
                self.eval_unary(*op, value)
            }
            Expr::Factorial(operand) => {
                let value = self.eval(operand, context);
                self.eval_factorial(value)
            }
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, context),
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let value = self.eval(arg, context);
                    if let Value::Error(err) = value {
                        return Err(err);
                    }
                    values.push(value);
                }
                functions::call(self, name, values)
            }
            Expr::Convert { value, target } => {
                let value = self.eval(value, context);
                if let Value::Error(err) = value {
                    return Err(err);
                }
                convert::dispatch(self, value, target)
            }
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => match self.eval(condition, context) {
                Value::Error(err) => Err(err),
                Value::Bool(true) => Ok(self.eval(then_branch, context)),
                Value::Bool(false) => Ok(self.eval(else_branch, context)),
                _ => Err(CalcError::domain()
                    .with_message("the condition of `if` must be a boolean")),
            },
            Expr::Relative { amount, direction } => {
                let amount = self.eval(amount, context);
                if let Value::Error(err) = amount {
                    return Err(err);
                }
                let Some(duration) = datetime_ops::promote_to_duration(&amount, self.settings)
                else {
                    return Err(CalcError::dimension()
                        .with_message("relative instants need a time-dimensioned amount"));
                };
                let duration = match direction {
                    RelativeDirection::Ago => duration.negated(),
                    RelativeDirection::FromNow => duration,
                };
                datetime_ops::instant_add(self, self.clock.now(), &duration).map(Value::Instant)
            }
        }
    }

    fn eval_number_literal(
        &self,
        value: f64,
        unit: Option<&UnitExpr>,
        decimals: u8,
    ) -> CalcResult<Value> {
        let Some(unit_expr) = unit else {
            return Ok(Value::Number(NumberValue {
                value,
                unit: None,
                precision: (decimals > 0).then_some(decimals),
                percent: false,
            }));
        };
        let mut terms = Vec::with_capacity(unit_expr.terms.len());
        for (unit_ref, exponent) in &unit_expr.terms {
            terms.push(UnitTerm::new(unit_ref.resolve(self.registry)?, *exponent));
        }
        // Dimensionless units collapse to plain numbers on literal
        // construction; `10%` is the number 0.1 with a percent hint.
        if let [term] = terms.as_slice() {
            if term.unit.is_dimensionless() && term.exponent == 1 {
                let factor = term.unit.conversion.linear_factor(self.settings.variant)?;
                let was_percent = term.unit.id.as_ref() == "percent";
                return Ok(Value::Number(NumberValue {
                    value: value * factor,
                    unit: None,
                    precision: None,
                    percent: was_percent,
                }));
            }
        }
        let (value, terms) = dimension::simplify(value, terms, self.settings.variant)?;
        Ok(value::collapse_terms(value, terms, decimals))
    }

    fn eval_relative_keyword(&self, keyword: RelativeKeyword) -> Value {
        let now = self.clock.now();
        match keyword {
            RelativeKeyword::Now | RelativeKeyword::Today => Value::Instant(now),
            RelativeKeyword::Tomorrow => Value::Instant(now.add_ms(crate::MS_PER_DAY)),
            RelativeKeyword::Yesterday => Value::Instant(now.add_ms(-crate::MS_PER_DAY)),
        }
    }

    fn resolve_identifier(&self, name: &str, context: &EvaluationContext) -> CalcResult<Value> {
        if let Some(value) = context.get(name) {
            return Ok(value.clone());
        }
        // A bare unit name evaluates to one of that unit, which makes
        // `per`-as-divisor readings and `5 / km` work out.
        if let Some(unit) = self.registry.resolve_unit_name(name) {
            return Ok(Value::Number(NumberValue::with_unit(1.0, unit)));
        }
        Err(CalcError::unknown_identifier().with_message(format!("{name} is not defined")))
    }

    fn eval_unary(&self, op: UnaryOp, value: Value) -> CalcResult<Value> {
        let value = value::strip_presentation(value);
        if let Value::Error(err) = value {
            return Err(err);
        }
        match op {
            UnaryOp::Neg => value::negate(value),
            UnaryOp::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(CalcError::domain().with_message("`!` needs a boolean")),
            },
            UnaryOp::BitNot => {
                let int = value::expect_dimensionless_integer(&value, "~")?;
                Ok(Value::Number(NumberValue::plain(!int as f64)))
            }
        }
    }

    fn eval_factorial(&self, value: Value) -> CalcResult<Value> {
        let value = value::strip_presentation(value);
        if let Value::Error(err) = value {
            return Err(err);
        }
        let int = value::expect_dimensionless_integer(&value, "!")?;
        if int < 0 {
            return Err(CalcError::domain().with_message("factorial of a negative number"));
        }
        // 171! already exceeds the double range.
        if int > 170 {
            return Err(CalcError::domain().with_message("factorial overflows"));
        }
        let mut result = 1.0f64;
        for k in 2..=int {
            result *= k as f64;
        }
        Ok(Value::Number(NumberValue::plain(result)))
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        context: &EvaluationContext,
    ) -> CalcResult<Value> {
        // Short-circuit logic first; errors propagate through it.
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let lhs = self.eval(lhs, context);
            return match (op, lhs) {
                (_, Value::Error(err)) => Err(err),
                (BinaryOp::And, Value::Bool(false)) => Ok(Value::Bool(false)),
                (BinaryOp::Or, Value::Bool(true)) => Ok(Value::Bool(true)),
                (_, Value::Bool(_)) => match self.eval(rhs, context) {
                    Value::Error(err) => Err(err),
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    _ => Err(CalcError::domain().with_message("logical operands must be booleans")),
                },
                _ => Err(CalcError::domain().with_message("logical operands must be booleans")),
            };
        }

        let lhs = value::strip_presentation(self.eval(lhs, context));
        if let Value::Error(err) = lhs {
            return Err(err);
        }
        let rhs = value::strip_presentation(self.eval(rhs, context));
        if let Value::Error(err) = rhs {
            return Err(err);
        }

        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                // The calendar/duration matrix takes precedence when a
                // date-like operand is involved.
                if let Some(result) =
                    datetime_ops::add_or_sub(self, &lhs, &rhs, op == BinaryOp::Sub)?
                {
                    return Ok(result);
                }
                value::add_sub(self.registry, lhs, rhs, op == BinaryOp::Sub, self.settings)
            }
            BinaryOp::Mul => value::multiply(lhs, rhs, self.settings),
            BinaryOp::Div => value::divide(lhs, rhs, self.settings),
            BinaryOp::Rem => value::remainder(lhs, rhs, false, self.settings),
            BinaryOp::Mod => value::remainder(lhs, rhs, true, self.settings),
            BinaryOp::Pow => value::power(self.registry, lhs, rhs, self.settings),
            BinaryOp::Shl | BinaryOp::Shr => {
                let a = value::expect_dimensionless_integer(&lhs, "shift")?;
                let b = value::expect_dimensionless_integer(&rhs, "shift")?;
                if !(0..64).contains(&b) {
                    return Err(CalcError::domain().with_message("shift amount out of range"));
                }
                let result = if op == BinaryOp::Shl {
                    a.wrapping_shl(b as u32)
                } else {
                    a.wrapping_shr(b as u32)
                };
                Ok(Value::Number(NumberValue::plain(result as f64)))
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                let a = value::expect_dimensionless_integer(&lhs, "bitwise")?;
                let b = value::expect_dimensionless_integer(&rhs, "bitwise")?;
                let result = match op {
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    _ => a ^ b,
                };
                Ok(Value::Number(NumberValue::plain(result as f64)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq
            | BinaryOp::Ne => value::compare(op, lhs, rhs, self.settings),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    pub(crate) fn angle_unit(&self) -> CalcResult<Arc<Unit>> {
        let id = match self.settings.angle_unit {
            crate::settings::AngleUnit::Radian => "radian",
            crate::settings::AngleUnit::Degree => "degree",
        };
        self.registry
            .unit_by_id(id)
            .ok_or_else(|| CalcError::internal().with_message("angle units missing from catalogue"))
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }
}
