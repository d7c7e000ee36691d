//! The ambiguous parser.
//!
//! One line parses into a *set* of candidates. Ambiguity is driven by
//! a decision tape: whenever the parse reaches a point that admits two
//! readings (unit vs identifier, am/pm vs attometre/picometre, prime
//! glyphs, `per`, composite vs multiplication, property vs unit
//! target), it consults the tape. The driver re-runs the parse over
//! every tape the line exposes, depth- and count-capped, producing the
//! grammar-ordered candidate list the selector and the trial evaluator
//! work from.

use crate::datetime::{PlainDate, PlainDateTime, PlainTime};
use crate::error::CalcError;
use crate::eval::functions;
use crate::eval::Format;
use crate::tz::TimezoneTable;
use crate::units::UnitRegistry;
use crate::CalcResult;

use super::ast::{
    BinaryOp, Candidate, CandidateStats, Constant, ConvertTarget, DateProperty, Expr,
    RelativeDirection, RelativeKeyword, UnaryOp, UnitExpr, UnitRef,
};
use super::lexer::tokenize;
use super::token::{Sym, Token, TokenKind};

/// Upper bound on candidates explored per line.
const MAX_CANDIDATES: usize = 24;
/// Upper bound on decision points explored per line.
const MAX_DECISIONS: usize = 6;

const BP_IF: u8 = 1;
const BP_CONVERT: u8 = 2;
const BP_OR: u8 = 3;
const BP_AND: u8 = 4;
const BP_BITOR: u8 = 5;
const BP_BITXOR: u8 = 6;
const BP_BITAND: u8 = 7;
const BP_CMP: u8 = 8;
const BP_SHIFT: u8 = 9;
const BP_ADD: u8 = 10;
const BP_MUL: u8 = 11;
const BP_UNARY: u8 = 12;
const BP_POW: u8 = 13;

/// Words that terminate operand positions.
const STOP_WORDS: &[&str] = &[
    "to", "in", "as", "per", "mod", "xor", "then", "else", "ago", "from", "and", "or",
];

/// The result of parsing one line.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Deduplicated candidates in grammar-preferred order.
    pub candidates: Vec<Candidate>,
    /// The failure to report when no candidate exists.
    pub error: Option<CalcError>,
}

/// Parser for expression lines, borrowing the immutable databases.
pub struct Parser<'a> {
    registry: &'a UnitRegistry,
    timezones: &'a TimezoneTable,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(registry: &'a UnitRegistry, timezones: &'a TimezoneTable) -> Self {
        Self {
            registry,
            timezones,
        }
    }

    /// Parses a line into its full candidate set.
    #[must_use]
    pub fn parse_line(&self, src: &str) -> ParseOutcome {
        let tokens = match tokenize(src) {
            Ok(tokens) => tokens,
            Err(err) => {
                return ParseOutcome {
                    candidates: Vec::new(),
                    error: Some(err),
                }
            }
        };
        if tokens.is_empty() {
            return ParseOutcome {
                candidates: Vec::new(),
                error: Some(CalcError::parse().with_message("empty expression")),
            };
        }

        let mut candidates = Vec::new();
        let mut failure = None;
        self.explore(&tokens, Vec::new(), &mut candidates, &mut failure);

        // Plain-text fallback: retry with leading, then trailing word
        // runs skipped, counting the skipped tokens as text fragments.
        if candidates.is_empty() {
            self.explore_windows(&tokens, &mut candidates, &mut failure);
        }

        dedup_candidates(&mut candidates);
        for (ordinal, candidate) in candidates.iter_mut().enumerate() {
            candidate.stats.ordinal = ordinal as u32;
        }
        if candidates.len() > 1 {
            log::trace!("line parsed to {} candidates", candidates.len());
        }
        ParseOutcome {
            error: candidates.is_empty().then(|| {
                failure.unwrap_or_else(|| CalcError::parse().with_message("unable to parse"))
            }),
            candidates,
        }
    }

    /// Parses a line with plain-text skipping forced on, used when
    /// every full-line candidate was pruned: `Price 100 USD` falls
    /// back to `100 USD` with the skipped words counted as text.
    #[must_use]
    pub fn parse_line_text_skip(&self, src: &str) -> ParseOutcome {
        let Ok(tokens) = tokenize(src) else {
            return ParseOutcome {
                candidates: Vec::new(),
                error: None,
            };
        };
        let mut candidates = Vec::new();
        let mut failure = None;
        self.explore_windows(&tokens, &mut candidates, &mut failure);
        dedup_candidates(&mut candidates);
        for (ordinal, candidate) in candidates.iter_mut().enumerate() {
            candidate.stats.ordinal = ordinal as u32;
        }
        ParseOutcome {
            candidates,
            error: failure,
        }
    }

    fn explore(
        &self,
        tokens: &[Token],
        tape: Vec<bool>,
        out: &mut Vec<Candidate>,
        failure: &mut Option<CalcError>,
    ) {
        if out.len() >= MAX_CANDIDATES {
            return;
        }
        let mut line = LineParser::new(self, tokens, &tape);
        let result = line.parse_top();
        if line.decisions_seen > tape.len() && tape.len() < MAX_DECISIONS {
            for flip in [false, true] {
                let mut extended = tape.clone();
                extended.push(flip);
                self.explore(tokens, extended, out, failure);
            }
            if tape.len() + 1 == MAX_DECISIONS && line.decisions_seen > MAX_DECISIONS {
                log::debug!("candidate decision cap hit; some readings not explored");
            }
            return;
        }
        match result {
            Ok(candidate) => out.push(candidate),
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }

    fn explore_windows(
        &self,
        tokens: &[Token],
        out: &mut Vec<Candidate>,
        failure: &mut Option<CalcError>,
    ) {
        let is_texty =
            |t: &Token| matches!(t.kind, TokenKind::Word(_) | TokenKind::Sym(Sym::Colon));
        // A skipped prefix must leave an operand at the front, so
        // `y + 1` never silently degrades to `+ 1`.
        let starts_expression = |t: &Token| {
            matches!(
                t.kind,
                TokenKind::Number { .. }
                    | TokenKind::Word(_)
                    | TokenKind::Date(_)
                    | TokenKind::DateTime(_)
                    | TokenKind::Instant(_)
                    | TokenKind::Sym(Sym::LParen)
            )
        };
        let mut leading = 0;
        while leading < tokens.len() && is_texty(&tokens[leading]) {
            leading += 1;
        }
        for skip_front in 1..=leading {
            let window = &tokens[skip_front..];
            if window.is_empty() {
                break;
            }
            if !starts_expression(&window[0]) {
                continue;
            }
            let mut sub = Vec::new();
            self.explore(window, Vec::new(), &mut sub, failure);
            if !sub.is_empty() {
                for mut candidate in sub {
                    candidate.stats.text_fragments += skip_front as u32;
                    out.push(candidate);
                }
                return;
            }
        }
        // Trailing text.
        let mut end = tokens.len();
        while end > 1 && matches!(tokens[end - 1].kind, TokenKind::Word(_)) {
            end -= 1;
            let window = &tokens[..end];
            let mut sub = Vec::new();
            self.explore(window, Vec::new(), &mut sub, failure);
            if !sub.is_empty() {
                for mut candidate in sub {
                    candidate.stats.text_fragments += (tokens.len() - end) as u32;
                    out.push(candidate);
                }
                return;
            }
        }
    }

    fn unit_ref_for(&self, name: &str) -> Option<UnitRef> {
        if let Some(unit) = self.registry.lookup_unit(name) {
            return Some(UnitRef::Fixed(unit));
        }
        let currency = self.registry.currency_by_code(name).or_else(|| {
            self.registry.currency_by_name(name)
        })?;
        Some(UnitRef::Currency(currency.code.as_str().into()))
    }
}

fn dedup_candidates(candidates: &mut Vec<Candidate>) {
    let mut seen: Vec<(Expr, Option<Box<str>>)> = Vec::new();
    candidates.retain(|candidate| {
        let key = (candidate.expr.clone(), candidate.assign.clone());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// Which unit the prime glyphs mean on this line.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PrimeMode {
    FeetInches,
    ArcMinutesSeconds,
}

struct LineParser<'a> {
    parser: &'a Parser<'a>,
    tokens: &'a [Token],
    pos: usize,
    tape: &'a [bool],
    tape_pos: usize,
    decisions_seen: usize,
    stats: CandidateStats,
    prime_mode: Option<PrimeMode>,
}

impl<'a> LineParser<'a> {
    fn new(parser: &'a Parser<'a>, tokens: &'a [Token], tape: &'a [bool]) -> Self {
        Self {
            parser,
            tokens,
            pos: 0,
            tape,
            tape_pos: 0,
            decisions_seen: 0,
            stats: CandidateStats::default(),
            prime_mode: None,
        }
    }

    /// Consults the decision tape; `false` is always the grammar's
    /// preferred reading.
    fn choose(&mut self) -> bool {
        let value = self.tape.get(self.tape_pos).copied().unwrap_or(false);
        self.tape_pos += 1;
        self.decisions_seen = self.decisions_seen.max(self.tape_pos);
        value
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn eat_sym(&mut self, sym: Sym) -> bool {
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Sym(sym)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_word(word)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CalcError {
        let mut message = message.into();
        if let Some(token) = self.peek() {
            message.push_str(&format!(" at offset {}", token.start));
        }
        CalcError::parse().with_message(message)
    }

    // ==== Top level ====

    fn parse_top(&mut self) -> CalcResult<Candidate> {
        let assign = self.parse_assignment_head();
        let expr = self.parse_expr(BP_IF)?;
        if self.pos != self.tokens.len() {
            return Err(self.error_here("unexpected trailing input"));
        }
        Ok(Candidate {
            expr,
            assign,
            stats: self.stats,
        })
    }

    fn parse_assignment_head(&mut self) -> Option<Box<str>> {
        let TokenKind::Word(name) = &self.peek()?.kind else {
            return None;
        };
        if STOP_WORDS.contains(&name.as_str()) {
            return None;
        }
        if self.peek_at(1)?.kind != TokenKind::Sym(Sym::Assign) {
            return None;
        }
        let name: Box<str> = name.as_str().into();
        self.pos += 2;
        Some(name)
    }

    // ==== Expressions ====

    fn parse_expr(&mut self, min_bp: u8) -> CalcResult<Expr> {
        if min_bp <= BP_IF && self.peek().is_some_and(|t| t.is_word("if")) {
            return self.parse_if();
        }
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some(token) = self.peek() else {
                break;
            };
            match &token.kind {
                TokenKind::Sym(Sym::Bang) => {
                    // Postfix factorial.
                    self.pos += 1;
                    lhs = Expr::Factorial(Box::new(lhs));
                    continue;
                }
                TokenKind::Sym(Sym::Percent) => {
                    if self.percent_is_modulo() {
                        if BP_MUL < min_bp {
                            break;
                        }
                        self.pos += 1;
                        let rhs = self.parse_expr(BP_MUL + 1)?;
                        lhs = binary(BinaryOp::Rem, lhs, rhs);
                    } else {
                        self.pos += 1;
                        lhs = self.attach_percent(lhs)?;
                    }
                    continue;
                }
                _ => {}
            }

            // Conversion, relative instants.
            if BP_CONVERT >= min_bp {
                if self.peek().is_some_and(|t| {
                    t.is_word("to") || t.is_word("in") || t.is_word("as")
                }) || matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Sym(Sym::Arrow)))
                {
                    self.pos += 1;
                    let target = self.parse_convert_target()?;
                    lhs = Expr::Convert {
                        value: Box::new(lhs),
                        target,
                    };
                    continue;
                }
                if self.peek().is_some_and(|t| t.is_word("ago")) {
                    self.pos += 1;
                    lhs = Expr::Relative {
                        amount: Box::new(lhs),
                        direction: RelativeDirection::Ago,
                    };
                    continue;
                }
                if self.peek().is_some_and(|t| t.is_word("from"))
                    && self.peek_at(1).is_some_and(|t| t.is_word("now"))
                {
                    self.pos += 2;
                    lhs = Expr::Relative {
                        amount: Box::new(lhs),
                        direction: RelativeDirection::FromNow,
                    };
                    continue;
                }
            }

            let Some((op, lbp)) = self.peek_infix() else {
                // Implicit multiplication by juxtaposition.
                if BP_MUL >= min_bp && self.starts_operand() {
                    let rhs = self.parse_expr(BP_MUL + 1)?;
                    lhs = binary(BinaryOp::Mul, lhs, rhs);
                    continue;
                }
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.pos += 1;
            if op == BinaryOp::Div && self.tokens[self.pos - 1].is_word("per") {
                self.stats.per_divisor += 1;
            }
            let rhs = if lbp == BP_POW {
                self.parse_expr(BP_POW)?
            } else {
                self.parse_expr(lbp + 1)?
            };
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn peek_infix(&self) -> Option<(BinaryOp, u8)> {
        let token = self.peek()?;
        let entry = match &token.kind {
            TokenKind::Sym(sym) => match sym {
                Sym::Plus => (BinaryOp::Add, BP_ADD),
                Sym::Minus => (BinaryOp::Sub, BP_ADD),
                Sym::Star => (BinaryOp::Mul, BP_MUL),
                Sym::Slash => (BinaryOp::Div, BP_MUL),
                Sym::Caret => (BinaryOp::Pow, BP_POW),
                Sym::Shl => (BinaryOp::Shl, BP_SHIFT),
                Sym::Shr => (BinaryOp::Shr, BP_SHIFT),
                Sym::Lt => (BinaryOp::Lt, BP_CMP),
                Sym::Le => (BinaryOp::Le, BP_CMP),
                Sym::Gt => (BinaryOp::Gt, BP_CMP),
                Sym::Ge => (BinaryOp::Ge, BP_CMP),
                Sym::EqEq => (BinaryOp::Eq, BP_CMP),
                Sym::Ne => (BinaryOp::Ne, BP_CMP),
                Sym::Ampersand => (BinaryOp::BitAnd, BP_BITAND),
                Sym::Pipe => (BinaryOp::BitOr, BP_BITOR),
                Sym::AndAnd => (BinaryOp::And, BP_AND),
                Sym::OrOr => (BinaryOp::Or, BP_OR),
                _ => return None,
            },
            TokenKind::Word(word) => match word.as_str() {
                "per" => (BinaryOp::Div, BP_MUL),
                "mod" => (BinaryOp::Mod, BP_MUL),
                "xor" => (BinaryOp::BitXor, BP_BITXOR),
                _ => return None,
            },
            _ => return None,
        };
        Some(entry)
    }

    /// `%` reads as modulo when an expression follows, as the percent
    /// unit otherwise.
    fn percent_is_modulo(&self) -> bool {
        match self.peek_at(1).map(|t| &t.kind) {
            Some(TokenKind::Number { .. } | TokenKind::Word(_)) => true,
            Some(TokenKind::Sym(Sym::LParen | Sym::Minus)) => true,
            _ => false,
        }
    }

    fn attach_percent(&mut self, lhs: Expr) -> CalcResult<Expr> {
        let percent = self
            .parser
            .unit_ref_for("%")
            .ok_or_else(|| CalcError::internal())?;
        self.stats.unit_chars += 1;
        match lhs {
            Expr::Number {
                value,
                unit: None,
                decimals,
            } => Ok(Expr::Number {
                value,
                unit: Some(UnitExpr::simple(percent)),
                decimals,
            }),
            other => Ok(binary(
                BinaryOp::Mul,
                other,
                Expr::Number {
                    value: 1.0,
                    unit: Some(UnitExpr::simple(percent)),
                    decimals: 0,
                },
            )),
        }
    }

    fn starts_operand(&self) -> bool {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(word)) => {
                !STOP_WORDS.contains(&word.as_str())
            }
            Some(TokenKind::Sym(Sym::LParen)) | Some(TokenKind::Number { .. }) => true,
            _ => false,
        }
    }

    fn parse_if(&mut self) -> CalcResult<Expr> {
        self.pos += 1; // `if`
        let condition = self.parse_expr(BP_CONVERT)?;
        if !self.eat_word("then") {
            return Err(self.error_here("expected `then`"));
        }
        let then_branch = self.parse_expr(BP_CONVERT)?;
        if !self.eat_word("else") {
            return Err(self.error_here("expected `else`"));
        }
        // Right-associative: `else if ...` chains.
        let else_branch = self.parse_expr(BP_IF)?;
        Ok(Expr::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    // ==== Prefix / primary ====

    fn parse_prefix(&mut self) -> CalcResult<Expr> {
        let Some(token) = self.peek() else {
            return Err(CalcError::parse().with_message("unexpected end of input"));
        };
        match &token.kind {
            TokenKind::Sym(Sym::Minus) => {
                self.pos += 1;
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Sym(Sym::Plus) => {
                self.pos += 1;
                self.parse_expr(BP_UNARY)
            }
            TokenKind::Sym(Sym::Bang) => {
                self.pos += 1;
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Sym(Sym::Tilde) => {
                self.pos += 1;
                let operand = self.parse_expr(BP_UNARY)?;
                Ok(Expr::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Sym(Sym::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr(BP_IF)?;
                if !self.eat_sym(Sym::RParen) {
                    return Err(self.error_here("expected `)`"));
                }
                Ok(Expr::Group(Box::new(inner)))
            }
            TokenKind::Number { .. } => self.parse_number_literal(),
            TokenKind::Date(date) => {
                let date = *date;
                self.pos += 1;
                // `2024-01-15 10:30` combines into a date-time.
                if let Some(time) = self.try_parse_clock_time()? {
                    return Ok(Expr::DateTime(PlainDateTime::new(date, time)));
                }
                Ok(Expr::Date(date))
            }
            TokenKind::DateTime(datetime) => {
                let datetime = *datetime;
                self.pos += 1;
                Ok(Expr::DateTime(datetime))
            }
            TokenKind::Instant(instant) => {
                let instant = *instant;
                self.pos += 1;
                Ok(Expr::Instant(instant))
            }
            TokenKind::Word(_) => self.parse_word_primary(),
            TokenKind::Prime | TokenKind::DoublePrime | TokenKind::Superscript(_) => {
                Err(self.error_here("unexpected token"))
            }
            _ => Err(self.error_here("unexpected token")),
        }
    }

    fn parse_word_primary(&mut self) -> CalcResult<Expr> {
        let Some(TokenKind::Word(word)) = self.peek().map(|t| t.kind.clone()) else {
            return Err(self.error_here("expected a word"));
        };

        // Keywords and constants.
        match word.to_lowercase().as_str() {
            "true" => {
                self.pos += 1;
                return Ok(Expr::Bool(true));
            }
            "false" => {
                self.pos += 1;
                return Ok(Expr::Bool(false));
            }
            "now" => {
                self.pos += 1;
                return Ok(Expr::RelativeKeyword(RelativeKeyword::Now));
            }
            "today" => {
                self.pos += 1;
                return Ok(Expr::RelativeKeyword(RelativeKeyword::Today));
            }
            "tomorrow" => {
                self.pos += 1;
                return Ok(Expr::RelativeKeyword(RelativeKeyword::Tomorrow));
            }
            "yesterday" => {
                self.pos += 1;
                return Ok(Expr::RelativeKeyword(RelativeKeyword::Yesterday));
            }
            _ => {}
        }
        match word.as_str() {
            "pi" | "π" => {
                self.pos += 1;
                return Ok(Expr::Const(Constant::Pi));
            }
            "tau" | "τ" => {
                self.pos += 1;
                return Ok(Expr::Const(Constant::Tau));
            }
            "e" => {
                self.pos += 1;
                return Ok(Expr::Const(Constant::E));
            }
            _ => {}
        }

        // Month-name date: `Jan 31, 1970` / `Jan 31 1970`.
        if let Some(month) = month_from_word(&word) {
            if let Some(expr) = self.try_parse_month_first_date(month)? {
                return Ok(expr);
            }
        }

        // Function call.
        if functions::is_builtin_function(&word)
            && self.peek_at(1).map(|t| &t.kind) == Some(&TokenKind::Sym(Sym::LParen))
        {
            self.pos += 2;
            let mut args = Vec::new();
            if !self.eat_sym(Sym::RParen) {
                loop {
                    args.push(self.parse_expr(BP_IF)?);
                    if self.eat_sym(Sym::Comma) {
                        continue;
                    }
                    if self.eat_sym(Sym::RParen) {
                        break;
                    }
                    return Err(self.error_here("expected `,` or `)`"));
                }
            }
            return Ok(Expr::Call {
                name: word.into(),
                args,
            });
        }

        // Currency sign prefix: `$100`.
        if let Some(unit) = self.parser.unit_ref_for(&word) {
            if is_currency_dimension(&unit)
                && matches!(
                    self.peek_at(1).map(|t| &t.kind),
                    Some(TokenKind::Number { .. })
                )
            {
                let sign_len = self.peek().map_or(0, Token::len);
                self.pos += 1;
                let Some(TokenKind::Number {
                    value, decimals, ..
                }) = self.peek().map(|t| t.kind.clone())
                else {
                    return Err(self.error_here("expected an amount"));
                };
                self.pos += 1;
                self.stats.unit_chars += sign_len;
                return Ok(Expr::Number {
                    value,
                    unit: Some(UnitExpr::simple(unit)),
                    decimals,
                });
            }
        }

        self.pos += 1;
        Ok(Expr::Ident(word.into()))
    }

    fn try_parse_month_first_date(&mut self, month: u8) -> CalcResult<Option<Expr>> {
        let Some(TokenKind::Number {
            value: day,
            integral: true,
            ..
        }) = self.peek_at(1).map(|t| t.kind.clone())
        else {
            return Ok(None);
        };
        if !(1.0..=31.0).contains(&day) {
            return Ok(None);
        }
        let mut ahead = 2;
        if self.peek_at(ahead).map(|t| &t.kind) == Some(&TokenKind::Sym(Sym::Comma)) {
            ahead += 1;
        }
        let Some(TokenKind::Number {
            value: year,
            integral: true,
            ..
        }) = self.peek_at(ahead).map(|t| t.kind.clone())
        else {
            return Ok(None);
        };
        if !(1000.0..=9999.0).contains(&year) {
            return Ok(None);
        }
        self.pos += ahead + 1;
        let date = PlainDate::new(year as i32, month, day as u8)?;
        Ok(Some(Expr::Date(date)))
    }

    // ==== Number literals, units, composites ====

    fn parse_number_literal(&mut self) -> CalcResult<Expr> {
        let Some(TokenKind::Number {
            value,
            integral,
            decimals,
        }) = self.peek().map(|t| t.kind.clone())
        else {
            return Err(self.error_here("expected a number"));
        };
        self.pos += 1;

        // Clock time: `17:30`, `5:30pm`.
        if integral && (0.0..=23.0).contains(&value) {
            if let Some(time) = self.try_parse_clock_time_with_hour(value as u8)? {
                return Ok(Expr::Time(time));
            }
        }

        // `5 pm` — time indicator by default, attometre/picometre on
        // the forked reading.
        if integral && (1.0..=12.0).contains(&value) {
            if let Some(indicator) = self.peek_meridiem() {
                if !self.choose() {
                    self.pos += 1;
                    let hour = meridiem_hour(value as u8, indicator);
                    return Ok(Expr::Time(PlainTime::new(hour, 0, 0, 0)?));
                }
            }
        }

        // Year-first month-name date: `1970 Jan 31`.
        if integral && (1000.0..=9999.0).contains(&value) {
            if let Some(TokenKind::Word(word)) = self.peek().map(|t| t.kind.clone()) {
                if let Some(month) = month_from_word(&word) {
                    if let Some(TokenKind::Number {
                        value: day,
                        integral: true,
                        ..
                    }) = self.peek_at(1).map(|t| t.kind.clone())
                    {
                        if (1.0..=31.0).contains(&day) {
                            self.pos += 2;
                            let date = PlainDate::new(value as i32, month, day as u8)?;
                            return Ok(Expr::Date(date));
                        }
                    }
                }
            }
        }

        // Day-first month-name date: `31 Jan 1970`.
        if integral && (1.0..=31.0).contains(&value) {
            if let Some(TokenKind::Word(word)) = self.peek().map(|t| t.kind.clone()) {
                if let Some(month) = month_from_word(&word) {
                    if let Some(TokenKind::Number {
                        value: year,
                        integral: true,
                        ..
                    }) = self.peek_at(1).map(|t| t.kind.clone())
                    {
                        if (1000.0..=9999.0).contains(&year) {
                            self.pos += 2;
                            let date = PlainDate::new(year as i32, month, value as u8)?;
                            return Ok(Expr::Date(date));
                        }
                    }
                }
            }
        }

        // Unit attachment.
        if let Some((unit, consumed_chars, consumed_tokens, exponent)) = self.peek_unit_factor() {
            // A unit word can also be an identifier; the forked
            // reading leaves the word for implicit multiplication.
            if !self.choose() {
                self.pos += consumed_tokens;
                self.stats.unit_chars += consumed_chars;
                let first = (unit, exponent);
                let unit_expr = self.parse_unit_expr_continuation(first)?;

                // Composite magnitude: `5 ft 3 in`, `1h 30min`.
                if let Some(simple) = unit_expr.as_simple() {
                    if self.composite_continues(simple) && !self.choose() {
                        return self.parse_composite(value, simple.clone());
                    }
                }
                return Ok(Expr::Number {
                    value,
                    unit: Some(unit_expr),
                    decimals,
                });
            }
        }

        Ok(Expr::Number {
            value,
            unit: None,
            decimals,
        })
    }

    fn peek_meridiem(&self) -> Option<Meridiem> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Word(w)) if w == "am" || w == "AM" => Some(Meridiem::Am),
            Some(TokenKind::Word(w)) if w == "pm" || w == "PM" => Some(Meridiem::Pm),
            _ => None,
        }
    }

    fn try_parse_clock_time(&mut self) -> CalcResult<Option<PlainTime>> {
        let Some(TokenKind::Number {
            value,
            integral: true,
            ..
        }) = self.peek().map(|t| t.kind.clone())
        else {
            return Ok(None);
        };
        if !(0.0..=23.0).contains(&value) {
            return Ok(None);
        }
        if self.peek_at(1).map(|t| &t.kind) != Some(&TokenKind::Sym(Sym::Colon)) {
            return Ok(None);
        }
        self.pos += 1;
        self.try_parse_clock_time_with_hour(value as u8)
    }

    fn try_parse_clock_time_with_hour(&mut self, hour: u8) -> CalcResult<Option<PlainTime>> {
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::Sym(Sym::Colon)) {
            return Ok(None);
        }
        let Some(TokenKind::Number {
            value: minute,
            integral: true,
            ..
        }) = self.peek_at(1).map(|t| t.kind.clone())
        else {
            return Ok(None);
        };
        if !(0.0..=59.0).contains(&minute) {
            return Ok(None);
        }
        self.pos += 2;
        let mut second = 0u8;
        let mut millisecond = 0u16;
        if self.peek().map(|t| &t.kind) == Some(&TokenKind::Sym(Sym::Colon)) {
            if let Some(TokenKind::Number {
                value: secs,
                integral,
                ..
            }) = self.peek_at(1).map(|t| t.kind.clone())
            {
                if (0.0..60.0).contains(&secs) {
                    self.pos += 2;
                    second = secs as u8;
                    if !integral {
                        millisecond = ((secs - secs.trunc()) * 1000.0).round() as u16;
                    }
                }
            }
        }
        let mut hour = hour;
        if let Some(indicator) = self.peek_meridiem() {
            self.pos += 1;
            hour = meridiem_hour(hour, indicator);
        }
        Ok(Some(PlainTime::new(hour, minute as u8, second, millisecond)?))
    }

    /// Looks ahead for a unit factor at the cursor: a unit word (with
    /// two-word names joined), a prime glyph, or a unit word carrying
    /// an exponent (superscript, `^n`, or a trailing digit as in
    /// `m2`). Returns `(unit, chars, tokens, exponent)`.
    fn peek_unit_factor(&mut self) -> Option<(UnitRef, usize, usize, i32)> {
        let (kind, token_len) = {
            let token = self.peek()?;
            (token.kind.clone(), token.len())
        };
        match kind {
            TokenKind::Prime => Some((self.prime_unit(false), 1, 1, 1)),
            TokenKind::DoublePrime => Some((self.prime_unit(true), 1, 1, 1)),
            TokenKind::Word(word) => {
                if word.eq_ignore_ascii_case("in") {
                    // `in` is both the inch and the conversion keyword.
                    // When a target could follow, the keyword reading
                    // is preferred; at the end of input, the inch is.
                    let target_follows = matches!(
                        self.peek_at(1).map(|t| &t.kind),
                        Some(TokenKind::Word(_) | TokenKind::Number { .. })
                    );
                    let unit_reading = if target_follows {
                        self.choose()
                    } else {
                        !self.choose()
                    };
                    if !unit_reading {
                        return None;
                    }
                    let inch = self.parser.registry.unit_by_id("inch")?;
                    return Some((UnitRef::Fixed(inch), token_len, 1, 1));
                }
                if STOP_WORDS.contains(&word.as_str()) || month_from_word(&word).is_some() {
                    return None;
                }
                // Two-word unit names.
                if let Some(TokenKind::Word(next)) = self.peek_at(1).map(|t| t.kind.clone()) {
                    if !STOP_WORDS.contains(&next.as_str()) {
                        let joined = format!("{word} {next}");
                        if let Some(unit) = self.parser.unit_ref_for(&joined) {
                            let chars = token_len + 1 + self.peek_at(1).map_or(0, Token::len);
                            return Some((unit, chars, 2, 1));
                        }
                    }
                }
                // `square foot`, `cubic yard` exponent words.
                let squared_or_cubed = match word.to_lowercase().as_str() {
                    "sq" | "square" => Some(2),
                    "cu" | "cubic" => Some(3),
                    _ => None,
                };
                if let Some(exponent) = squared_or_cubed {
                    if let Some(TokenKind::Word(next)) = self.peek_at(1).map(|t| t.kind.clone()) {
                        if let Some(unit) = self.parser.unit_ref_for(&next) {
                            let chars = token_len + 1 + self.peek_at(1).map_or(0, Token::len);
                            return Some((unit, chars, 2, exponent));
                        }
                    }
                }
                if let Some(unit) = self.parser.unit_ref_for(&word) {
                    let (tokens, exponent) = self.peek_exponent_after(1);
                    return Some((unit, token_len, tokens, exponent));
                }
                // Trailing-digit exponent sugar: `m2`, `s3`.
                let trimmed = word.trim_end_matches(|c: char| c.is_ascii_digit());
                if trimmed.len() < word.len() && !trimmed.is_empty() {
                    let exponent: i32 = word[trimmed.len()..].parse().ok()?;
                    if (2..=4).contains(&exponent) {
                        if let Some(unit) = self.parser.unit_ref_for(trimmed) {
                            return Some((unit, token_len, 1, exponent));
                        }
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Exponent continuation after a unit word: superscripts or
    /// `^[-]n`. Returns `(tokens_consumed_total, exponent)`.
    fn peek_exponent_after(&self, base_tokens: usize) -> (usize, i32) {
        match self.peek_at(base_tokens).map(|t| &t.kind) {
            Some(TokenKind::Superscript(exp)) => (base_tokens + 1, *exp),
            Some(TokenKind::Sym(Sym::Caret)) => {
                match self.peek_at(base_tokens + 1).map(|t| t.kind.clone()) {
                    Some(TokenKind::Number {
                        value,
                        integral: true,
                        ..
                    }) => (base_tokens + 2, value as i32),
                    Some(TokenKind::Sym(Sym::Minus)) => {
                        match self.peek_at(base_tokens + 2).map(|t| t.kind.clone()) {
                            Some(TokenKind::Number {
                                value,
                                integral: true,
                                ..
                            }) => (base_tokens + 3, -(value as i32)),
                            _ => (base_tokens, 1),
                        }
                    }
                    _ => (base_tokens, 1),
                }
            }
            _ => (base_tokens, 1),
        }
    }

    fn prime_unit(&mut self, double: bool) -> UnitRef {
        let mode = self.prime_mode.unwrap_or_else(|| {
            // A degree sign earlier on the line reads the glyphs as
            // arc units by default; the fork covers the other reading.
            let has_degree = self.tokens[..self.pos]
                .iter()
                .any(|t| matches!(&t.kind, TokenKind::Word(w) if w == "°"));
            let default = if has_degree {
                PrimeMode::ArcMinutesSeconds
            } else {
                PrimeMode::FeetInches
            };
            if self.choose() {
                match default {
                    PrimeMode::FeetInches => PrimeMode::ArcMinutesSeconds,
                    PrimeMode::ArcMinutesSeconds => PrimeMode::FeetInches,
                }
            } else {
                default
            }
        });
        self.prime_mode = Some(mode);
        let id = match (mode, double) {
            (PrimeMode::FeetInches, false) => "foot",
            (PrimeMode::FeetInches, true) => "inch",
            (PrimeMode::ArcMinutesSeconds, false) => "arcminute",
            (PrimeMode::ArcMinutesSeconds, true) => "arcsecond",
        };
        UnitRef::Fixed(
            self.parser
                .registry
                .unit_by_id(id)
                .expect("prime units exist in every catalogue"),
        )
    }

    /// Continues a unit expression after its first factor: `/u`,
    /// `·u`, `per u`, and juxtaposed factors that carry an explicit
    /// exponent (`m s⁻¹`).
    fn parse_unit_expr_continuation(
        &mut self,
        first: (UnitRef, i32),
    ) -> CalcResult<UnitExpr> {
        let mut terms = vec![first];
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Sym(Sym::Slash)) => {
                    let save = self.pos;
                    self.pos += 1;
                    match self.peek_unit_factor() {
                        Some((unit, chars, tokens, exponent)) => {
                            self.pos += tokens;
                            self.stats.unit_chars += chars;
                            terms.push((unit, -exponent));
                        }
                        None => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                Some(TokenKind::Sym(Sym::Star)) => {
                    let save = self.pos;
                    self.pos += 1;
                    match self.peek_unit_factor() {
                        Some((unit, chars, tokens, exponent)) => {
                            self.pos += tokens;
                            self.stats.unit_chars += chars;
                            terms.push((unit, exponent));
                        }
                        None => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                Some(TokenKind::Word(w)) if w == "per" => {
                    let save = self.pos;
                    self.pos += 1;
                    match self.peek_unit_factor() {
                        Some((unit, chars, tokens, exponent)) => {
                            // Forked: `per` as divisor leaves the word
                            // to the operator table.
                            if self.choose() {
                                self.pos = save;
                                break;
                            }
                            self.pos += tokens;
                            self.stats.unit_chars += chars;
                            self.stats.per_unit_former += 1;
                            terms.push((unit, -exponent));
                        }
                        None => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                Some(TokenKind::Word(_)) => {
                    // Juxtaposition only with an explicit exponent.
                    let save = self.pos;
                    match self.peek_unit_factor() {
                        Some((unit, chars, tokens, exponent))
                            if exponent != 1 =>
                        {
                            self.pos += tokens;
                            self.stats.unit_chars += chars;
                            terms.push((unit, exponent));
                        }
                        _ => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(UnitExpr { terms })
    }

    /// Whether a composite continuation (`<number> <same-dimension
    /// unit>`) follows.
    fn composite_continues(&mut self, first: &UnitRef) -> bool {
        let Some(TokenKind::Number { .. }) = self.peek().map(|t| &t.kind) else {
            return false;
        };
        let save = self.pos;
        self.pos += 1;
        let next = self.peek_unit_factor();
        self.pos = save;
        matches!(next, Some((unit, _, _, 1)) if unit.dimension_id() == first.dimension_id())
    }

    fn parse_composite(&mut self, value: f64, first: UnitRef) -> CalcResult<Expr> {
        let mut components = vec![(value, first)];
        self.stats.composite_literals += 1;
        loop {
            let Some(TokenKind::Number {
                value, ..
            }) = self.peek().map(|t| t.kind.clone())
            else {
                break;
            };
            let save = self.pos;
            self.pos += 1;
            match self.peek_unit_factor() {
                Some((unit, chars, tokens, 1))
                    if unit.dimension_id() == components[0].1.dimension_id() =>
                {
                    self.pos += tokens;
                    self.stats.unit_chars += chars;
                    components.push((value, unit));
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        Ok(Expr::Composite(components))
    }

    // ==== Conversion targets ====

    fn parse_convert_target(&mut self) -> CalcResult<ConvertTarget> {
        // Presentation directives.
        if let Some(format) = self.try_parse_presentation()? {
            return Ok(ConvertTarget::Presentation(format));
        }

        // `%` lexes as an operator symbol but targets the percent unit.
        if matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Sym(Sym::Percent))
        ) {
            let percent = self
                .parser
                .unit_ref_for("%")
                .ok_or_else(CalcError::internal)?;
            self.pos += 1;
            self.stats.unit_chars += 1;
            return Ok(ConvertTarget::Unit(UnitExpr::simple(percent)));
        }

        // Date/time properties. Words that are also units fork.
        if let Some(TokenKind::Word(word)) = self.peek().map(|t| t.kind.clone()) {
            if let Some(property) = DateProperty::from_word(&word) {
                let also_unit = self.parser.unit_ref_for(&word).is_some();
                if !also_unit || self.choose() {
                    self.pos += 1;
                    return Ok(ConvertTarget::Property(property));
                }
            }
        }

        // Unit expression, possibly extending into a composite list.
        let save = self.pos;
        if let Some((unit, chars, tokens, exponent)) = self.peek_unit_factor() {
            self.pos += tokens;
            self.stats.unit_chars += chars;
            let unit_expr = self.parse_unit_expr_continuation((unit, exponent))?;
            if let Some(simple) = unit_expr.as_simple() {
                let mut composite = vec![simple.clone()];
                while let Some((unit, chars, tokens, 1)) = self.peek_unit_factor() {
                    if unit.dimension_id() != composite[0].dimension_id() {
                        break;
                    }
                    self.pos += tokens;
                    self.stats.unit_chars += chars;
                    composite.push(unit);
                }
                if composite.len() > 1 {
                    return Ok(ConvertTarget::Composite(composite));
                }
            }
            return Ok(ConvertTarget::Unit(unit_expr));
        }
        self.pos = save;

        // Timezone aliases, joining up to three words.
        if let Some(target) = self.try_parse_timezone_target() {
            return Ok(target);
        }

        Err(self.error_here("unknown conversion target"))
    }

    fn try_parse_timezone_target(&mut self) -> Option<ConvertTarget> {
        let mut words = Vec::new();
        for ahead in 0..3 {
            match self.peek_at(ahead).map(|t| &t.kind) {
                Some(TokenKind::Word(word)) => words.push(word.clone()),
                _ => break,
            }
        }
        for take in (1..=words.len()).rev() {
            let name = words[..take].join(" ");
            if let Some(tz) = self.parser.timezones.resolve(&name) {
                self.pos += take;
                self.stats.timezone_hits += 1;
                return Some(ConvertTarget::Timezone(tz.iana().into()));
            }
        }
        None
    }

    fn try_parse_presentation(&mut self) -> CalcResult<Option<Format>> {
        let Some(TokenKind::Word(word)) = self.peek().map(|t| t.kind.clone()) else {
            // `to 2 decimals` / `to 3 sigfigs`.
            if let Some(TokenKind::Number {
                value,
                integral: true,
                ..
            }) = self.peek().map(|t| t.kind.clone())
            {
                if let Some(TokenKind::Word(next)) = self.peek_at(1).map(|t| t.kind.clone()) {
                    let format = match next.as_str() {
                        "decimals" | "decimal" | "dp" => {
                            Some(Format::Decimals(value as u8))
                        }
                        "sigfigs" | "sigfig" | "sf" => Some(Format::SigFigs(value as u8)),
                        _ => None,
                    };
                    if let Some(format) = format {
                        self.pos += 2;
                        return Ok(Some(format));
                    }
                }
            }
            return Ok(None);
        };
        let format = match word.as_str() {
            "hex" | "hexadecimal" => Some(Format::Hex),
            "oct" | "octal" => Some(Format::Octal),
            "bin" | "binary" => Some(Format::Binary),
            "dec" | "decimal" => Some(Format::Decimal),
            "fraction" => Some(Format::Fraction),
            "ordinal" => Some(Format::Ordinal),
            "scientific" => Some(Format::Scientific),
            "iso" | "iso8601" => Some(Format::Iso8601),
            "rfc" | "rfc2822" => Some(Format::Rfc2822),
            "unix" => Some(Format::UnixSeconds),
            "unixms" => Some(Format::UnixMillis),
            "base" => {
                if let Some(TokenKind::Number {
                    value,
                    integral: true,
                    ..
                }) = self.peek_at(1).map(|t| t.kind.clone())
                {
                    if (2.0..=36.0).contains(&value) {
                        self.pos += 2;
                        return Ok(Some(Format::Base(value as u8)));
                    }
                }
                return Err(self.error_here("base must be between 2 and 36"));
            }
            _ => None,
        };
        if let Some(format) = format {
            self.pos += 1;
            return Ok(Some(format));
        }
        Ok(None)
    }
}

#[derive(Clone, Copy)]
enum Meridiem {
    Am,
    Pm,
}

fn meridiem_hour(hour: u8, indicator: Meridiem) -> u8 {
    match indicator {
        Meridiem::Am => {
            if hour == 12 {
                0
            } else {
                hour
            }
        }
        Meridiem::Pm => {
            if hour == 12 {
                12
            } else {
                hour + 12
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn is_currency_dimension(unit: &UnitRef) -> bool {
    unit.dimension_id().starts_with("currency")
}

fn month_from_word(word: &str) -> Option<u8> {
    const MONTHS: &[&str] = &[
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    if word.len() < 3 {
        return None;
    }
    let lower = word.to_lowercase();
    MONTHS
        .iter()
        .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(&lower)))
        .map(|idx| idx as u8 + 1)
}
