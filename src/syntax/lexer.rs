//! The tokenizer for one expression line.
//!
//! Context-sensitive readings the language needs are settled here or
//! deferred to the parser's candidate forks:
//!
//! - `2e3` lexes as one scientific literal; a bare `e` stays a word
//!   (Euler's number).
//! - `2024-01-15` (optionally with a `T...` time part) lexes as a
//!   date/date-time/instant literal, never as subtraction.
//! - `'`/`"` lex as prime glyphs; whether they mean feet/inches or
//!   arcminutes/arcseconds is a parser decision.
//! - Currency signs are single-character words so `$100` splits.

use crate::datetime::{Instant, PlainDate, PlainDateTime, PlainTime};
use crate::error::CalcError;
use crate::CalcResult;

use super::token::{Sym, Token, TokenKind};

/// Characters that form one-character words (currency and related
/// signs).
const SIGN_WORDS: &[char] = &['$', '€', '£', '¥', '₩', '₹', '₪', '₫', '₽', '‰'];

const SUPERSCRIPT_DIGITS: &[char] = &['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

/// Tokenizes one expression line.
pub fn tokenize(src: &str) -> CalcResult<Vec<Token>> {
    let mut lexer = Lexer {
        src,
        chars: src.char_indices().collect(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.src.len(), |&(idx, _)| idx)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            start,
            end: self.offset(),
        }
    }

    fn next_token(&mut self) -> CalcResult<Option<Token>> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        let start = self.offset();
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        if c.is_ascii_digit() {
            return self.lex_numeric(start).map(Some);
        }
        if c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            return self.lex_decimal(start).map(Some);
        }
        if c == '\'' || c == '′' {
            self.pos += 1;
            return Ok(Some(self.token(TokenKind::Prime, start)));
        }
        if c == '"' || c == '″' {
            self.pos += 1;
            return Ok(Some(self.token(TokenKind::DoublePrime, start)));
        }
        if SUPERSCRIPT_DIGITS.contains(&c) || c == '⁻' || c == '⁺' {
            return Ok(Some(self.lex_superscript(start)));
        }
        if SIGN_WORDS.contains(&c) {
            self.pos += 1;
            return Ok(Some(self.token(TokenKind::Word(c.to_string()), start)));
        }
        if c == '°' {
            // Absorbs a trailing scale letter: °C, °F, °R.
            self.pos += 1;
            let mut word = String::from('°');
            while let Some(next) = self.peek() {
                if next.is_alphabetic() {
                    word.push(next);
                    self.pos += 1;
                } else {
                    break;
                }
            }
            return Ok(Some(self.token(TokenKind::Word(word), start)));
        }
        if c.is_alphabetic() || c == '_' || c == 'µ' {
            let mut word = String::new();
            while let Some(next) = self.peek() {
                // Superscript digits are numeric but must stay their
                // own exponent token (m² is meter squared).
                let continues = (next.is_alphanumeric() || next == '_' || next == 'µ')
                    && !SUPERSCRIPT_DIGITS.contains(&next);
                if continues {
                    word.push(next);
                    self.pos += 1;
                } else {
                    break;
                }
            }
            return Ok(Some(self.token(TokenKind::Word(word), start)));
        }

        self.lex_symbol(start).map(Some)
    }

    fn lex_symbol(&mut self, start: usize) -> CalcResult<Token> {
        let c = self.bump().unwrap_or_default();
        let two = self.peek();
        let sym = match (c, two) {
            ('<', Some('<')) => {
                self.pos += 1;
                Sym::Shl
            }
            ('>', Some('>')) => {
                self.pos += 1;
                Sym::Shr
            }
            ('<', Some('=')) => {
                self.pos += 1;
                Sym::Le
            }
            ('>', Some('=')) => {
                self.pos += 1;
                Sym::Ge
            }
            ('=', Some('=')) => {
                self.pos += 1;
                Sym::EqEq
            }
            ('!', Some('=')) => {
                self.pos += 1;
                Sym::Ne
            }
            ('&', Some('&')) => {
                self.pos += 1;
                Sym::AndAnd
            }
            ('|', Some('|')) => {
                self.pos += 1;
                Sym::OrOr
            }
            ('-', Some('>')) => {
                self.pos += 1;
                Sym::Arrow
            }
            ('+', _) => Sym::Plus,
            ('-' | '−', _) => Sym::Minus,
            ('*' | '×' | '·', _) => Sym::Star,
            ('/' | '÷', _) => Sym::Slash,
            ('%', _) => Sym::Percent,
            ('^', _) => Sym::Caret,
            ('&', _) => Sym::Ampersand,
            ('|', _) => Sym::Pipe,
            ('~', _) => Sym::Tilde,
            ('!', _) => Sym::Bang,
            ('<', _) => Sym::Lt,
            ('>', _) => Sym::Gt,
            ('≤', _) => Sym::Le,
            ('≥', _) => Sym::Ge,
            ('≠', _) => Sym::Ne,
            ('→', _) => Sym::Arrow,
            ('=', _) => Sym::Assign,
            ('(', _) => Sym::LParen,
            (')', _) => Sym::RParen,
            (',', _) => Sym::Comma,
            (':', _) => Sym::Colon,
            _ => {
                return Err(CalcError::parse()
                    .with_message(format!("unexpected character {c:?}")))
            }
        };
        Ok(self.token(TokenKind::Sym(sym), start))
    }

    fn lex_superscript(&mut self, start: usize) -> Token {
        let mut negative = false;
        if let Some(sign) = self.peek() {
            if sign == '⁻' {
                negative = true;
                self.pos += 1;
            } else if sign == '⁺' {
                self.pos += 1;
            }
        }
        let mut value: i32 = 0;
        while let Some(c) = self.peek() {
            let Some(digit) = SUPERSCRIPT_DIGITS.iter().position(|&d| d == c) else {
                break;
            };
            value = value.saturating_mul(10).saturating_add(digit as i32);
            self.pos += 1;
        }
        let value = if negative { -value } else { value };
        self.token(TokenKind::Superscript(value), start)
    }

    fn lex_numeric(&mut self, start: usize) -> CalcResult<Token> {
        // Radix literals.
        if self.peek() == Some('0') {
            if let Some(marker) = self.peek_at(1) {
                let radix = match marker {
                    'x' | 'X' => Some(16),
                    'o' | 'O' => Some(8),
                    'b' | 'B' => Some(2),
                    _ => None,
                };
                if let Some(radix) = radix {
                    if self
                        .peek_at(2)
                        .is_some_and(|c| c.is_digit(radix))
                    {
                        return self.lex_radix(start, radix);
                    }
                }
            }
        }

        if let Some(token) = self.try_lex_iso_date(start)? {
            return Ok(token);
        }
        self.lex_decimal(start)
    }

    fn lex_radix(&mut self, start: usize, radix: u32) -> CalcResult<Token> {
        self.pos += 2;
        let mut value: u64 = 0;
        while let Some(c) = self.peek() {
            if c == '_' {
                self.pos += 1;
                continue;
            }
            let Some(digit) = c.to_digit(radix) else {
                break;
            };
            value = value
                .checked_mul(u64::from(radix))
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or_else(|| {
                    CalcError::parse().with_message("integer literal does not fit 64 bits")
                })?;
            self.pos += 1;
        }
        Ok(self.token(
            TokenKind::Number {
                value: value as f64,
                integral: true,
                decimals: 0,
            },
            start,
        ))
    }

    fn lex_decimal(&mut self, start: usize) -> CalcResult<Token> {
        let begin = self.pos;
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.pos += 1;
            } else if c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let mut integral = true;
        let mut decimals = 0u8;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            integral = false;
            digits.push('.');
            self.pos += 1;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    decimals = decimals.saturating_add(1);
                    self.pos += 1;
                } else if c == '_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        // Scientific notation only when the `e` is followed by digits
        // (with optional sign); otherwise `e` is Euler's number.
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                ahead = 2;
            }
            if self.peek_at(ahead).is_some_and(|c| c.is_ascii_digit()) {
                digits.push('e');
                self.pos += 1;
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    digits.push(sign);
                    self.pos += 1;
                }
                let mut exponent_negative_or_zero = false;
                if digits.ends_with('-') {
                    exponent_negative_or_zero = true;
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                if exponent_negative_or_zero {
                    integral = false;
                }
            }
        }
        debug_assert!(self.pos > begin);
        let value: f64 = digits.parse().map_err(|_| {
            CalcError::parse().with_message(format!("{digits} is not a valid number"))
        })?;
        Ok(self.token(
            TokenKind::Number {
                value,
                integral: integral && value.fract() == 0.0,
                decimals,
            },
            start,
        ))
    }

    /// Recognises `YYYY-MM-DD` with an optional `Thh:mm[:ss[.mmm]]`
    /// part and optional `Z`/`±hh[:mm]` offset.
    fn try_lex_iso_date(&mut self, start: usize) -> CalcResult<Option<Token>> {
        let digits_at = |lexer: &Self, from: usize, count: usize| -> Option<i64> {
            let mut value = 0i64;
            for i in 0..count {
                let c = lexer.peek_at(from + i)?;
                value = value * 10 + i64::from(c.to_digit(10)?);
            }
            Some(value)
        };

        // YYYY-MM-DD, not followed by another digit.
        let (Some(year), Some('-')) = (digits_at(self, 0, 4), self.peek_at(4)) else {
            return Ok(None);
        };
        let (Some(month), Some('-')) = (digits_at(self, 5, 2), self.peek_at(7)) else {
            return Ok(None);
        };
        let Some(day) = digits_at(self, 8, 2) else {
            return Ok(None);
        };
        if self.peek_at(10).is_some_and(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        // Out-of-range components fall back to plain subtraction.
        let Ok(date) = PlainDate::new(year as i32, month as u8, day as u8) else {
            return Ok(None);
        };
        self.pos += 10;

        // Optional time part.
        let has_time = self.peek() == Some('T')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if !has_time {
            return Ok(Some(self.token(TokenKind::Date(date), start)));
        }
        self.pos += 1;
        let (Some(hour), Some(':'), Some(minute)) = (
            digits_at(self, 0, 2),
            self.peek_at(2),
            digits_at(self, 3, 2),
        ) else {
            return Err(CalcError::parse().with_message("malformed time in date-time literal"));
        };
        self.pos += 5;
        let mut second = 0i64;
        let mut millisecond = 0i64;
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            second = digits_at(self, 1, 2).ok_or_else(|| {
                CalcError::parse().with_message("malformed seconds in date-time literal")
            })?;
            self.pos += 3;
            if self.peek() == Some('.') {
                self.pos += 1;
                let mut scale = 100;
                while let Some(c) = self.peek().and_then(|c| c.to_digit(10)) {
                    millisecond += i64::from(c) * scale;
                    scale /= 10;
                    self.pos += 1;
                    if scale == 0 {
                        // Sub-millisecond digits are dropped.
                        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                            self.pos += 1;
                        }
                        break;
                    }
                }
            }
        }
        let time = PlainTime::new(hour as u8, minute as u8, second as u8, millisecond as u16)?;
        let datetime = PlainDateTime::new(date, time);

        // Optional offset.
        match self.peek() {
            Some('Z' | 'z') => {
                self.pos += 1;
                let instant = Instant::from_datetime_with_offset(&datetime, 0);
                Ok(Some(self.token(TokenKind::Instant(instant), start)))
            }
            Some(sign @ ('+' | '-')) if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.pos += 1;
                let hours = digits_at(self, 0, 2).ok_or_else(|| {
                    CalcError::parse().with_message("malformed offset in date-time literal")
                })?;
                self.pos += 2;
                let mut minutes = 0i64;
                if self.peek() == Some(':') {
                    self.pos += 1;
                }
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    minutes = digits_at(self, 0, 2).ok_or_else(|| {
                        CalcError::parse().with_message("malformed offset in date-time literal")
                    })?;
                    self.pos += 2;
                }
                let offset = (hours * 3600 + minutes * 60) * if sign == '-' { -1 } else { 1 };
                let instant = Instant::from_datetime_with_offset(&datetime, offset);
                Ok(Some(self.token(TokenKind::Instant(instant), start)))
            }
            _ => Ok(Some(self.token(TokenKind::DateTime(datetime), start))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scientific_notation_wins_over_eulers_number() {
        assert_eq!(
            kinds("2e3"),
            vec![TokenKind::Number {
                value: 2000.0,
                integral: true,
                decimals: 0
            }]
        );
        // `2 e 3` stays three tokens, and so does `2e` (no digits).
        assert_eq!(kinds("2 e 3").len(), 3);
        assert_eq!(kinds("2e").len(), 2);
    }

    #[test]
    fn radix_literals() {
        assert_eq!(
            kinds("0xff"),
            vec![TokenKind::Number {
                value: 255.0,
                integral: true,
                decimals: 0
            }]
        );
        assert_eq!(
            kinds("0b1010"),
            vec![TokenKind::Number {
                value: 10.0,
                integral: true,
                decimals: 0
            }]
        );
        assert_eq!(
            kinds("0o17"),
            vec![TokenKind::Number {
                value: 15.0,
                integral: true,
                decimals: 0
            }]
        );
    }

    #[test]
    fn iso_date_is_not_subtraction() {
        let tokens = kinds("2024-01-15");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0], TokenKind::Date(_)));

        // Arithmetic on plain numbers still lexes as subtraction.
        assert_eq!(kinds("2024-01").len(), 3);
    }

    #[test]
    fn iso_datetime_and_instant() {
        let tokens = kinds("2024-01-15T10:30");
        assert!(matches!(tokens[0], TokenKind::DateTime(_)));
        let tokens = kinds("2024-01-15T10:30:00Z");
        let TokenKind::Instant(instant) = &tokens[0] else {
            panic!("expected instant");
        };
        assert_eq!(instant.epoch_ms, 1_705_314_600_000);
        let tokens = kinds("2024-01-15T10:30:00+09:00");
        assert!(matches!(tokens[0], TokenKind::Instant(_)));
    }

    #[test]
    fn currency_signs_split_from_amounts() {
        let tokens = kinds("$100");
        assert_eq!(tokens[0], TokenKind::Word("$".to_string()));
        assert!(matches!(tokens[1], TokenKind::Number { value, .. } if value == 100.0));
    }

    #[test]
    fn degree_sign_merges_scale_letter() {
        assert_eq!(kinds("21°C"), vec![
            TokenKind::Number { value: 21.0, integral: true, decimals: 0 },
            TokenKind::Word("°C".to_string()),
        ]);
        assert_eq!(kinds("30°")[1], TokenKind::Word("°".to_string()));
    }

    #[test]
    fn primes_and_superscripts() {
        assert_eq!(
            kinds("6' 10\""),
            vec![
                TokenKind::Number { value: 6.0, integral: true, decimals: 0 },
                TokenKind::Prime,
                TokenKind::Number { value: 10.0, integral: true, decimals: 0 },
                TokenKind::DoublePrime,
            ]
        );
        assert_eq!(kinds("m²")[1], TokenKind::Superscript(2));
        assert_eq!(kinds("s⁻¹")[1], TokenKind::Superscript(-1));
    }

    #[test]
    fn unicode_operators_fold() {
        assert_eq!(kinds("3 × 4 ÷ 2")[1], TokenKind::Sym(Sym::Star));
        assert_eq!(kinds("a ≠ b")[1], TokenKind::Sym(Sym::Ne));
        assert_eq!(kinds("x → km")[1], TokenKind::Sym(Sym::Arrow));
        assert_eq!(kinds("1 << 3")[1], TokenKind::Sym(Sym::Shl));
    }

    #[test]
    fn decimals_hint_is_recorded() {
        assert_eq!(
            kinds("1.50"),
            vec![TokenKind::Number {
                value: 1.5,
                integral: false,
                decimals: 2
            }]
        );
    }
}
