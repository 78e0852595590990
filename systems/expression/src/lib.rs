#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Expression engine that builds the player's calculation and detects wins.
//!
//! Expressions alternate single-digit operands and operators and are evaluated
//! strictly left to right: `2+3x4` is `(2+3)x4 = 20`. There is no operator
//! precedence and no grouping.

use std::fmt;

use num_craze_core::{Digit, Operator, Token};
use thiserror::Error;

/// Maximum distance between a result and the target that still counts as a hit.
pub const WIN_TOLERANCE: f64 = 0.001;

/// Reports whether `result` hits `target` within [`WIN_TOLERANCE`].
#[must_use]
pub fn check_win(result: f64, target: i64) -> bool {
    (result - target as f64).abs() < WIN_TOLERANCE
}

/// Token sequence typed by the player.
///
/// The sequence never starts with an operator and never holds two operators in
/// a row. Each operand slot holds exactly one digit; typing a digit right after
/// another replaces it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// Creates an empty expression.
    #[must_use]
    pub const fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Tokens in entry order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Reports whether no token has been entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Reports whether the expression ends with a digit and can be evaluated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Digit(_)))
    }

    /// Appends `digit`, or replaces the trailing digit if the expression is complete.
    pub fn append_digit(&mut self, digit: Digit) {
        match self.tokens.last_mut() {
            Some(Token::Digit(slot)) => *slot = digit,
            _ => self.tokens.push(Token::Digit(digit)),
        }
    }

    /// Appends `operator` after a trailing digit.
    pub fn append_operator(&mut self, operator: Operator) -> Result<(), TransitionError> {
        match self.tokens.last() {
            Some(Token::Digit(_)) => {
                self.tokens.push(Token::Operator(operator));
                Ok(())
            }
            Some(Token::Operator(_)) => Err(TransitionError::TrailingOperator),
            None => Err(TransitionError::EmptyExpression),
        }
    }

    /// Removes every token.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Folds the expression from left to right.
    pub fn evaluate(&self) -> Result<f64, EvaluationError> {
        let mut tokens = self.tokens.iter();
        let mut accumulator = match tokens.next() {
            Some(Token::Digit(digit)) => f64::from(digit.value()),
            Some(Token::Operator(_)) => return Err(EvaluationError::Incomplete),
            None => return Err(EvaluationError::Empty),
        };

        while let Some(token) = tokens.next() {
            let Token::Operator(operator) = token else {
                return Err(EvaluationError::Incomplete);
            };
            let Some(Token::Digit(operand)) = tokens.next() else {
                return Err(EvaluationError::Incomplete);
            };
            accumulator = apply(*operator, accumulator, f64::from(operand.value()))?;
        }

        Ok(accumulator)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

fn apply(operator: Operator, lhs: f64, rhs: f64) -> Result<f64, EvaluationError> {
    let value = match operator {
        Operator::Add => lhs + rhs,
        Operator::Subtract => lhs - rhs,
        Operator::Multiply => lhs * rhs,
        Operator::Divide => {
            if rhs == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            lhs / rhs
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::NonFinite)
    }
}

/// Reasons an expression has no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// Nothing has been entered.
    #[error("expression is empty")]
    Empty,
    /// The expression ends with an operator.
    #[error("expression ends with an operator")]
    Incomplete,
    /// An operand of a division was zero.
    #[error("division by zero")]
    DivisionByZero,
    /// An intermediate value overflowed the finite range.
    #[error("result is not finite")]
    NonFinite,
}

/// Reasons an operator cannot be appended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// An operator cannot open the expression.
    #[error("an operator cannot start the expression")]
    EmptyExpression,
    /// An operator cannot follow another operator.
    #[error("an operator cannot follow another operator")]
    TrailingOperator,
}

/// Reasons an explicit submission did not win.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SubmitError {
    /// Nothing has been entered; the submission is ignored.
    #[error("nothing to submit")]
    Empty,
    /// The expression ends with an operator.
    #[error("expression is incomplete")]
    Malformed,
    /// Evaluation had no defined value.
    #[error("expression is undefined: {0}")]
    Undefined(EvaluationError),
    /// The expression evaluated to a number other than the target.
    #[error("{result} does not match the target")]
    WrongAnswer {
        /// Value the expression evaluated to.
        result: f64,
    },
    /// The round was already solved; no further submissions are taken.
    #[error("round already solved")]
    Locked,
}

/// Successful hit on the target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Win {
    /// Value the expression evaluated to.
    pub result: f64,
    /// Combo streak after the win.
    pub streak: u32,
}

/// Result of a digit or operator entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputOutcome {
    /// The expression changed and does not hit the target yet.
    Pending {
        /// Value of the expression when it is complete and defined.
        live_result: Option<f64>,
    },
    /// The completed expression hit the target.
    Won(Win),
    /// The round was already solved; the input was ignored.
    Locked,
}

/// Per-round engine combining the expression, the target and the combo streak.
#[derive(Clone, Debug)]
pub struct ExpressionEngine {
    expression: Expression,
    target: i64,
    streak: u32,
    live_result: Option<f64>,
    solved: Option<Win>,
}

impl ExpressionEngine {
    /// Creates an engine for `target`, continuing the provided combo streak.
    #[must_use]
    pub const fn new(target: i64, streak: u32) -> Self {
        Self {
            expression: Expression::new(),
            target,
            streak,
            live_result: None,
            solved: None,
        }
    }

    /// Expression typed so far.
    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Number the player must reach.
    #[must_use]
    pub const fn target(&self) -> i64 {
        self.target
    }

    /// Current combo streak.
    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    /// Cached value of the completed expression, cleared while it ends with an operator.
    #[must_use]
    pub const fn live_result(&self) -> Option<f64> {
        self.live_result
    }

    /// Winning hit, once the target was reached.
    #[must_use]
    pub const fn solved(&self) -> Option<Win> {
        self.solved
    }

    /// Enters a digit and checks the now-complete expression against the target.
    pub fn append_digit(&mut self, digit: Digit) -> InputOutcome {
        if self.solved.is_some() {
            return InputOutcome::Locked;
        }

        self.expression.append_digit(digit);
        self.live_result = self.expression.evaluate().ok();
        match self.live_result {
            Some(result) if check_win(result, self.target) => InputOutcome::Won(self.win(result)),
            live_result => InputOutcome::Pending { live_result },
        }
    }

    /// Enters an operator.
    ///
    /// The completed prefix is checked before the operator is committed; a
    /// prefix that already hits the target wins and the operator is dropped.
    pub fn append_operator(&mut self, operator: Operator) -> Result<InputOutcome, TransitionError> {
        if self.solved.is_some() {
            return Ok(InputOutcome::Locked);
        }
        if !self.expression.is_complete() {
            return Err(if self.expression.is_empty() {
                TransitionError::EmptyExpression
            } else {
                TransitionError::TrailingOperator
            });
        }

        if let Ok(result) = self.expression.evaluate() {
            if check_win(result, self.target) {
                return Ok(InputOutcome::Won(self.win(result)));
            }
        }

        self.expression.append_operator(operator)?;
        self.live_result = None;
        Ok(InputOutcome::Pending { live_result: None })
    }

    /// Forces evaluation of the expression.
    ///
    /// Every failure except [`SubmitError::Empty`] and [`SubmitError::Locked`]
    /// resets the combo streak. The expression is kept so the player can fix it.
    pub fn submit(&mut self) -> Result<Win, SubmitError> {
        if self.solved.is_some() {
            return Err(SubmitError::Locked);
        }

        let result = match self.expression.evaluate() {
            Ok(result) => result,
            Err(EvaluationError::Empty) => return Err(SubmitError::Empty),
            Err(EvaluationError::Incomplete) => return Err(self.fail(SubmitError::Malformed)),
            Err(error) => return Err(self.fail(SubmitError::Undefined(error))),
        };

        if check_win(result, self.target) {
            Ok(self.win(result))
        } else {
            Err(self.fail(SubmitError::WrongAnswer { result }))
        }
    }

    /// Empties the expression and drops the cached result.
    pub fn clear(&mut self) {
        if self.solved.is_none() {
            self.expression.clear();
            self.live_result = None;
        }
    }

    fn win(&mut self, result: f64) -> Win {
        self.streak = self.streak.saturating_add(1);
        self.live_result = Some(result);
        let win = Win {
            result,
            streak: self.streak,
        };
        self.solved = Some(win);
        win
    }

    fn fail(&mut self, error: SubmitError) -> SubmitError {
        self.streak = 0;
        self.live_result = None;
        error
    }
}
