// src/bridge/args.rs

//! Argument extraction for host functions.
//!
//! Every helper reports failures as `HostError::Script`, which the
//! interpreter surfaces as an ordinary runtime error.

use std::time::Duration;

use crate::input::{MouseButton, Point};
use crate::interpreter::{HostError, HostValue};

fn arg<'a>(args: &'a [HostValue], index: usize) -> &'a HostValue {
    args.get(index).unwrap_or(&HostValue::Nil)
}

fn bad_argument(function: &str, position: usize, expected: &str, got: &HostValue) -> HostError {
    HostError::Script(format!(
        "bad argument #{} to '{}' ({} expected, got {})",
        position + 1,
        function,
        expected,
        got.type_name()
    ))
}

pub(crate) fn integer(args: &[HostValue], index: usize, function: &str) -> Result<i64, HostError> {
    match arg(args, index) {
        HostValue::Integer(n) => Ok(*n),
        HostValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Ok(*n as i64),
        other => Err(bad_argument(function, index, "integer", other)),
    }
}

pub(crate) fn coordinate(args: &[HostValue], index: usize, function: &str) -> Result<i32, HostError> {
    let value = integer(args, index, function)?;
    i32::try_from(value).map_err(|_| {
        HostError::Script(format!(
            "bad argument #{} to '{}' (coordinate {} out of range)",
            index + 1,
            function,
            value
        ))
    })
}

pub(crate) fn point(args: &[HostValue], function: &str) -> Result<Point, HostError> {
    Ok(Point::new(
        coordinate(args, 0, function)?,
        coordinate(args, 1, function)?,
    ))
}

pub(crate) fn string(args: &[HostValue], index: usize, function: &str) -> Result<String, HostError> {
    match arg(args, index) {
        HostValue::String(s) => Ok(s.clone()),
        other => Err(bad_argument(function, index, "string", other)),
    }
}

/// Key names must be non-empty strings.
pub(crate) fn key(args: &[HostValue], index: usize, function: &str) -> Result<String, HostError> {
    let key = string(args, index, function)?;
    if key.trim().is_empty() {
        return Err(HostError::Script(format!(
            "bad argument #{} to '{}' (key name must not be empty)",
            index + 1,
            function
        )));
    }
    Ok(key)
}

/// Optional button; missing or nil means left.
pub(crate) fn button(args: &[HostValue], index: usize, function: &str) -> Result<MouseButton, HostError> {
    let parsed = match arg(args, index) {
        HostValue::Nil => return Ok(MouseButton::Left),
        HostValue::String(s) => s.parse(),
        HostValue::Integer(n) => n.to_string().parse(),
        other => return Err(bad_argument(function, index, "button name or number", other)),
    };
    parsed.map_err(|message: String| HostError::Script(format!("{function}: {message}")))
}

/// Non-negative duration; the number is divided by `per_second`.
pub(crate) fn duration(
    args: &[HostValue],
    index: usize,
    function: &str,
    per_second: f64,
) -> Result<Duration, HostError> {
    let value = match arg(args, index) {
        HostValue::Integer(n) => *n as f64,
        HostValue::Number(n) => *n,
        other => return Err(bad_argument(function, index, "number", other)),
    };
    if !value.is_finite() || value < 0.0 {
        return Err(HostError::Script(format!(
            "bad argument #{} to '{}' (duration must be a non-negative number, got {})",
            index + 1,
            function,
            value
        )));
    }
    Duration::try_from_secs_f64(value / per_second).map_err(|e| {
        HostError::Script(format!("bad argument #{} to '{}' ({e})", index + 1, function))
    })
}
