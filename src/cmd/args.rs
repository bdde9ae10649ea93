//! Argument checks shared by the command handlers.

use atoi::FromRadix10SignedChecked;
use snafu::prelude::*;

use super::{
    ArgCountSnafu, InvalidArgSnafu, NumberSnafu, RangeNumberSnafu, RangeSnafu, Result,
};

/// Requires at least `length` arguments; extra ones are ignored.
pub fn verify_length(args: &[String], length: usize) -> Result<()> {
    ensure!(args.len() >= length, ArgCountSnafu);
    Ok(())
}

fn to_int(arg: &str) -> Option<i64> {
    let text = arg.trim().as_bytes();
    // a lone sign parses as zero otherwise
    if !text.iter().any(u8::is_ascii_digit) {
        return None;
    }

    match i64::from_radix_10_signed_checked(text) {
        (Some(n), used) if used == text.len() => Some(n),
        _ => None,
    }
}

pub fn parse_int(arg: &str) -> Result<i64> {
    to_int(arg).context(InvalidArgSnafu)
}

/// Only `0` and `1` are booleans.
pub fn parse_bool(arg: &str) -> Result<bool> {
    match to_int(arg) {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => InvalidArgSnafu.fail(),
    }
}

/// `N` is the half open range `N:N+1`, `START:END` is taken as is.
pub fn parse_range(arg: &str) -> Result<(i64, i64)> {
    let values = arg
        .split(':')
        .map(to_int)
        .collect::<Option<Vec<i64>>>()
        .context(RangeNumberSnafu)?;

    match values[..] {
        [start] => Ok((start, start.saturating_add(1))),
        [start, end] => Ok((start, end)),
        _ => RangeSnafu.fail(),
    }
}

pub fn parse_float(arg: &str) -> Result<f64> {
    arg.trim().parse::<f64>().ok().context(NumberSnafu)
}
