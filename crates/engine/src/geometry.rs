//! Per-axis expectations for `at` and `size`

use std::fmt;

use crate::driver::Rect;
use crate::token::format_number;

/// Expectation for one coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    /// `*`: not checked
    Any,
    Exact(f64),
    /// `lo:hi`, inclusive
    Range(f64, f64),
}

impl Axis {
    /// Compare against a measured value rounded to whole pixels
    pub fn matches(&self, measured: f64) -> bool {
        let value = measured.round();
        match *self {
            Axis::Any => true,
            Axis::Exact(expected) => value == expected.round(),
            Axis::Range(lo, hi) => value >= lo.min(hi) && value <= hi.max(lo),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Any => f.write_str("*"),
            Axis::Exact(v) => f.write_str(&format_number(*v)),
            Axis::Range(lo, hi) => write!(f, "{}:{}", format_number(*lo), format_number(*hi)),
        }
    }
}

/// Two-axis expectation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisPair(pub Axis, pub Axis);

impl AxisPair {
    pub fn check_position(&self, rect: &Rect) -> Result<(), String> {
        self.check("at", rect.x, rect.y)
    }

    pub fn check_size(&self, rect: &Rect) -> Result<(), String> {
        self.check("size", rect.width, rect.height)
    }

    fn check(&self, what: &str, a: f64, b: f64) -> Result<(), String> {
        if self.0.matches(a) && self.1.matches(b) {
            Ok(())
        } else {
            Err(format!(
                "expected {} {},{} but was {},{}",
                what,
                self.0,
                self.1,
                format_number(a.round()),
                format_number(b.round())
            ))
        }
    }
}
