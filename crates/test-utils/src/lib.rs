//! Fixtures and helpers shared by the frame rendering tests.
//!
//! - Region, time, timetable and gridded dataset fixtures
//! - Field value generators
//! - Font lookup, with [`require_test_fonts!`] to skip text tests on
//!   machines without DejaVu installed
//! - [`assert_approx_eq!`] for angles and scaled lengths

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Regular and optional bold test font paths, or return from the test when
/// the fonts are not installed.
///
/// ```ignore
/// let (regular, bold) = require_test_fonts!();
/// let typeface = Typeface::load(Some(&regular), bold.as_deref()).unwrap();
/// ```
#[macro_export]
macro_rules! require_test_fonts {
    () => {{
        match $crate::find_test_fonts() {
            Some(fonts) => fonts,
            None => {
                eprintln!(
                    "SKIPPED: {} not found. Install DejaVu fonts or set TEST_DATA_DIR.",
                    $crate::TEST_FONT
                );
                return;
            }
        }
    }};
}

/// Assert two numbers differ by at most `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left as f64;
        let right = $right as f64;
        let diff = (left - right).abs();
        if diff > $epsilon as f64 {
            panic!(
                "assertion failed: {} is not within {} of {} (diff {})",
                left, $epsilon, right, diff
            );
        }
    }};
}
