//! Runtime support for compiled GP 2 programs.
//!
//! Generated rule modules link against this crate for the label algebra,
//! the host graph, the morphism, and the undo trail. Everything here is
//! single-threaded by design: matching is deterministic given the search
//! plan and the host's documented iteration orders, and that determinism
//! would not survive shared-memory concurrency.

pub use error::HostError;

pub mod engine;
pub mod error;
pub mod graph;
pub mod host;
pub mod label;
pub mod morphism;
pub mod trail;

/// Process exit code for a program that terminated successfully.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for a program-level `fail` at the top level.
pub const EXIT_FAIL: i32 = 1;
/// Process exit code for internal errors (bad input, fatal evaluation).
pub const EXIT_INTERNAL: i32 = 2;

/// Abort the generated program on a fatal runtime condition.
pub fn runtime_error(message: &str) -> ! {
    eprintln!("runtime error: {}", message);
    std::process::exit(EXIT_INTERNAL);
}

/// Integer division as used in generated label evaluation. GP 2 has no
/// defined result for division by zero; it is a fatal condition.
pub fn div(dividend: i64, divisor: i64) -> i64 {
    if divisor == 0 {
        runtime_error("division by zero");
    }
    dividend / divisor
}

/// The arm chosen by `P or Q`: a uniform coin flip.
pub fn coin_flip() -> bool {
    rand::random::<bool>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_of_nonzero() {
        assert_eq!(div(7, 2), 3);
        assert_eq!(div(-7, 2), -3);
    }
}
