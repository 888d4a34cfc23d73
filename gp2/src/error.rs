// Copyright 2026 The GP2 Project Developers

use std::fmt;

use colored::Colorize;

use crate::check::Diagnostic;

/// A failed compilation: the collected check errors.
#[derive(Debug)]
pub enum Error {
    Check(Vec<Diagnostic>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check(diagnostics) => {
                for (position, d) in diagnostics.iter().enumerate() {
                    if position > 0 {
                        writeln!(f)?;
                    }
                    let at = format!("[{}: {}]", d.declaration, d.item);
                    write!(
                        f,
                        "{}: {}\n{}",
                        "error".bright_red(),
                        d.message.bright_white().bold(),
                        at.bright_red(),
                    )?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}
