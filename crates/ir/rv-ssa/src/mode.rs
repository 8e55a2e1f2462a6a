//! Builder configuration flags

use crate::error::ModeError;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Options controlling IR construction.
    ///
    /// Written as a string of letters, e.g. `"CD"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BuilderMode: u16 {
        /// Log packages as they are built
        const PRINT_PACKAGES = 1 << 0;
        /// Log functions as they are built
        const PRINT_FUNCTIONS = 1 << 1;
        /// Log source locations while building
        const LOG_SOURCE = 1 << 2;
        /// Check invariants of every finished function
        const SANITY_CHECK_FUNCTIONS = 1 << 3;
        /// Keep locals in memory instead of registers.
        ///
        /// Accepted for compatibility with mode strings; bodies are lowered
        /// by hand here, so the flag does not change the IR.
        const NAIVE_FORM = 1 << 4;
        /// Build packages one at a time.
        ///
        /// Accepted for compatibility with mode strings; packages are never
        /// built concurrently, so the flag has no effect.
        const BUILD_SERIALLY = 1 << 5;
        /// Record debug references in every package
        const GLOBAL_DEBUG = 1 << 6;
    }
}

const LETTERS: [(char, BuilderMode); 7] = [
    ('D', BuilderMode::GLOBAL_DEBUG),
    ('P', BuilderMode::PRINT_PACKAGES),
    ('F', BuilderMode::PRINT_FUNCTIONS),
    ('S', BuilderMode::LOG_SOURCE),
    ('C', BuilderMode::SANITY_CHECK_FUNCTIONS),
    ('N', BuilderMode::NAIVE_FORM),
    ('L', BuilderMode::BUILD_SERIALLY),
];

impl FromStr for BuilderMode {
    type Err = ModeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut mode = Self::empty();
        for flag in input.chars() {
            let (_, bit) = LETTERS
                .iter()
                .find(|(letter, _)| *letter == flag)
                .ok_or_else(|| ModeError {
                    flag,
                    input: input.to_string(),
                })?;
            mode |= *bit;
        }
        Ok(mode)
    }
}

impl fmt::Display for BuilderMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, bit) in LETTERS {
            if self.contains(bit) {
                write!(formatter, "{letter}")?;
            }
        }
        Ok(())
    }
}
