//! `label: value` lines on stdout
//!
//! Labels are a stable contract for scripts consuming the output. Logging
//! stays on stderr through `tracing`.

use crate::units::format_units;
use crate::Result;
use alloy::primitives::U256;
use std::fmt::Display;
use std::io::Write;

pub struct Console<W> {
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn field(&mut self, label: &str, value: impl Display) -> Result<()> {
        writeln!(self.out, "{}: {}", label, value)?;
        Ok(())
    }

    /// Label on its own line, then the value as indented JSON.
    pub fn json(&mut self, label: &str, value: &serde_json::Value) -> Result<()> {
        writeln!(self.out, "{}:", label)?;
        writeln!(self.out, "{}", serde_json::to_string_pretty(value)?)?;
        Ok(())
    }

    /// Integer amount under `<label>_wei`-style label, display string under `display_label`.
    pub fn amount(
        &mut self,
        raw_label: &str,
        display_label: &str,
        value: U256,
        decimals: u8,
    ) -> Result<()> {
        self.field(raw_label, value)?;
        self.field(display_label, format_units(value, decimals)?)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
