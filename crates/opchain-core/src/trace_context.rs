//! W3C trace-context identifiers.
//!
//! Only the `traceparent` header is produced and understood:
//!
//! ```text
//! 00-<32 hex trace id>-<16 hex span id>-<2 hex flags>
//! ```

use std::fmt;

/// Name of the propagation header.
pub const TRACEPARENT: &str = "traceparent";

const SAMPLED_FLAG: u8 = 0x01;

/// Identifies one span within one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: u128,
    span_id: u64,
    sampled: bool,
}

impl SpanContext {
    /// Starts a new, sampled trace.
    pub fn new_root() -> Self {
        Self {
            trace_id: nonzero_u128(),
            span_id: nonzero_u64(),
            sampled: true,
        }
    }

    /// Builds a context from known identifiers. Zero ids are invalid.
    pub fn from_parts(trace_id: u128, span_id: u64, sampled: bool) -> Option<Self> {
        if trace_id == 0 || span_id == 0 {
            return None;
        }
        Some(Self {
            trace_id,
            span_id,
            sampled,
        })
    }

    /// Derives a child span: same trace, fresh span id.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: nonzero_u64(),
            sampled: self.sampled,
        }
    }

    /// Returns the 128-bit trace id.
    pub fn trace_id(&self) -> u128 {
        self.trace_id
    }

    /// Returns the 64-bit span id.
    pub fn span_id(&self) -> u64 {
        self.span_id
    }

    /// Returns the sampled flag.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Formats the context as a `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { SAMPLED_FLAG } else { 0 };
        format!("00-{:032x}-{:016x}-{:02x}", self.trace_id, self.span_id, flags)
    }

    /// Parses a `traceparent` header value.
    ///
    /// Returns `None` for malformed values, the reserved version `ff` and
    /// all-zero identifiers.
    pub fn from_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;

        if version.len() != 2 || version.eq_ignore_ascii_case("ff") {
            return None;
        }
        // Version 00 has exactly four fields; later versions may append more.
        if version == "00" && parts.next().is_some() {
            return None;
        }
        if trace_id.len() != 32 || span_id.len() != 16 || flags.len() != 2 {
            return None;
        }

        let trace_id = u128::from_str_radix(trace_id, 16).ok()?;
        let span_id = u64::from_str_radix(span_id, 16).ok()?;
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Self::from_parts(trace_id, span_id, flags & SAMPLED_FLAG != 0)
    }
}

impl fmt::Display for SpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

fn nonzero_u128() -> u128 {
    loop {
        let id: u128 = rand::random();
        if id != 0 {
            return id;
        }
    }
}

fn nonzero_u64() -> u64 {
    loop {
        let id: u64 = rand::random();
        if id != 0 {
            return id;
        }
    }
}
