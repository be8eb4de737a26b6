//! Deterministic genesis synthesis (C3) and the opaque aesthetic/naming
//! tables it draws from.

pub mod palette;
pub mod synth;
pub mod tarot;
