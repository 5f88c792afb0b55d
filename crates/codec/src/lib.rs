//! Pattern transcoding for rexwall filters.
//!
//! A filter pattern is a byte sequence, not text: operators filter on
//! arbitrary payload bytes, non-printable ones included. Three
//! representations cover a pattern's lifecycle:
//!
//! - **raw bytes**: what the matching engine actually runs on;
//! - **transport form**: base64 of the raw bytes, the only form the HTTP
//!   API carries ([`encode`] / [`decode`]);
//! - **display form**: percent-escaped text for humans ([`to_display`] /
//!   [`parse_display`]).
//!
//! [`classify`] and [`wrap_for_submission`] translate between the stored
//! pattern and the find/exact editing convention, and [`validate_syntax`]
//! checks pattern text compiles without running a match.

pub mod display;
pub mod error;
pub mod pattern;
pub mod transport;

pub use {
    display::{is_display_literal, parse_display, to_display, transport_to_display},
    error::{Error, Result},
    pattern::{MatchKind, classify, validate_syntax, wrap_for_submission},
    transport::{decode, encode},
};
