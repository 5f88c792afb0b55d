//! Filter creation form.
//!
//! [`FilterDraft`] holds the fields the way an operator enters them and
//! [`FilterDraft::build`] runs the transcoding pipeline in its one lossless
//! order: percent escapes are decoded first, the submission wrapper is
//! applied to the recovered bytes, and transport encoding runs last.
//! Wrapping before decoding would corrupt escapes sitting at the pattern
//! edges.

use thiserror::Error;

use {
    rexwall_codec::{self as codec, MatchKind},
    rexwall_protocol::{FilterAddRequest, Polarity, TrafficDirection},
};

pub type Result<T> = std::result::Result<T, FormError>;

/// Validation failure attributable to the pattern field.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("a pattern is required")]
    EmptyPattern,

    /// Percent-escape input that does not parse.
    #[error(transparent)]
    Escape(#[from] codec::Error),

    /// Pattern text the regex engine rejects.
    #[error("invalid regex")]
    InvalidSyntax,
}

/// User-entered fields for a new filter, before any transcoding.
#[derive(Debug, Clone)]
pub struct FilterDraft {
    /// Pattern text exactly as typed.
    pub pattern: String,
    pub direction: TrafficDirection,
    pub polarity: Polarity,
    /// Submit the pattern verbatim instead of wrapping it in `.*`.
    pub exact: bool,
    /// Interpret `%xx` escapes in the pattern text.
    pub percent_escapes: bool,
    /// Create the filter enabled.
    pub active: bool,
    pub case_sensitive: bool,
    /// Check that the pattern compiles before submission.
    pub validate: bool,
}

impl Default for FilterDraft {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            direction: TrafficDirection::Both,
            polarity: Polarity::Blacklist,
            exact: false,
            percent_escapes: false,
            active: true,
            case_sensitive: true,
            validate: true,
        }
    }
}

impl FilterDraft {
    /// Turn the draft into a submission request for `service_id`.
    pub fn build(&self, service_id: &str) -> Result<FilterAddRequest> {
        if self.pattern.is_empty() {
            return Err(FormError::EmptyPattern);
        }
        if self.validate && !codec::validate_syntax(&self.pattern) {
            return Err(FormError::InvalidSyntax);
        }
        let raw = if self.percent_escapes {
            codec::parse_display(&self.pattern)?
        } else {
            self.pattern.clone().into_bytes()
        };
        let kind = if self.exact {
            MatchKind::Exact
        } else {
            MatchKind::Find
        };
        let wrapped = codec::wrap_for_submission(&raw, kind);
        Ok(FilterAddRequest {
            service_id: service_id.to_owned(),
            pattern: codec::encode(&wrapped),
            direction: self.direction,
            is_blacklist: self.polarity.is_blacklist(),
            active: self.active,
            is_case_sensitive: self.case_sensitive,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(pattern: &str) -> FilterDraft {
        FilterDraft {
            pattern: pattern.to_owned(),
            ..FilterDraft::default()
        }
    }

    #[test]
    fn plain_pattern_is_wrapped_and_encoded() {
        let request = draft("A=").build("sshd").unwrap();
        assert_eq!(request.pattern, codec::encode(b".*A=.*"));
        assert_eq!(request.service_id, "sshd");
        assert_eq!(request.direction, TrafficDirection::Both);
        assert!(request.is_blacklist);
        assert!(request.active);
        assert!(request.is_case_sensitive);
    }

    #[test]
    fn exact_pattern_is_encoded_verbatim() {
        let mut form = draft("A=");
        form.exact = true;
        let request = form.build("sshd").unwrap();
        assert_eq!(request.pattern, codec::encode(b"A="));
    }

    #[test]
    fn percent_escapes_decode_before_wrapping() {
        let mut form = draft("%01%02");
        form.percent_escapes = true;
        let request = form.build("sshd").unwrap();
        // The wrapper must surround the decoded bytes, not the escape text.
        assert_eq!(
            codec::decode(&request.pattern).unwrap(),
            b".*\x01\x02.*"
        );
    }

    #[test]
    fn decoded_escapes_round_trip_to_display() {
        let mut form = draft("%01%02");
        form.percent_escapes = true;
        form.exact = true;
        let request = form.build("sshd").unwrap();
        assert_eq!(
            codec::transport_to_display(&request.pattern).unwrap(),
            "%01%02"
        );
    }

    #[test]
    fn empty_pattern_is_field_error() {
        assert!(matches!(
            draft("").build("sshd"),
            Err(FormError::EmptyPattern)
        ));
    }

    #[test]
    fn broken_syntax_is_rejected_unless_validation_is_off() {
        assert!(matches!(
            draft("f(lag").build("sshd"),
            Err(FormError::InvalidSyntax)
        ));

        let mut unchecked = draft("f(lag");
        unchecked.validate = false;
        assert!(unchecked.build("sshd").is_ok());
    }

    #[test]
    fn broken_escapes_are_field_errors() {
        let mut form = draft("%zz");
        form.percent_escapes = true;
        assert!(matches!(
            form.build("sshd"),
            Err(FormError::Escape(codec::Error::BadEscape { position: 0 }))
        ));
    }

    #[test]
    fn polarity_and_direction_flow_through() {
        let mut form = draft("flag");
        form.polarity = Polarity::Whitelist;
        form.direction = TrafficDirection::ServerToClient;
        let request = form.build("sshd").unwrap();
        assert!(!request.is_blacklist);
        assert_eq!(request.direction, TrafficDirection::ServerToClient);
    }
}
