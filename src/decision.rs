//! Classification results.

use std::borrow::Cow;
use std::fmt;

/// Why a value was allowed or denied.
///
/// The set is closed: [`Classification::is_allowed`] matches exhaustively, so a
/// new variant cannot be added without deciding which side it falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Matched an explicit allow rule.
    AllowedUserAcl,
    /// No rule matched and the dimension defaults to allow.
    AllowedDefault,
    /// Matched an explicit deny rule, or a hard policy violation.
    DeniedUserAcl,
    /// No rule matched and the dimension defaults to deny.
    DeniedDefault,
    /// Address is in a private or reserved range and private ranges are denied.
    DeniedPrivateRange,
}

impl Classification {
    pub const fn is_allowed(self) -> bool {
        match self {
            Classification::AllowedUserAcl | Classification::AllowedDefault => true,
            Classification::DeniedUserAcl
            | Classification::DeniedDefault
            | Classification::DeniedPrivateRange => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Classification::AllowedUserAcl => "AllowedUserAcl",
            Classification::AllowedDefault => "AllowedDefault",
            Classification::DeniedUserAcl => "DeniedUserAcl",
            Classification::DeniedDefault => "DeniedDefault",
            Classification::DeniedPrivateRange => "DeniedPrivateRange",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of classifying one dimension of a request.
///
/// `allowed` is never stored; it is always derived from the classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    classification: Classification,
    details: Option<Cow<'static, str>>,
}

impl Decision {
    pub const fn new(classification: Classification) -> Self {
        Self {
            classification,
            details: None,
        }
    }

    pub fn with_details(
        classification: Classification,
        details: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            classification,
            details: Some(details.into()),
        }
    }

    pub const fn classification(&self) -> Classification {
        self.classification
    }

    pub const fn allowed(&self) -> bool {
        self.classification.is_allowed()
    }

    /// Free-text reason, set only on deny paths that need disambiguation.
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl From<Classification> for Decision {
    fn from(classification: Classification) -> Self {
        Self::new(classification)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.classification, details),
            None => write!(f, "{}", self.classification),
        }
    }
}
