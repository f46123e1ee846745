//! Business punch-exception catalog.
//!
//! The remote service answers some swipes with a punch-exception code: a
//! definitive "no" that must be shown to the employee in both languages the
//! kiosk displays. These are not faults and are never queued or retried.

/// Punch-exception code the throttle keys on.
pub const NOT_AUTHORIZED: i32 = 2;

/// How prominently the kiosk surfaces a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bilingual rejection message with its severity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionMessage {
    pub english: &'static str,
    pub spanish: &'static str,
    pub severity: Severity,
}

const DEFAULT: ExceptionMessage = ExceptionMessage {
    english: "Not Authorized. No punch recorded.",
    spanish: "No Authorizado. No registro realizado.",
    severity: Severity::Error,
};

/// Look up the message pair for a punch-exception code.
///
/// Unknown codes fall back to the generic not-authorized message.
pub const fn lookup(code: i32) -> ExceptionMessage {
    match code {
        1 => ExceptionMessage {
            english: "Shift not yet started. No punch recorded.",
            spanish: "Turno no ha iniciado. No registro realizado.",
            severity: Severity::Warning,
        },
        3 => ExceptionMessage {
            english: "Shift has finished. No punch recorded.",
            spanish: "Turno ha finalizado. No registro realizado.",
            severity: Severity::Warning,
        },
        _ => DEFAULT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_distinct_messages() {
        assert_eq!(
            lookup(1).english,
            "Shift not yet started. No punch recorded."
        );
        assert_eq!(lookup(3).english, "Shift has finished. No punch recorded.");
        assert_eq!(lookup(1).severity, Severity::Warning);
        assert_eq!(lookup(3).severity, Severity::Warning);
    }

    #[test]
    fn not_authorized_is_an_error() {
        let msg = lookup(NOT_AUTHORIZED);
        assert_eq!(msg.english, "Not Authorized. No punch recorded.");
        assert_eq!(msg.severity, Severity::Error);
    }

    #[test]
    fn unknown_code_falls_back_to_not_authorized() {
        assert_eq!(lookup(99), lookup(NOT_AUTHORIZED));
        assert_eq!(lookup(-7), lookup(NOT_AUTHORIZED));
    }

    #[test]
    fn both_languages_present_for_every_known_code() {
        for code in [1, 2, 3, 42] {
            let msg = lookup(code);
            assert!(!msg.english.is_empty());
            assert!(!msg.spanish.is_empty());
        }
    }
}
