use tonic::Code;

/// Codes treated as success; `AlreadyExists` means an idempotent command already applied.
pub const SUCCESS_CODES: &[Code] = &[Code::Ok, Code::AlreadyExists];

/// Transient codes worth retrying.
pub const RETRIABLE_CODES: &[Code] = &[
    Code::Cancelled,
    Code::DeadlineExceeded,
    Code::ResourceExhausted,
    Code::Aborted,
    Code::Unavailable,
    Code::DataLoss,
];

/// The target is gone; the command's effect is moot.
pub const IGNORABLE_FAILURE_CODES: &[Code] = &[Code::NotFound];

/// Codes known to be permanent. Unlisted codes are fatal as well.
pub const FAILURE_CODES: &[Code] = &[
    Code::InvalidArgument,
    Code::PermissionDenied,
    Code::FailedPrecondition,
    Code::OutOfRange,
    Code::Unimplemented,
    Code::Internal,
    Code::Unauthenticated,
];

/// Classification of a remote status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOutcome {
    Success,
    IgnorableFailure,
    Retriable,
    Fatal,
}

impl CommandOutcome {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::IgnorableFailure => "ignorable_failure",
            Self::Retriable => "retriable",
            Self::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a status code.
pub fn classify(code: Code) -> CommandOutcome {
    if SUCCESS_CODES.contains(&code) {
        CommandOutcome::Success
    } else if IGNORABLE_FAILURE_CODES.contains(&code) {
        CommandOutcome::IgnorableFailure
    } else if RETRIABLE_CODES.contains(&code) {
        CommandOutcome::Retriable
    } else {
        CommandOutcome::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        assert_eq!(classify(Code::Ok), CommandOutcome::Success);
        assert_eq!(classify(Code::AlreadyExists), CommandOutcome::Success);
    }

    #[test]
    fn test_ignorable_codes() {
        assert_eq!(classify(Code::NotFound), CommandOutcome::IgnorableFailure);
    }

    #[test]
    fn test_retriable_codes() {
        for code in RETRIABLE_CODES {
            assert_eq!(classify(*code), CommandOutcome::Retriable, "{:?}", code);
        }
    }

    #[test]
    fn test_failure_and_unknown_codes_are_fatal() {
        for code in FAILURE_CODES {
            assert_eq!(classify(*code), CommandOutcome::Fatal, "{:?}", code);
        }
        assert_eq!(classify(Code::Unknown), CommandOutcome::Fatal);
    }

    #[test]
    fn test_code_sets_are_disjoint() {
        let sets = [
            SUCCESS_CODES,
            RETRIABLE_CODES,
            IGNORABLE_FAILURE_CODES,
            FAILURE_CODES,
        ];
        for (i, a) in sets.iter().enumerate() {
            for b in sets.iter().skip(i + 1) {
                assert!(a.iter().all(|code| !b.contains(code)));
            }
        }
    }
}
