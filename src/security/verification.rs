use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    MissingToken,
    TokenMismatch,
}

impl VerificationFailure {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingToken => "missing verification token",
            Self::TokenMismatch => "verification token mismatch",
        }
    }
}

/// Compares the token Slack echoes back in every payload with the one issued
/// for this app. No trimming is applied to the provided value.
pub fn verify_token(provided: Option<&str>, expected: &str) -> Result<(), VerificationFailure> {
    let Some(provided) = provided.filter(|value| !value.is_empty()) else {
        return Err(VerificationFailure::MissingToken);
    };

    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(VerificationFailure::TokenMismatch)
    }
}
