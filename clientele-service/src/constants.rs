//! Business constants for user registration.

// ============================================================================
// AGE
// ============================================================================

/// Minimum age, in whole years, to register a user.
pub const MINIMUM_AGE: u32 = 21;

// ============================================================================
// CREDIT
// ============================================================================

/// Credit limit granted to users of ordinary clients.
pub const DEFAULT_CREDIT_LIMIT: u64 = 10_000;

/// Multiplier applied to the default limit for important clients.
pub const IMPORTANT_MULTIPLIER: u64 = 2;

/// Client name whose users get no credit limit.
pub const VERY_IMPORTANT_CLIENT: &str = "VeryImportantClient";

/// Client name whose users get a doubled credit limit.
pub const IMPORTANT_CLIENT: &str = "ImportantClient";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_important_limit_is_doubled_default() {
        assert_eq!(DEFAULT_CREDIT_LIMIT * IMPORTANT_MULTIPLIER, 20_000);
    }
}
