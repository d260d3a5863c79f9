//! Clientele Test Utilities
//!
//! Shared test infrastructure for the Clientele workspace:
//! - Proptest generators for users, clients and cache settings
//! - Fixtures for the client tiers and a seeded in-memory store pair
//! - Assertions for Clientele error variants

// Re-export the mock store from its source crate
pub use clientele_storage::{ManualClock, MockStore, StoreCalls};

// Re-export core types for convenience
pub use clientele_core::{
    CacheSettings, Client, ClientId, ClienteleConfig, ClienteleError, ClienteleResult,
    ConfigError, DomainError, EntityIdType, EntityType, StorageError, User, UserId,
};

use chrono::NaiveDate;
use std::time::Duration;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Clientele entity types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    // === Identity Type Generators ===

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a random UserId.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    /// Generate a random ClientId.
    pub fn arb_client_id() -> impl Strategy<Value = ClientId> {
        arb_uuid().prop_map(ClientId::new)
    }

    // === Entity Generators ===

    /// Generate a client name, biased towards the two named tiers.
    pub fn arb_client_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("VeryImportantClient".to_string()),
            Just("ImportantClient".to_string()),
            "[A-Z][a-z]{2,12}",
        ]
    }

    /// Generate a client.
    pub fn arb_client() -> impl Strategy<Value = Client> {
        (arb_client_id(), arb_client_name()).prop_map(|(id, name)| Client { id, name })
    }

    /// Generate an already-normalized (lowercase) email address.
    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9.]{0,10}", "[a-z]{2,8}")
            .prop_map(|(local, domain)| format!("{local}@{domain}.com"))
    }

    /// Generate a plausible date of birth between 1930 and 2020.
    pub fn arb_date_of_birth() -> impl Strategy<Value = NaiveDate> {
        (1930i32..=2020, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN))
    }

    /// Generate a user registered under `client`.
    pub fn arb_user(client: Client) -> impl Strategy<Value = User> {
        (
            arb_user_id(),
            "[A-Z][a-z]{1,10}",
            "[A-Z][a-z]{1,12}",
            arb_email(),
            arb_date_of_birth(),
            proptest::option::of(1u64..100_000),
        )
            .prop_map(move |(id, firstname, surname, email, date_of_birth, limit)| User {
                id,
                firstname,
                surname,
                email,
                date_of_birth,
                client: client.clone(),
                has_credit_limit: limit.is_some(),
                credit_limit: limit,
            })
    }

    /// Generate cache settings that pass validation.
    pub fn arb_cache_settings() -> impl Strategy<Value = CacheSettings> {
        (1u64..3600, 1usize..200, 1usize..20, proptest::option::of(1u64..600)).prop_map(
            |(ttl, item_limit, collection_item_limit, sweep)| CacheSettings {
                ttl: Duration::from_secs(ttl),
                item_limit,
                collection_item_limit,
                sweep_interval: sweep.map(Duration::from_secs),
            },
        )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Fixed "today" used by date-sensitive tests.
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or(NaiveDate::MIN)
    }

    /// A date of birth that is comfortably over the minimum age on [`today`].
    pub fn adult_date_of_birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Create a client with a fresh id.
    pub fn client(name: &str) -> Client {
        Client {
            id: ClientId::now_v7(),
            name: name.to_string(),
        }
    }

    /// Client in the unlimited-credit tier.
    pub fn very_important_client() -> Client {
        client("VeryImportantClient")
    }

    /// Client in the doubled-limit tier.
    pub fn important_client() -> Client {
        client("ImportantClient")
    }

    /// Client in the default tier.
    pub fn ordinary_client() -> Client {
        client("OrdinaryClient")
    }

    /// Create a user under `client` with the default credit limit.
    pub fn user(email: &str, client: &Client) -> User {
        User {
            id: UserId::now_v7(),
            firstname: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: email.to_string(),
            date_of_birth: adult_date_of_birth(),
            client: client.clone(),
            has_credit_limit: true,
            credit_limit: Some(10_000),
        }
    }

    /// Small cache settings with no sweeper.
    pub fn small_cache_settings() -> CacheSettings {
        CacheSettings {
            ttl: Duration::from_secs(60),
            item_limit: 8,
            collection_item_limit: 2,
            sweep_interval: None,
        }
    }

    /// A client store seeded with one client per tier, in tier order.
    pub fn seeded_client_store() -> (MockStore<Client>, Vec<Client>) {
        let clients = vec![
            very_important_client(),
            important_client(),
            ordinary_client(),
        ];
        (MockStore::with_records(clients.clone()), clients)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Clientele error variants.

    use super::*;

    /// Assert that a ClienteleResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ClienteleResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a ClienteleResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &ClienteleResult<T>) {
        match result {
            Err(ClienteleError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }

    /// Assert that a ClienteleResult is a WriteFailed storage error.
    #[track_caller]
    pub fn assert_write_failed<T: std::fmt::Debug>(
        result: &ClienteleResult<T>,
        entity_type: EntityType,
    ) {
        match result {
            Err(ClienteleError::Storage(StorageError::WriteFailed { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in WriteFailed error");
            }
            other => panic!("Expected WriteFailed error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a ClienteleResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &ClienteleResult<T>) {
        match result {
            Err(ClienteleError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a ClienteleResult is exactly the given domain error.
    #[track_caller]
    pub fn assert_domain_error<T: std::fmt::Debug>(
        result: &ClienteleResult<T>,
        expected: DomainError,
    ) {
        match result {
            Err(ClienteleError::Domain(actual)) => assert_eq!(*actual, expected),
            other => panic!("Expected Domain error {:?}, got: {:?}", expected, other),
        }
    }

    /// Assert the credit terms of a user.
    #[track_caller]
    pub fn assert_credit(user: &User, has_credit_limit: bool, credit_limit: Option<u64>) {
        assert_eq!(
            (user.has_credit_limit, user.credit_limit),
            (has_credit_limit, credit_limit),
            "Unexpected credit terms for client {:?}",
            user.client.name
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
