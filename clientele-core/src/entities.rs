//! Core entity structures

use crate::{ClientId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Client - the organisation a user is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

/// User - a registered person with their credit terms.
///
/// `client` is a copy of the client record taken when the user was created.
/// Later changes to the client are not reflected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub firstname: String,
    pub surname: String,
    /// Stored lowercased; doubles as the alternate lookup key.
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub client: Client,
    pub has_credit_limit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<u64>,
}

/// Credit terms derived from a client's tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDetails {
    pub has_credit_limit: bool,
    pub credit_limit: Option<u64>,
}

impl CreditDetails {
    /// No limit at all.
    pub fn unlimited() -> Self {
        Self {
            has_credit_limit: false,
            credit_limit: None,
        }
    }

    /// A fixed limit.
    pub fn limited(limit: u64) -> Self {
        Self {
            has_credit_limit: true,
            credit_limit: Some(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityIdType;

    fn make_user(credit_limit: Option<u64>) -> User {
        User {
            id: UserId::now_v7(),
            firstname: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            client: Client {
                id: ClientId::now_v7(),
                name: "ImportantClient".to_string(),
            },
            has_credit_limit: credit_limit.is_some(),
            credit_limit,
        }
    }

    #[test]
    fn test_user_serializes_camel_case() {
        let user = make_user(Some(20_000));
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["dateOfBirth"], "1990-01-01");
        assert_eq!(value["hasCreditLimit"], true);
        assert_eq!(value["creditLimit"], 20_000);
        assert_eq!(value["client"]["name"], "ImportantClient");
    }

    #[test]
    fn test_unlimited_user_omits_credit_limit() {
        let user = make_user(None);
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("creditLimit").is_none());

        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_credit_details_constructors() {
        assert_eq!(
            CreditDetails::unlimited(),
            CreditDetails {
                has_credit_limit: false,
                credit_limit: None
            }
        );
        assert_eq!(CreditDetails::limited(10_000).credit_limit, Some(10_000));
    }
}
