//! User Service
//!
//! Registration rules and lookups for users, served through the cached
//! user and client repositories.

use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use clientele_core::{
    Client, ClientId, ClienteleResult, CreditDetails, DomainError, EntityIdType, User, UserId,
};
use clientele_storage::{ClientCache, EntityStore, UserCache};

use crate::constants::{
    DEFAULT_CREDIT_LIMIT, IMPORTANT_CLIENT, IMPORTANT_MULTIPLIER, MINIMUM_AGE,
    VERY_IMPORTANT_CLIENT,
};

/// Registration request for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub client_id: ClientId,
}

/// Whole years between `date_of_birth` and `today`.
///
/// Returns `None` when the date of birth lies after `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if date_of_birth > today {
        return None;
    }
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Credit terms for users registered under `client`.
pub fn credit_details_for(client: &Client) -> CreditDetails {
    match client.name.as_str() {
        VERY_IMPORTANT_CLIENT => CreditDetails::unlimited(),
        IMPORTANT_CLIENT => CreditDetails::limited(DEFAULT_CREDIT_LIMIT * IMPORTANT_MULTIPLIER),
        _ => CreditDetails::limited(DEFAULT_CREDIT_LIMIT),
    }
}

type DateSource = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// User registration and lookup over cached repositories.
pub struct UserService<US, CS>
where
    US: EntityStore<User>,
    CS: EntityStore<Client>,
{
    users: UserCache<US>,
    clients: ClientCache<CS>,
    today: DateSource,
}

impl<US, CS> fmt::Debug for UserService<US, CS>
where
    US: EntityStore<User>,
    CS: EntityStore<Client>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserService")
            .field("users", &self.users.record_stats())
            .field("clients", &self.clients.record_stats())
            .finish_non_exhaustive()
    }
}

impl<US, CS> UserService<US, CS>
where
    US: EntityStore<User>,
    CS: EntityStore<Client>,
{
    /// Create a service over the given caches, using the UTC calendar date
    /// for age checks.
    pub fn new(users: UserCache<US>, clients: ClientCache<CS>) -> Self {
        Self {
            users,
            clients,
            today: Arc::new(|| Utc::now().date_naive()),
        }
    }

    /// Replace the source of "today" used for age checks.
    pub fn with_date_source(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    /// Get the user cache.
    pub fn users(&self) -> &UserCache<US> {
        &self.users
    }

    /// Get the client cache.
    pub fn clients(&self) -> &ClientCache<CS> {
        &self.clients
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `DomainError::InvalidDateOfBirth` if the date of birth is in the future
    /// - `DomainError::Underage` if the user is younger than the minimum age
    /// - `DomainError::EmailTaken` if another user has the same email
    /// - `DomainError::ClientNotFound` if the client does not exist
    /// - any storage error raised while writing
    pub async fn add_user(&self, new_user: NewUser) -> ClienteleResult<User> {
        let email = new_user.email.trim().to_lowercase();

        let age = age_on(new_user.date_of_birth, (self.today)()).ok_or(
            DomainError::InvalidDateOfBirth {
                date_of_birth: new_user.date_of_birth,
            },
        )?;
        if age < MINIMUM_AGE {
            tracing::debug!(age, "Rejected underage registration");
            return Err(DomainError::Underage {
                minimum_age: MINIMUM_AGE,
            }
            .into());
        }

        if self.users.find_by_alternate_key(&email).await?.is_some() {
            tracing::debug!(email = %email, "Rejected duplicate email");
            return Err(DomainError::EmailTaken { email }.into());
        }

        let client = self
            .clients
            .find_by_id(&new_user.client_id)
            .await?
            .ok_or_else(|| DomainError::ClientNotFound {
                client_id: new_user.client_id.to_string(),
            })?;

        let credit = credit_details_for(&client);
        let user = User {
            id: UserId::now_v7(),
            firstname: new_user.firstname.trim().to_string(),
            surname: new_user.surname.trim().to_string(),
            email,
            date_of_birth: new_user.date_of_birth,
            client,
            has_credit_limit: credit.has_credit_limit,
            credit_limit: credit.credit_limit,
        };

        let saved = self.users.create(user).await?;
        tracing::info!(
            user_id = %saved.id,
            client = %saved.client.name,
            has_credit_limit = saved.has_credit_limit,
            "User registered"
        );
        Ok(saved)
    }

    /// Replace a stored user.
    ///
    /// # Errors
    /// Returns `DomainError::UserNotFound` if no user has that id.
    pub async fn update_user(&self, user: User) -> ClienteleResult<User> {
        let user_id = user.id;
        self.users.update(user).await?.ok_or_else(|| {
            DomainError::UserNotFound {
                user_id: user_id.to_string(),
            }
            .into()
        })
    }

    /// List every user.
    pub async fn get_all_users(&self) -> ClienteleResult<Vec<User>> {
        self.users.find_all().await
    }

    /// Look up a user by email. A blank email finds nothing.
    pub async fn get_user_by_email(&self, email: &str) -> ClienteleResult<Option<User>> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        self.users.find_by_alternate_key(email).await
    }

    pub async fn get_user_by_id(&self, id: &UserId) -> ClienteleResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    /// List every client.
    pub async fn get_all_clients(&self) -> ClienteleResult<Vec<Client>> {
        self.clients.find_all().await
    }

    pub async fn get_client_by_id(&self, id: &ClientId) -> ClienteleResult<Option<Client>> {
        self.clients.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clientele_core::{CacheSettings, ClienteleError};
    use clientele_storage::{EntityCache, MockStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(name: &str) -> Client {
        Client {
            id: ClientId::now_v7(),
            name: name.to_string(),
        }
    }

    fn service(
        clients: Vec<Client>,
    ) -> UserService<MockStore<User>, MockStore<Client>> {
        let settings = CacheSettings::default();
        let users = EntityCache::from_settings(Arc::new(MockStore::new()), &settings).unwrap();
        let clients =
            EntityCache::from_settings(Arc::new(MockStore::with_records(clients)), &settings)
                .unwrap();
        UserService::new(users, clients).with_date_source(|| date(2024, 6, 15))
    }

    fn request(email: &str, date_of_birth: NaiveDate, client_id: ClientId) -> NewUser {
        NewUser {
            firstname: "  John ".to_string(),
            surname: " Doe".to_string(),
            email: email.to_string(),
            date_of_birth,
            client_id,
        }
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = date(2003, 6, 15);
        assert_eq!(age_on(dob, date(2024, 6, 14)), Some(20));
        assert_eq!(age_on(dob, date(2024, 6, 15)), Some(21));
        assert_eq!(age_on(dob, date(2024, 7, 1)), Some(21));
        assert_eq!(age_on(dob, dob), Some(0));
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 6, 15)), None);
    }

    #[test]
    fn test_credit_details_by_tier() {
        assert_eq!(
            credit_details_for(&client("VeryImportantClient")),
            CreditDetails::unlimited()
        );
        assert_eq!(
            credit_details_for(&client("ImportantClient")),
            CreditDetails::limited(20_000)
        );
        assert_eq!(
            credit_details_for(&client("Anyone")),
            CreditDetails::limited(10_000)
        );
        // Tier names are matched exactly.
        assert_eq!(
            credit_details_for(&client("importantclient")),
            CreditDetails::limited(10_000)
        );
    }

    #[tokio::test]
    async fn test_add_user_normalizes_and_applies_credit() {
        let important = client("ImportantClient");
        let svc = service(vec![important.clone()]);

        let user = svc
            .add_user(request(" John.Doe@Example.COM ", date(1990, 1, 1), important.id))
            .await
            .unwrap();

        assert_eq!(user.firstname, "John");
        assert_eq!(user.surname, "Doe");
        assert_eq!(user.email, "john.doe@example.com");
        assert_eq!(user.client, important);
        assert!(user.has_credit_limit);
        assert_eq!(user.credit_limit, Some(20_000));
    }

    #[tokio::test]
    async fn test_add_user_rejects_underage() {
        let c = client("Anyone");
        let svc = service(vec![c.clone()]);

        let err = svc
            .add_user(request("young@example.com", date(2003, 6, 16), c.id))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClienteleError::Domain(DomainError::Underage { minimum_age: 21 })
        );
        assert_eq!(svc.users().store().calls().create, 0);
    }

    #[tokio::test]
    async fn test_add_user_accepts_exactly_minimum_age() {
        let c = client("Anyone");
        let svc = service(vec![c.clone()]);

        let user = svc
            .add_user(request("birthday@example.com", date(2003, 6, 15), c.id))
            .await
            .unwrap();
        assert_eq!(user.date_of_birth, date(2003, 6, 15));
    }

    #[tokio::test]
    async fn test_add_user_rejects_future_date_of_birth() {
        let c = client("Anyone");
        let svc = service(vec![c.clone()]);

        let err = svc
            .add_user(request("future@example.com", date(2025, 1, 1), c.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClienteleError::Domain(DomainError::InvalidDateOfBirth { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_user_rejects_duplicate_email_case_insensitively() {
        let c = client("Anyone");
        let svc = service(vec![c.clone()]);
        svc.add_user(request("dup@example.com", date(1990, 1, 1), c.id))
            .await
            .unwrap();

        let err = svc
            .add_user(request("DUP@example.com", date(1985, 3, 3), c.id))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClienteleError::Domain(DomainError::EmailTaken {
                email: "dup@example.com".to_string()
            })
        );
        // The duplicate check was answered from cache.
        assert_eq!(svc.users().store().calls().find_by_alternate_key, 1);
    }

    #[tokio::test]
    async fn test_add_user_requires_client() {
        let svc = service(vec![]);
        let missing = ClientId::now_v7();

        let err = svc
            .add_user(request("lost@example.com", date(1990, 1, 1), missing))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClienteleError::Domain(DomainError::ClientNotFound {
                client_id: missing.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_update_user() {
        let c = client("VeryImportantClient");
        let svc = service(vec![c.clone()]);
        let mut user = svc
            .add_user(request("up@example.com", date(1990, 1, 1), c.id))
            .await
            .unwrap();

        user.surname = "Smith".to_string();
        let updated = svc.update_user(user.clone()).await.unwrap();
        assert_eq!(updated, user);
        assert_eq!(svc.get_user_by_id(&user.id).await.unwrap(), Some(user.clone()));

        let mut stranger = user;
        stranger.id = UserId::now_v7();
        let err = svc.update_user(stranger.clone()).await.unwrap_err();
        assert_eq!(
            err,
            ClienteleError::Domain(DomainError::UserNotFound {
                user_id: stranger.id.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_changed_email_can_be_registered_again() {
        let c = client("Anyone");
        let svc = service(vec![c.clone()]);
        let mut user = svc
            .add_user(request("first@example.com", date(1990, 1, 1), c.id))
            .await
            .unwrap();

        user.email = "second@example.com".to_string();
        svc.update_user(user.clone()).await.unwrap();

        let newcomer = svc
            .add_user(request("first@example.com", date(1988, 8, 8), c.id))
            .await
            .unwrap();
        assert_eq!(newcomer.email, "first@example.com");
        assert_ne!(newcomer.id, user.id);
        assert_eq!(
            svc.get_user_by_email("second@example.com").await.unwrap(),
            Some(user)
        );
    }

    #[tokio::test]
    async fn test_get_user_by_blank_email_skips_lookup() {
        let svc = service(vec![]);
        assert_eq!(svc.get_user_by_email("   ").await.unwrap(), None);
        assert_eq!(svc.users().store().calls().find_by_alternate_key, 0);
    }

    #[tokio::test]
    async fn test_client_lookups() {
        let a = client("A");
        let b = client("B");
        let svc = service(vec![a.clone(), b.clone()]);

        assert_eq!(svc.get_all_clients().await.unwrap(), vec![a.clone(), b]);
        assert_eq!(svc.get_client_by_id(&a.id).await.unwrap(), Some(a));
        assert_eq!(svc.get_client_by_id(&ClientId::now_v7()).await.unwrap(), None);
    }
}
