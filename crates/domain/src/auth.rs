//! User accounts: registration, credential checks and role-based test logins.

use common::{Role, UserId};
use pvz_store::{StoreError, User, UserStore};

use crate::error::DomainError;
use crate::password::{PASSWORD_COST, hash_password, verify_password};

pub(crate) const INVALID_ROLE: &str = "invalid role";
pub(crate) const INVALID_EMAIL: &str = "invalid email";
pub(crate) const EMPTY_PASSWORD: &str = "password must not be empty";
pub(crate) const EMAIL_TAKEN: &str = "email already exists";
pub(crate) const INVALID_CREDENTIALS: &str = "invalid email or password";

const DUMMY_PASSWORD: &str = "password";

/// Account service. Issues no tokens; the transport layer does that from the
/// returned [`User`].
pub struct AuthService<S: UserStore> {
    store: S,
    password_cost: u32,
}

impl<S: UserStore> AuthService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            password_cost: PASSWORD_COST,
        }
    }

    /// Overrides the bcrypt work factor for new password hashes.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an account.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User, DomainError> {
        let role = parse_role(role)?;
        let email = email.trim();
        if !is_plausible_email(email) {
            return Err(DomainError::validation(INVALID_EMAIL));
        }
        if password.is_empty() {
            return Err(DomainError::validation(EMPTY_PASSWORD));
        }

        let user = self.create(email, password, role).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Checks credentials. Unknown e-mail and wrong password are
    /// indistinguishable to the caller.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, DomainError> {
        let invalid = || DomainError::Unauthorized(INVALID_CREDENTIALS.to_string());
        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(invalid)?;

        let candidate = password.to_owned();
        let stored = user.password_hash.clone();
        let matches = blocking(move || Ok(verify_password(&candidate, &stored))).await?;
        if !matches {
            return Err(invalid());
        }

        tracing::debug!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Returns some user holding `role`, creating a placeholder account the
    /// first time a role is requested.
    #[tracing::instrument(skip(self))]
    pub async fn dummy_login(&self, role: &str) -> Result<User, DomainError> {
        let role = parse_role(role)?;

        if let Some(user) = self.store.find_user_by_role(role).await? {
            return Ok(user);
        }

        match self.create(&dummy_email(role), DUMMY_PASSWORD, role).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, %role, "placeholder user created");
                Ok(user)
            }
            // Another request created it first.
            Err(DomainError::Conflict(_)) => self
                .store
                .find_user_by_role(role)
                .await?
                .ok_or_else(|| DomainError::Internal(format!("no {role} user after conflict"))),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, email: &str, password: &str, role: Role) -> Result<User, DomainError> {
        let plain = password.to_owned();
        let cost = self.password_cost;
        let password_hash = blocking(move || hash_password(&plain, cost)).await?;
        let id = UserId::new();

        self.store
            .create_user(id, email, &password_hash, role)
            .await
            .map_err(|e| match e {
                StoreError::EmailTaken(_) => DomainError::conflict(EMAIL_TAKEN),
                other => DomainError::Store(other),
            })?;

        self.store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("user {id} missing after insert")))
    }
}

/// Runs bcrypt off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("password task failed: {e}")))?
}

fn parse_role(raw: &str) -> Result<Role, DomainError> {
    raw.parse().map_err(|_| DomainError::validation(INVALID_ROLE))
}

fn dummy_email(role: Role) -> String {
    format!("dummy-{role}@example.com")
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use pvz_store::InMemoryStore;

    use super::*;
    use crate::password::MIN_PASSWORD_COST;

    fn service() -> AuthService<InMemoryStore> {
        AuthService::new(InMemoryStore::new()).with_password_cost(MIN_PASSWORD_COST)
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();
        let registered = auth
            .register("worker@example.com", "s3cret", "employee")
            .await
            .unwrap();
        assert_eq!(registered.role, Role::Employee);
        assert!(registered.password_hash.starts_with("$2b$04$"));

        let logged_in = auth.login("worker@example.com", "s3cret").await.unwrap();
        assert_eq!(logged_in.id, registered.id);
    }

    #[tokio::test]
    async fn register_rejects_unknown_role() {
        let err = service()
            .register("a@example.com", "pw", "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg == INVALID_ROLE));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let auth = service();
        let err = auth.register("not-an-email", "pw", "employee").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg == INVALID_EMAIL));

        let err = auth.register("a@example.com", "", "employee").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg == EMPTY_PASSWORD));
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let auth = service();
        auth.register("a@example.com", "pw", "employee").await.unwrap();

        let err = auth
            .register("a@example.com", "other", "moderator")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(msg) if msg == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn login_failures_look_the_same() {
        let auth = service();
        auth.register("a@example.com", "pw", "employee").await.unwrap();

        for (email, password) in [("a@example.com", "wrong"), ("nobody@example.com", "pw")] {
            let err = auth.login(email, password).await.unwrap_err();
            assert!(matches!(err, DomainError::Unauthorized(msg) if msg == INVALID_CREDENTIALS));
        }
    }

    #[tokio::test]
    async fn dummy_login_reuses_one_user_per_role() {
        let auth = service();

        let employee = auth.dummy_login("employee").await.unwrap();
        let again = auth.dummy_login("employee").await.unwrap();
        let moderator = auth.dummy_login("moderator").await.unwrap();

        assert_eq!(employee.id, again.id);
        assert_eq!(employee.role, Role::Employee);
        assert_eq!(moderator.role, Role::Moderator);
        assert_ne!(employee.email, moderator.email);
    }

    #[tokio::test]
    async fn dummy_login_prefers_existing_account() {
        let auth = service();
        let registered = auth
            .register("boss@example.com", "pw", "moderator")
            .await
            .unwrap();

        let user = auth.dummy_login("moderator").await.unwrap();
        assert_eq!(user.id, registered.id);
    }

    #[tokio::test]
    async fn dummy_login_rejects_unknown_role() {
        let err = service().dummy_login("guest").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
