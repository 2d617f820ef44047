//! Signup and credential checks.

use std::sync::Arc;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::forms::{FormErrors, SignupForm};
use crate::ports::{PasswordService, UserRepository};

#[derive(Debug, Clone)]
pub enum SignupOutcome {
    Created(User),
    Invalid(FormErrors),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<dyn PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<SignupOutcome, DomainError> {
        let signup = match form.clean() {
            Ok(signup) => signup,
            Err(errors) => return Ok(SignupOutcome::Invalid(errors)),
        };

        let taken = || {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            SignupOutcome::Invalid(errors)
        };

        if self.users.find_by_username(&signup.username).await?.is_some() {
            return Ok(taken());
        }

        let password_hash = self
            .passwords
            .hash(&signup.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let user = User::new(signup.username, signup.email, password_hash)
            .with_name(signup.first_name, signup.last_name);

        match self.users.create(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, username = %user.username, "User registered");
                Ok(SignupOutcome::Created(user))
            }
            Err(RepoError::Constraint(_)) => Ok(taken()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair. `None` on any mismatch.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            return Ok(None);
        };

        let valid = self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        Ok(valid.then_some(user))
    }
}
