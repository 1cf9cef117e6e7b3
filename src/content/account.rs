use tracing::info;

use super::{ContentError, ContentResult};
use crate::remote::{Backend, UserUpdate};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct AccountForm {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// What an account update changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOutcome {
    EmailAndPassword,
    Email,
    Password,
    Unchanged,
}

impl AccountOutcome {
    pub fn flash_code(&self) -> &'static str {
        match self {
            AccountOutcome::EmailAndPassword => "account_both",
            AccountOutcome::Email => "account_email",
            AccountOutcome::Password => "account_password",
            AccountOutcome::Unchanged => "account_unchanged",
        }
    }
}

impl AccountForm {
    /// Builds the provider update, validating the password pair.
    pub fn to_update(&self) -> ContentResult<UserUpdate> {
        let mut update = UserUpdate::default();
        let email = self.email.trim();
        if !email.is_empty() {
            update.email = Some(email.to_string());
        }
        if !self.new_password.is_empty() {
            if self.new_password != self.confirm_password {
                return Err(ContentError::Invalid("password_mismatch"));
            }
            if self.new_password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ContentError::Invalid("password_short"));
            }
            update.password = Some(self.new_password.clone());
        }
        Ok(update)
    }
}

pub async fn update_account(
    backend: &dyn Backend,
    token: &str,
    form: &AccountForm,
) -> ContentResult<AccountOutcome> {
    let update = form.to_update()?;
    let outcome = match (&update.email, &update.password) {
        (Some(_), Some(_)) => AccountOutcome::EmailAndPassword,
        (Some(_), None) => AccountOutcome::Email,
        (None, Some(_)) => AccountOutcome::Password,
        (None, None) => return Ok(AccountOutcome::Unchanged),
    };

    let user = backend.update_user(token, &update).await?;
    info!(user_id = %user.id, outcome = outcome.flash_code(), "account updated");
    Ok(outcome)
}
