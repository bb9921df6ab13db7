//! Multi-account login handshake.
//!
//! A password-verified login either issues credentials immediately (zero or
//! one usable account) or parks the verified user behind a short-lived
//! selection challenge (two or more). Authentication failures are a single
//! generic `Unauthorized`; unknown emails run a dummy verification so the
//! failure path costs the same either way.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::credentials::CredentialService;
use crate::error::Error;
use crate::store::{Account, PasswordVerifier, RoleStore, User, UserStore};

use super::challenge::SelectionChallenges;

/// Credentials issued for one account of a user.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub account: Account,
}

/// Outcome of a successful password verification.
pub enum LoginOutcome {
    TokensIssued(IssuedTokens),
    SelectionRequired {
        selection_token: String,
        accounts: Vec<Account>,
    },
}

pub struct HandshakeService {
    users: Arc<dyn UserStore>,
    passwords: Arc<dyn PasswordVerifier>,
    roles: Arc<dyn RoleStore>,
    credentials: Arc<CredentialService>,
    challenges: SelectionChallenges,
}

impl HandshakeService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        passwords: Arc<dyn PasswordVerifier>,
        roles: Arc<dyn RoleStore>,
        credentials: Arc<CredentialService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            users,
            passwords,
            roles,
            credentials,
            challenges: SelectionChallenges::new(config.selection_ttl()),
        }
    }

    async fn issue_for(&self, user: &User, account: Account) -> Result<IssuedTokens, Error> {
        let roles = self.roles.roles_of_user(user.id).await?;
        let access_token = self
            .credentials
            .issue_access_token(user.id, &user.email, &roles)?;
        let refresh_token = self.credentials.issue_refresh_token(user.id).await?;
        Ok(IssuedTokens {
            access_token,
            refresh_token,
            account,
        })
    }

    /// Verify the password and either issue credentials or start account
    /// selection. Every failure is the same generic `Unauthorized`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, Error> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            // Dummy verification keeps unknown emails indistinguishable from
            // wrong passwords.
            let _ = self.passwords.verify(Uuid::nil(), password).await;
            return Err(Error::Unauthorized);
        };
        if !self.passwords.verify(user.id, password).await? || !user.is_active {
            return Err(Error::Unauthorized);
        }

        let mut accounts = self.users.active_accounts_of(user.id).await?;
        match accounts.len() {
            0 => {
                // No usable account yet: synthesize a default one so the
                // caller still lands somewhere.
                let account = Account {
                    id: Uuid::new_v4(),
                    user_id: user.id,
                    name: "default".to_string(),
                    is_default: true,
                    is_active: true,
                };
                Ok(LoginOutcome::TokensIssued(
                    self.issue_for(&user, account).await?,
                ))
            }
            1 => {
                let account = accounts.remove(0);
                Ok(LoginOutcome::TokensIssued(
                    self.issue_for(&user, account).await?,
                ))
            }
            _ => {
                let account_ids = accounts.iter().map(|account| account.id).collect();
                let selection_token = self.challenges.create(user.id, account_ids).await?;
                info!(user = %user.id, accounts = accounts.len(), "Account selection required");
                Ok(LoginOutcome::SelectionRequired {
                    selection_token,
                    accounts,
                })
            }
        }
    }

    /// Redeem a selection challenge for credentials scoped to one account.
    /// The challenge is consumed whether or not the selection succeeds.
    pub async fn select_account(
        &self,
        selection_token: &str,
        account_id: Uuid,
    ) -> Result<IssuedTokens, Error> {
        let Some((user_id, eligible)) = self.challenges.consume(selection_token).await else {
            return Err(Error::ChallengeExpiredOrConsumed);
        };
        if !eligible.contains(&account_id) {
            return Err(Error::Unauthorized);
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(Error::NotFound)?;
        let account = self
            .users
            .active_accounts_of(user_id)
            .await?
            .into_iter()
            .find(|account| account.id == account_id)
            .ok_or(Error::NotFound)?;
        self.issue_for(&user, account).await
    }

    /// Revoke the user's refresh tokens. The presented access token must
    /// belong to the claimed user; expiry is not enforced here.
    pub async fn logout(&self, user_id: Uuid, access_token: &str) -> Result<(), Error> {
        if self.credentials.resolve_user_id_from_token(access_token) != Some(user_id) {
            return Err(Error::Unauthorized);
        }
        self.credentials.revoke_all_refresh_tokens(user_id).await
    }
}
