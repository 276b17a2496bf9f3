use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::crud_service::{persistence_error, CrudService};
use crate::config::Config;
use crate::dto::user_dto::{LoginPayload, LoginResponse, RegisterPayload, UserDto};
use crate::error::{Error, Result};
use crate::models::{Entity, User};
use crate::repositories::UnitOfWork;
use crate::utils::{crypto, token};

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone)]
pub struct UserService {
    uow: Arc<UnitOfWork>,
    crud: CrudService<UserDto>,
}

impl UserService {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self {
            crud: CrudService::new(uow.clone()),
            uow,
        }
    }

    pub async fn register(&self, payload: &RegisterPayload) -> Result<UserDto> {
        let email = payload.email.trim();
        if email.is_empty() {
            return Err(Error::field("email", "Email is required"));
        }
        if payload.user_name.trim().is_empty() {
            return Err(Error::field("user_name", "User name is required"));
        }
        if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::field(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }
        if self.find_by_email(email).await?.is_some() {
            return Err(Error::business(
                "USER_EXISTS",
                format!("A user with email '{}' already exists", email),
            ));
        }

        let user = User {
            email: email.to_string(),
            user_name: payload.user_name.trim().to_string(),
            password_hash: crypto::hash_password(&payload.password)?,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            ..User::default()
        };
        let tracked = self.uow.users().add(user);
        self.uow.save_changes().await.map_err(|err| {
            persistence_error(err, "REGISTER_FAILED", "Failed to register user".to_string())
        })?;

        let created = tracked.get();
        info!(user_id = %created.id, "User registered");
        Ok(UserDto::from(&created))
    }

    /// Checks credentials, stamps the login time and issues an access token.
    pub async fn login(&self, payload: &LoginPayload, config: &Config) -> Result<LoginResponse> {
        let invalid = || Error::Unauthorized("Invalid email or password".to_string());

        let Some(mut user) = self.find_by_email(&payload.email).await? else {
            warn!("Login attempt for unknown email");
            return Err(invalid());
        };
        if !user.is_active {
            warn!(user_id = %user.id, "Login attempt for inactive user");
            return Err(invalid());
        }
        if !crypto::verify_password(&payload.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid());
        }

        let now = self.uow.clock().now();
        user.last_login_at = Some(now);
        let tracked = self.uow.users().update(user);
        self.uow.save_changes().await?;
        let user = tracked.get();

        let access_token = token::issue_access_token(
            &config.jwt_secret,
            &user.id.to_string(),
            &user.email,
            config.jwt_ttl_minutes,
            now,
        )?;
        info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: config.jwt_ttl_minutes.saturating_mul(60),
            user: UserDto::from(&user),
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<UserDto>> {
        self.crud.get_by_id(id).await
    }

    pub async fn get_all(&self) -> Result<Vec<UserDto>> {
        let mut users = self.crud.get_all().await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserDto>> {
        if email.trim().is_empty() {
            return Err(Error::field("email", "Email cannot be empty"));
        }
        let found = self.find_by_email(email).await.map_err(|err| {
            persistence_error(
                err,
                "GET_USER_BY_EMAIL_FAILED",
                format!("Failed to find user by email '{}'", email),
            )
        })?;
        Ok(found.as_ref().map(UserDto::from))
    }

    /// Active users ordered by first name, then last name.
    pub async fn get_active_users(&self) -> Result<Vec<UserDto>> {
        let outcome: Result<Vec<UserDto>> = async {
            let mut users = self.uow.users().find(|user| user.is_active).await?;
            sort_by_name(&mut users);
            Ok(users.iter().map(UserDto::from).collect())
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "GET_ACTIVE_USERS_FAILED",
                "Failed to retrieve active users".to_string(),
            )
        })
    }

    pub async fn search_users(&self, term: &str) -> Result<Vec<UserDto>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Err(Error::field("q", "Search term cannot be empty"));
        }
        let outcome: Result<Vec<UserDto>> = async {
            let needle = term.clone();
            let mut users = self
                .uow
                .users()
                .find(move |user| user.matches_term(&needle))
                .await?;
            sort_by_name(&mut users);
            Ok(users.iter().map(UserDto::from).collect())
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "SEARCH_USERS_FAILED",
                format!("Failed to search users with term '{}'", term),
            )
        })
    }

    /// Accepts either the user id or the email address.
    pub async fn update_last_login(&self, email_or_id: &str) -> Result<()> {
        let outcome: Result<()> = async {
            let user = match Uuid::parse_str(email_or_id.trim()) {
                Ok(id) => self.uow.users().get_by_id(id).await?,
                Err(_) => self.find_by_email(email_or_id).await?,
            };
            let mut user = user.ok_or_else(|| Error::not_found(User::NAME, email_or_id))?;
            user.last_login_at = Some(self.uow.clock().now());
            self.uow.users().update(user);
            self.uow.save_changes().await?;
            Ok(())
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "UPDATE_LAST_LOGIN_FAILED",
                format!("Failed to update last login for '{}'", email_or_id),
            )
        })
    }

    pub async fn update(&self, dto: &UserDto) -> Result<UserDto> {
        if self.uow.users().get_by_id(dto.id).await?.is_none() {
            return Err(Error::not_found(User::NAME, dto.id));
        }
        if let Some(existing) = self.find_by_email(&dto.email).await? {
            if existing.id != dto.id {
                return Err(Error::business(
                    "EMAIL_EXISTS",
                    format!("Email '{}' is already used by another user", dto.email.trim()),
                ));
            }
        }
        self.crud.update(dto).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.crud.delete(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let mut matches = self
            .uow
            .users()
            .find(move |user| user.email.to_lowercase() == email)
            .await?;
        Ok(matches.pop())
    }
}

fn sort_by_name(users: &mut [User]) {
    users.sort_by(|a, b| {
        a.first_name
            .cmp(&b.first_name)
            .then_with(|| a.last_name.cmp(&b.last_name))
    });
}
