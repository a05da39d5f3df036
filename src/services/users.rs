use crate::{
    auth::AuthService,
    entities::{user, user::UserRole, User, UserModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Account management service
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<UserModel, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Name cannot be blank".to_string(),
            ));
        }
        if !input.email.contains('@') {
            return Err(ServiceError::ValidationError(
                "Email address is not valid".to_string(),
            ));
        }
        if input.password.len() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        self.ensure_unique_email(&input.email, None).await?;

        let password_hash = AuthService::hash_password(&input.password)
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let user_id = Uuid::new_v4();
        let account = user::ActiveModel {
            id: Set(user_id),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email.trim().to_lowercase()),
            password_hash: Set(password_hash),
            role: Set(input.role),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let account = account.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserCreated(user_id))
            .await;

        info!("Created {} account {}", account.role, user_id);
        Ok(account)
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> Result<UserModel, ServiceError> {
        let account = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = account.into();

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Name cannot be blank".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = input.email {
            if !email.contains('@') {
                return Err(ServiceError::ValidationError(
                    "Email address is not valid".to_string(),
                ));
            }
            self.ensure_unique_email(&email, Some(user_id)).await?;
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(role) = input.role {
            active.role = Set(role);
        }
        if let Some(password) = input.password {
            if password.len() < MIN_PASSWORD_LENGTH {
                return Err(ServiceError::ValidationError(format!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LENGTH
                )));
            }
            let hash = AuthService::hash_password(&password)
                .map_err(|e| ServiceError::HashError(e.to_string()))?;
            active.password_hash = Set(hash);
        }
        if let Some(is_active) = input.active {
            active.active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let account = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserUpdated(user_id))
            .await;

        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserModel, ServiceError> {
        User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    /// List accounts; `search` matches name or email substring
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: UserListQuery) -> Result<UserListResult, ServiceError> {
        let mut db_query = User::find();

        if let Some(search) = &query.search {
            db_query = db_query.filter(
                user::Column::Name
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }

        let total = db_query.clone().count(&*self.db).await?;

        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let users = db_query
            .order_by_asc(user::Column::Name)
            .limit(limit)
            .offset(offset)
            .all(&*self.db)
            .await?;

        Ok(UserListResult { users, total })
    }

    /// Deactivate an account. The account keeps its row so transaction
    /// attribution stays intact; a user cannot deactivate themselves.
    #[instrument(skip(self))]
    pub async fn deactivate_user(
        &self,
        user_id: Uuid,
        acting_user: Uuid,
    ) -> Result<(), ServiceError> {
        if user_id == acting_user {
            return Err(ServiceError::ValidationError(
                "You cannot deactivate your own account".to_string(),
            ));
        }

        let account = self.get_user(user_id).await?;
        if !account.active {
            return Err(ServiceError::Conflict(format!(
                "User {} is already deactivated",
                user_id
            )));
        }

        let mut active: user::ActiveModel = account.into();
        active.active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserDeactivated(user_id))
            .await;

        info!("Deactivated user {}", user_id);
        Ok(())
    }

    async fn ensure_unique_email(
        &self,
        email: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let normalized = email.trim().to_lowercase();
        let mut query = User::find().filter(user::Column::Email.eq(normalized));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }

        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        Ok(())
    }
}

/// Input for creating an account
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Input for updating an account
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct UserListResult {
    pub users: Vec<UserModel>,
    pub total: u64,
}
