use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::user::{self, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    PaginatedResponse,
};

/// Argon2id PHC-string hash of a password.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub full_name: Option<String>,
    /// Defaults to staff.
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    /// When set, the password is re-hashed; otherwise it stays as it is.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Substring match on username or full name.
    pub keyword: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    event_sender: Option<EventSender>,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Staff accounts, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: UserFilter,
        page: u64,
        limit: u64,
    ) -> Result<PaginatedResponse<user::Model>, ServiceError> {
        let mut query = user::Entity::find().order_by_desc(user::Column::CreatedAt);

        if let Some(keyword) = filter.keyword.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", keyword.trim());
            query = query.filter(
                Condition::any()
                    .add(user::Column::Username.like(&pattern))
                    .add(user::Column::FullName.like(&pattern)),
            );
        }
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }

        let page = page.max(1);
        let limit = limit.max(1);
        let paginator = query.paginate(&*self.db, limit);
        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;
        let items = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(PaginatedResponse::new(items, total, page, limit))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("User #{} not found", user_id)))
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<user::Model, ServiceError> {
        request.validate()?;
        let username = request.username.trim().to_string();

        let taken = user::Entity::find()
            .filter(user::Column::Username.eq(&username))
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username {} already exists",
                username
            )));
        }

        let model = user::ActiveModel {
            username: Set(username),
            password_hash: Set(hash_password(&request.password)?),
            full_name: Set(request.full_name),
            role: Set(request.role.unwrap_or(UserRole::Staff)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        info!(user_id = created.user_id, "User created");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::UserCreated(created.user_id)).await;
        }

        Ok(created)
    }

    /// Updates name, role and optionally the password. The username is
    /// fixed at creation.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: i32,
        request: UpdateUserRequest,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;

        let existing = self.get(user_id).await?;

        let mut active: user::ActiveModel = existing.into();
        if let Some(full_name) = request.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(role) = request.role {
            active.role = Set(role);
        }
        if let Some(password) = request.password.as_deref().filter(|p| !p.is_empty()) {
            active.password_hash = Set(hash_password(password)?);
        }

        active
            .update(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i32) -> Result<(), ServiceError> {
        let result = user::Entity::delete_by_id(user_id)
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "User #{} not found",
                user_id
            )));
        }

        Ok(())
    }
}
