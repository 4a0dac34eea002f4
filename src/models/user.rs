use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

/// A registered investor. Deleting a user cascades to their portfolios.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image_url: String,
    pub bio: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Profile fields a user may edit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub username: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
}
