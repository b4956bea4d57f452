use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    pub email: String,
}

/// Single-user local deployment: the recovery token is returned in the
/// response instead of being emailed.
#[derive(Debug, Serialize)]
pub struct RecoveryResponse {
    pub recovery_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub recovery_token: String,
    pub new_password: String,
}
