use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::{AuthUser, User};
use crate::services::roster_service::Roster;
use crate::utils::time;

#[derive(Clone)]
pub struct AuthService {
    roster: Arc<Roster>,
    secret: String,
    ttl_hours: i64,
}

impl AuthService {
    pub fn new(roster: Arc<Roster>, secret: String, ttl_hours: i64) -> Self {
        Self {
            roster,
            secret,
            ttl_hours,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(String, AuthUser)> {
        let Some(user) = self.roster.find_user(username, password) else {
            warn!(username, "rejected login");
            return Err(Error::Unauthorized("Invalid username or password".to_string()));
        };
        let token = self.issue_token(user)?;
        info!(user_id = %user.id, role = user.role.as_str(), "user logged in");
        Ok((token, AuthUser::from(user)))
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let exp = time::now() + Duration::hours(self.ttl_hours);
        let claims = Claims {
            sub: user.id.clone(),
            exp: exp.timestamp().max(0) as usize,
            role: Some(user.role.as_str().to_string()),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    pub fn current_user(&self, claims: &Claims) -> Result<AuthUser> {
        self.roster
            .user_by_id(&claims.sub)
            .map(AuthUser::from)
            .ok_or_else(|| Error::Unauthorized("Unknown user".to_string()))
    }
}
