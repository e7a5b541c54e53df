use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub class: String,
}

impl User {
    pub fn new(id: &str, username: &str, password: &str, name: &str, role: Role, class: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            role,
            class: class.to_string(),
        }
    }

    /// Splits "Last First" at the first space. A single-word name has an
    /// empty first name.
    pub fn name_parts(&self) -> (&str, &str) {
        match self.name.split_once(' ') {
            Some((last, first)) => (last.trim(), first.trim()),
            None => (self.name.trim(), ""),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public projection of a user, never carrying the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub class: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
            class: user.class.clone(),
        }
    }
}
