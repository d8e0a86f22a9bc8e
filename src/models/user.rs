use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// User profile as submitted for registration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

impl NewUser {
    /// Checks the profile; a blank display name falls back to the login
    pub fn validate(mut self) -> AppResult<Self> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(AppError::InvalidArgument(format!(
                "`{}` is not an email address",
                self.email
            )));
        }
        if self.login.is_empty() || self.login.chars().any(char::is_whitespace) {
            return Err(AppError::InvalidArgument(
                "login must be non-empty and contain no spaces".to_string(),
            ));
        }
        if let Some(birthday) = self.birthday.filter(|day| *day > Utc::now().date_naive()) {
            return Err(AppError::InvalidArgument(format!(
                "birthday {} is in the future",
                birthday
            )));
        }

        if self.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
            self.name = Some(self.login.clone());
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub login: String,
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
}

impl User {
    pub fn new(id: i32, profile: NewUser) -> Self {
        Self {
            id,
            email: profile.email,
            login: profile.login,
            name: profile.name,
            birthday: profile.birthday,
        }
    }
}
