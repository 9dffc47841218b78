use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please fill in all fields")]
    MissingCredentials,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    /// Avatar letter: first character of the name, or 'U'.
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or('U')
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User"
        } else {
            &self.name
        }
    }
}

/// Screens of the app; `Home` requires an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Signup,
    Home,
}

/// Volatile, simulated authentication state. Nothing is verified.
#[derive(Debug, Default)]
pub struct Session {
    authenticated: bool,
    user: Option<User>,
    /// Names given at signup, keyed by email, so a later login shows them.
    known_names: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<&User, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.trim().is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        validate_email(email)?;

        let name = self
            .known_names
            .get(email)
            .cloned()
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        info!("Logged in as {}", email);
        Ok(self.authenticate(User {
            name,
            email: email.to_string(),
        }))
    }

    pub fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<&User, SessionError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() || password.is_empty() || confirm.is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        validate_email(email)?;
        if password != confirm {
            return Err(SessionError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SessionError::PasswordTooShort);
        }

        self.known_names.insert(email.to_string(), name.to_string());
        info!("Signed up {}", email);
        Ok(self.authenticate(User {
            name: name.to_string(),
            email: email.to_string(),
        }))
    }

    pub fn logout(&mut self) {
        self.authenticated = false;
        self.user = None;
    }

    /// Resolve a requested view against the current auth state.
    pub fn route(&self, requested: View) -> View {
        match (requested, self.authenticated) {
            (View::Home, false) => View::Login,
            (View::Login | View::Signup, true) => View::Home,
            (view, _) => view,
        }
    }

    fn authenticate(&mut self, user: User) -> &User {
        self.authenticated = true;
        self.user.insert(user)
    }
}

fn validate_email(email: &str) -> Result<(), SessionError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(SessionError::InvalidEmail),
    }
}
