//! Validated login and registration input.
//!
//! Form errors stay local: they are returned to the caller for inline display
//! and never touch session state.

use farm_connect_core::{Email, EmailError, RoleError, UserRole};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Form validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("password is required")]
    EmptyPassword,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("name is required")]
    EmptyName,

    #[error(transparent)]
    Role(#[from] RoleError),
}

/// Login form input.
#[derive(Debug, Clone)]
pub struct Credentials {
    email: Email,
    password: SecretString,
}

impl Credentials {
    /// Validate login input.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the email is malformed or the password is empty.
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: SecretString::from(password),
        })
    }

    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Registration form input.
#[derive(Debug, Clone)]
pub struct Registration {
    name: String,
    email: Email,
    password: SecretString,
    role: UserRole,
    phone: Option<String>,
}

impl Registration {
    /// Validate registration input.
    ///
    /// `confirm` must repeat `password` exactly.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn new(
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
        role: &str,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LENGTH,
            });
        }
        if password != confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        let role = role.parse::<UserRole>()?;

        Ok(Self {
            name: name.to_owned(),
            email,
            password: SecretString::from(password),
            role,
            phone: None,
        })
    }

    /// Attach an optional contact phone number (drivers and farmers).
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        let phone = phone.into();
        self.phone = (!phone.trim().is_empty()).then_some(phone);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    #[must_use]
    pub const fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }
}
