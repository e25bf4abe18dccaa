//! Session commands.

use farm_connect_client::{ClientError, Credentials, FarmConnect, Registration, SessionStatus};

use super::CommandError;

/// Registration fields as given on the command line.
pub struct RegisterForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub phone: Option<&'a str>,
}

pub async fn login(
    app: &FarmConnect,
    email: &str,
    password: &str,
    remember: bool,
) -> Result<(), CommandError> {
    let credentials = Credentials::new(email, password).map_err(ClientError::from)?;
    let user = app
        .session()
        .login(&credentials, remember)
        .await
        .map_err(ClientError::from)?;

    tracing::info!("Signed in as {} ({}, {})", user.name, user.email, user.role);
    Ok(())
}

pub async fn register(
    app: &FarmConnect,
    form: &RegisterForm<'_>,
    remember: bool,
) -> Result<(), CommandError> {
    let mut registration = Registration::new(
        form.name,
        form.email,
        form.password,
        form.password,
        form.role,
    )
    .map_err(ClientError::from)?;
    if let Some(phone) = form.phone {
        registration = registration.with_phone(phone);
    }

    let user = app
        .session()
        .register(&registration, remember)
        .await
        .map_err(ClientError::from)?;

    tracing::info!("Account created for {} ({})", user.email, user.role);
    Ok(())
}

pub fn logout(app: &FarmConnect) {
    app.session().logout();
    tracing::info!("Signed out");
}

/// Restore the stored session, verify it, and print who is signed in.
#[allow(clippy::print_stdout)]
pub async fn whoami(app: &FarmConnect, refresh: bool) -> Result<(), CommandError> {
    let status = app.session().initialize().await;

    match status {
        SessionStatus::Unauthenticated | SessionStatus::Rejected => {
            return Err(CommandError::NotSignedIn);
        }
        SessionStatus::PendingVerification => {
            tracing::warn!("Backend unreachable; showing the stored session unverified");
        }
        SessionStatus::Authenticated => {}
    }

    if refresh {
        app.session()
            .refresh_profile()
            .await
            .map_err(ClientError::from)?;
    }

    let user = app.session().current_user().ok_or(CommandError::NotSignedIn)?;
    println!("{} <{}>", user.name, user.email);
    println!("  id:     {}", user.id);
    println!("  role:   {}", user.role);
    println!("  status: {}", app.session().status());
    Ok(())
}
