use std::{
    cell::{Cell, RefCell},
    sync::Arc,
};

use payloads::{
    APIClient, ClientError,
    requests::{LoginRequest, RegisterRequest},
    responses::UserInfo,
};
use secrecy::SecretString;

use crate::session::{Session, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Please fill in all fields")]
    MissingFields,
    /// The backend answered but refused, with its message or our fallback.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Client(ClientError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Login state for the CMS, following the same loading/error protocol as
/// [`ResourceStore`](crate::ResourceStore).
pub struct AuthStore {
    client: APIClient,
    session: Arc<Session>,
    is_loading: Cell<bool>,
    error: RefCell<Option<String>>,
}

impl AuthStore {
    /// `client` must share its token with `session`.
    pub fn new(client: APIClient, session: Arc<Session>) -> Self {
        Self {
            client,
            session,
            is_loading: Cell::new(false),
            error: RefCell::new(None),
        }
    }

    pub fn user(&self) -> Option<UserInfo> {
        self.session.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn clear_error(&self) {
        *self.error.borrow_mut() = None;
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        self.begin();
        let result = self.try_login(email, password).await;
        if result.is_err() {
            // a failed login never leaves a previous user logged in
            if let Err(e) = self.session.end() {
                tracing::warn!("{e:#}");
            }
        }
        self.settle(result)
    }

    async fn try_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let details = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .client
            .login(&details)
            .await
            .map_err(|e| rejection(e, "Authentication failed"))?;

        if !response.success {
            return Err(AuthError::Rejected(
                response.message.unwrap_or_else(|| "Unknown error".into()),
            ));
        }
        let (Some(token), Some(user)) = (response.token, response.user) else {
            return Err(AuthError::Rejected(
                "Unexpected response from the server".into(),
            ));
        };

        self.session
            .establish(SecretString::from(token), user.clone())?;
        tracing::info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    /// Create an account. The new user is not logged in.
    #[tracing::instrument(skip_all, fields(email = %details.email))]
    pub async fn register(
        &self,
        details: &RegisterRequest,
    ) -> Result<UserInfo, AuthError> {
        self.begin();
        let result = self.try_register(details).await;
        self.settle(result)
    }

    async fn try_register(
        &self,
        details: &RegisterRequest,
    ) -> Result<UserInfo, AuthError> {
        let response = self
            .client
            .register(details)
            .await
            .map_err(|e| rejection(e, "Registration failed"))?;
        match (response.success, response.user) {
            (true, Some(user)) => Ok(user),
            (_, _) => Err(AuthError::Rejected(
                response.message.unwrap_or_else(|| "Unknown error".into()),
            )),
        }
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        *self.error.borrow_mut() = None;
        self.session.end()?;
        tracing::info!("logged out");
        Ok(())
    }

    fn begin(&self) {
        self.is_loading.set(true);
        *self.error.borrow_mut() = None;
    }

    fn settle<T>(&self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        if let Err(e) = &result {
            *self.error.borrow_mut() = Some(e.to_string());
        }
        self.is_loading.set(false);
        result
    }
}

fn rejection(e: ClientError, fallback: &str) -> AuthError {
    match e {
        ClientError::APIError(_, message) => AuthError::Rejected(
            message.unwrap_or_else(|| fallback.to_string()),
        ),
        other => AuthError::Client(other),
    }
}
