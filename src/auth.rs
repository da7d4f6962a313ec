use async_trait::async_trait;
use pgwire::api::auth::{AuthSource, LoginInfo, Password};
use pgwire::error::PgWireResult;

/// Cleartext password check shared by every tenant. The user name is not
/// checked; the database name selects the tenant.
#[derive(Debug)]
pub struct ClassallocAuthSource {
    password: String,
}

impl ClassallocAuthSource {
    pub fn new(password: String) -> Self {
        Self { password }
    }
}

#[async_trait]
impl AuthSource for ClassallocAuthSource {
    async fn get_password(&self, login: &LoginInfo) -> PgWireResult<Password> {
        tracing::debug!(
            user = login.user().unwrap_or("-"),
            database = login.database().unwrap_or("default"),
            "login attempt from {}",
            login.host()
        );
        Ok(Password::new(None, self.password.as_bytes().to_vec()))
    }
}
