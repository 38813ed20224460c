//! Auth command handlers (signup, login, logout, whoami).

use anyhow::{Result, bail};
use fetchmate_core::api::ApiClient;
use fetchmate_core::auth;
use fetchmate_core::guard::{self, GuardDecision};

pub async fn signup(api: &ApiClient, username: &str, email: &str, password: &str) -> Result<()> {
    match auth::signup(api, username, email, password).await {
        Ok(session) => {
            println!("Signed up and logged in as {}", session.user.username);
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<()> {
    match auth::login(api, email, password).await {
        Ok(session) => {
            println!("Logged in as {}", session.user.username);
            Ok(())
        }
        Err(e) => bail!("{e}"),
    }
}

pub fn logout(api: &ApiClient) -> Result<()> {
    auth::logout(api.store())?;
    println!("Logged out.");
    Ok(())
}

pub fn whoami(api: &ApiClient) {
    match guard::evaluate(api.store()) {
        GuardDecision::Authenticated(session) => {
            println!("{} <{}>", session.user.username, session.user.email);
        }
        GuardDecision::RedirectToEntry => {
            println!("Not logged in.");
        }
    }
}
