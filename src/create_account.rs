use crate::auth::{
    hashing::hash_password,
    store::{AccountStore, PgAccountStore, Presence},
};
use crate::settings::Settings;
use crate::Error;
use std::io::BufRead;
use std::path::Path;

/// Prompts for a username and password on the terminal and adds the account
/// to the configured database.
pub async fn create_account(config_path: &Path) -> Result<(), Error> {
    let settings = Settings::load(config_path)?;
    let store = PgAccountStore::connect(&settings.database).await?;

    println!("Username:");
    let mut username = String::new();
    std::io::stdin().lock().read_line(&mut username)?;
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::Account("username must not be empty".to_string()));
    }

    let password = rpassword::prompt_password("Password: ")?;
    let confirmation = rpassword::prompt_password("Repeat password: ")?;
    if password != confirmation {
        return Err(Error::Account("passwords do not match".to_string()));
    }

    store_account(&store, username, &password).await?;
    println!("Account {} created", username);
    Ok(())
}

async fn store_account(
    store: &dyn AccountStore,
    username: &str,
    password: &str,
) -> Result<(), Error> {
    if store.exists(username).await? != Presence::Absent {
        return Err(Error::Account(format!("username {} is already in use", username)));
    }
    let password_hash = hash_password(password)?;
    store.insert(username, &password_hash).await?;
    Ok(())
}
