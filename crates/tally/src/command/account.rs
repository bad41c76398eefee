// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tally login`, `logout`, `whoami`, `register`, `profile`, `delete-account`.

use std::fmt;

use super::{fail, require_login, EXIT_OK};
use crate::model::{Credentials, ProfileUpdate, Registration};
use crate::session::Session;

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username.
    pub username: String,
    /// Password.
    #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginArgs")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.username.trim().is_empty() {
            anyhow::bail!("username must not be empty");
        }
        Ok(())
    }
}

#[derive(clap::Args)]
pub struct RegisterArgs {
    /// Username.
    pub username: String,
    #[arg(long)]
    pub firstname: String,
    #[arg(long)]
    pub lastname: String,
    #[arg(long)]
    pub gender: String,
    #[arg(long)]
    pub age: u32,
    /// Password for the new account.
    #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Emoji shown next to the profile name.
    #[arg(long)]
    pub emoji: Option<String>,
}

impl fmt::Debug for RegisterArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterArgs")
            .field("username", &self.username)
            .field("age", &self.age)
            .finish_non_exhaustive()
    }
}

impl RegisterArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.username.trim().is_empty() {
            anyhow::bail!("username must not be empty");
        }
        if self.password.is_empty() {
            anyhow::bail!("password must not be empty");
        }
        Ok(())
    }

    fn registration(&self) -> Registration {
        Registration {
            username: self.username.clone(),
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            gender: self.gender.clone(),
            age: self.age,
            password: self.password.clone(),
            profile_emoji: self.emoji.clone(),
        }
    }
}

#[derive(Default, clap::Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub firstname: Option<String>,
    #[arg(long)]
    pub lastname: Option<String>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub age: Option<u32>,
    /// New password.
    #[arg(long, env = "TALLY_NEW_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long)]
    pub emoji: Option<String>,
}

impl fmt::Debug for ProfileArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileArgs")
            .field("firstname", &self.firstname)
            .field("lastname", &self.lastname)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl ProfileArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        let update = self.update();
        if update.firstname.is_none()
            && update.lastname.is_none()
            && update.gender.is_none()
            && update.age.is_none()
            && update.password.is_none()
            && update.profile_emoji.is_none()
        {
            anyhow::bail!("nothing to update; pass at least one profile field");
        }
        Ok(())
    }

    fn update(&self) -> ProfileUpdate {
        ProfileUpdate {
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            gender: self.gender.clone(),
            age: self.age,
            password: self.password.clone(),
            profile_emoji: self.emoji.clone(),
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct DeleteArgs {
    /// Confirm deletion.
    #[arg(long)]
    pub yes: bool,
}

impl DeleteArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.yes {
            anyhow::bail!("refusing to delete the account without --yes");
        }
        Ok(())
    }
}

pub async fn login(session: &Session, args: &LoginArgs) -> i32 {
    let credentials = Credentials::new(args.username.clone(), args.password.clone());
    match session.login(&credentials).await {
        Ok(()) => {
            println!("Logged in as {}.", args.username);
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

pub fn logout(session: &Session) -> i32 {
    session.logout();
    println!("Logged out.");
    EXIT_OK
}

pub async fn whoami(session: &Session) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.current_user().await {
        Ok(profile) => {
            let emoji =
                profile.profile_emoji.as_deref().map(|e| format!("{e} ")).unwrap_or_default();
            let username = profile.username.as_deref().unwrap_or("?");
            println!("{emoji}{} ({username})", profile.display_name());
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

pub async fn register(session: &Session, args: &RegisterArgs) -> i32 {
    match session.api().register(&args.registration()).await {
        Ok(_) => {
            println!("Registered '{}'. Run `tally login {}` to start.", args.username, args.username);
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

pub async fn profile(session: &Session, args: &ProfileArgs) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.api().update_profile(&args.update()).await {
        Ok(profile) => {
            println!("Profile updated: {}.", profile.display_name());
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}

pub async fn delete_account(session: &Session) -> i32 {
    if let Some(code) = require_login(session) {
        return code;
    }
    match session.api().delete_account().await {
        Ok(()) => {
            session.logout();
            println!("Account deleted.");
            EXIT_OK
        }
        Err(e) => fail(&e),
    }
}
