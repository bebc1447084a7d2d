//! Logged-in user session.
//!
//! The storefront does not authenticate anyone itself; the login flow lives
//! upstream and hands the resulting user to `session_set_user`. Checkout
//! reads the user to stamp orders with an account email and id. Sessions are
//! in-memory only and vanish on exit.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// The logged-in user, as the backend knows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Managed session state holding the optional current user.
#[derive(Debug, Default)]
pub struct SessionState {
    current_user: Mutex<Option<User>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current user. `None` drops back to guest checkout.
    pub fn set_user(&self, user: Option<User>) {
        match &user {
            Some(u) => info!(user_id = u.id, "session user set"),
            None => info!("session user cleared"),
        }
        *self.current_user.lock().unwrap() = user;
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_user.lock().unwrap().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.lock().unwrap().is_some()
    }
}
