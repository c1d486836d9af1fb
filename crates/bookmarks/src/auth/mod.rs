//! Authentication for the X web UI.
//!
//! Provides the scripted login form driver and saved cookie sessions.

mod login;
mod session;

pub use login::{Authenticator, HOME_URL, LOGIN_URL};
pub use session::{Session, AUTH_COOKIE};
