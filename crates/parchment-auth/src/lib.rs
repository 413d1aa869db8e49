//! Google sign-in for the Parchment calendar.
//!
//! Yields an opaque bearer credential (`TokenSet`) and revokes it on sign-out.

pub mod google;
pub mod signin;
pub mod storage;

pub use google::{GoogleEndpoints, GoogleOAuth2Provider, Prompt};
pub use signin::GoogleSignIn;
pub use storage::{SecureStorage, TokenSet};
