//! Keycloak integration
//!
//! The identity provider owns users, credentials and realm roles; this
//! module talks to its Admin REST API.

mod client;
mod types;

pub use client::KeycloakClient;
pub use types::{
    CreateKeycloakUserInput, KeycloakCredential, KeycloakRole, KeycloakUser, KeycloakUserUpdate,
    UserQuery,
};
