//! `backoffice-auth` — pure authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it validates bearer tokens
//! and says which roles they carry. Only `admin` may use the back office.

pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::PrincipalId;
pub use roles::Role;
