//! # assetdesk-auth
//!
//! Bearer token handling for AssetDesk. Tokens are HS256 JWTs issued by the
//! host asset-management application; this crate verifies them and can mint
//! tokens for operators and tests.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
