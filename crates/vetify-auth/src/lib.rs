//! # vetify-auth
//!
//! The Vetify identity issuer.
//!
//! Employees sign in with Google; customers sign in with a one-time code
//! emailed to an address registered in the Vendus client registry. Both end
//! with a signed subject token issued by [`vetify_issuer`].
//!
//! - [`config`]: environment configuration and startup validation
//! - [`subjects`]: the `employee` and `customer` subject kinds
//! - [`employees`] / [`customers`]: claim extraction and subject mapping
//! - [`assembly`]: providers, access policy, and success routing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod assembly;
pub mod config;
pub mod customers;
pub mod employees;
pub mod error;
pub mod subjects;

mod proptests;

pub use assembly::{IssuerParts, SuccessRouter, build_issuer, from_settings};
pub use config::{Config, Settings};
pub use error::{ConfigError, MapError, Result, StartupError};
pub use subjects::{CustomerSubject, EmployeeSubject, VetifySubject};
