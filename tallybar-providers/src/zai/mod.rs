//! z.ai provider implementation.
//!
//! Reads the coding plan quota (`/api/monitor/usage/quota/limit`) for the
//! global service and for BigModel, its mainland China deployment.
//!
//! Keychain services: `tallybar:zai`, `tallybar:bigmodel`

mod api;
mod descriptor;
pub(crate) mod parser;
mod provider;
mod token_store;

pub use api::{ZaiLimit, ZaiQuotaData, ZaiQuotaResponse, QUOTA_ENDPOINT};
pub use descriptor::{ZaiRegion, PRIMARY_KIND};
pub use parser::parse_quota_response;
pub use provider::ZaiProvider;
pub use token_store::{TokenSource, ZaiTokenStore};
