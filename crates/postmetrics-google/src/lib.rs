//! Google Drive and Google Sheets access for evidence storage and result rows.
//!
//! Both clients authenticate with a bearer token from a [`TokenSource`]
//! (normally the service-account key from configuration) and call the REST
//! APIs directly over `reqwest`.

pub mod auth;
pub mod drive;
pub mod error;
pub mod sheets;
pub mod upload;

mod http;

pub use auth::{ServiceAccountTokens, StaticToken, TokenSource, SCOPES};
pub use drive::{escape_query_literal, CreatedFolder, DriveClient, FOLDER_MIME_TYPE};
pub use error::GoogleError;
pub use sheets::{AppendOutcome, SheetsClient};
pub use upload::upload_evidence;
