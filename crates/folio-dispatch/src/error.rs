//! Error taxonomy for the dispatch pipeline.
//!
//! Every stage of [`Core`](crate::Core) returns [`DispatchError`]. The more
//! specific errors raised by collaborators convert into it with `?`:
//!
//! | Error | Raised by | Handling |
//! |-------|-----------|----------|
//! | [`ConfigError::Locked`] | [`Config::set`](crate::Config::set) after lock | fatal |
//! | [`PageNotFound`] | [`PageRepository`](crate::PageRepository) | recovered with the not-found page |
//! | [`TemplateError`] | [`TemplateEngine`](crate::TemplateEngine) | fatal |
//! | [`HookError`] | event subscribers | fatal unless marked recoverable |

use http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::hooks::HookError;
use crate::page::PageNotFound;
use crate::template::TemplateError;

/// An unrecovered failure while dispatching a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Configuration could not be read or was mutated after lock.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured not-found page is itself missing.
    #[error("not-found page \"{page_id}\" does not exist in the repository")]
    NotFoundPageMissing {
        /// The configured `not_found_page` identifier.
        page_id: String,
        /// The repository miss.
        #[source]
        source: PageNotFound,
    },

    /// The template engine failed to render the page.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A subscriber raised a fatal error.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A response could not be assembled (invalid header value, bad URL).
    #[error("invalid response: {0}")]
    Http(#[from] http::Error),

    /// Error raised by host code (bootstrap callbacks, middleware).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DispatchError {
    /// The HTTP status an unrecovered error is reported with.
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
