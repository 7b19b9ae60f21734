pub mod law_api;

mod error;

pub use error::{Error, ErrorKind, Result};
pub use law_api::LawApiClient;

use std::{future::Future, pin::Pin};

use lexguard_domain::result::{DetailRequest, ProviderRequest, RawResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One category-scoped search backend.
pub trait SearchProvider
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, request: &'a ProviderRequest) -> BoxFuture<'a, Result<RawResult>>;

	/// One full document, or one statute article. A miss is an empty result, not an error.
	fn detail<'a>(&'a self, request: &'a DetailRequest) -> BoxFuture<'a, Result<RawResult>>;
}
