use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Provider failures are cached, so every variant owns plain data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("Provider credentials are not configured.")]
	NotConfigured,
	#[error("Provider returned an HTML page instead of JSON from {url}.")]
	HtmlResponse { url: String },
	#[error("Provider response is not valid JSON: {message}")]
	InvalidJson { message: String },
	#[error("Provider call timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error("Provider transport error: {message}")]
	Transport { message: String },
	#[error("Invalid provider request: {message}")]
	InvalidRequest { message: String },
}
impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::NotConfigured => ErrorKind::NotConfigured,
			Self::HtmlResponse { .. } | Self::InvalidJson { .. } => ErrorKind::Format,
			Self::Timeout { .. } => ErrorKind::Timeout,
			Self::Transport { .. } => ErrorKind::Transport,
			Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
		}
	}

	/// Failures that never reached the network are not worth remembering.
	pub fn is_cacheable(&self) -> bool {
		!matches!(self.kind(), ErrorKind::NotConfigured | ErrorKind::InvalidRequest)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	NotConfigured,
	Format,
	Timeout,
	Transport,
	InvalidRequest,
}
