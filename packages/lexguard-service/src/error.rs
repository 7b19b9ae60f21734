pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Response of {bytes} bytes cannot fit within {max_bytes} bytes.")]
	BudgetExceeded { bytes: usize, max_bytes: usize },
	#[error("Lexicon error: {message}")]
	Lexicon { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Serialization error: {message}")]
	Serialization { message: String },
}
impl From<lexguard_domain::Error> for Error {
	fn from(err: lexguard_domain::Error) -> Self {
		match err {
			lexguard_domain::Error::Validation { message } => Self::InvalidRequest { message },
			other => Self::Lexicon { message: other.to_string() },
		}
	}
}

impl From<lexguard_providers::Error> for Error {
	fn from(err: lexguard_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization { message: err.to_string() }
	}
}
