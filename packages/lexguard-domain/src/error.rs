pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read lexicon at {path:?}.")]
	ReadLexicon { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse lexicon.")]
	ParseLexicon { source: toml::de::Error },
	#[error("Invalid intent pattern {pattern:?} for {category}.")]
	InvalidPattern { category: String, pattern: String, source: regex::Error },
	#[error("{message}")]
	Validation { message: String },
}
