mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Lexicon, Provider, Quality, RerankMode, Response, Search, Service, Telemetry,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn from_toml_str(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw).map_err(|err| Error::ParseInline { source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.provider.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "provider.api_base must be non-empty.".to_string(),
		});
	}
	for (name, path) in
		[("search_path", &cfg.provider.search_path), ("detail_path", &cfg.provider.detail_path)]
	{
		if !path.starts_with('/') {
			return Err(Error::Validation {
				message: format!("provider.{name} must start with '/'."),
			});
		}
	}
	if cfg.provider.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "provider.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.provider.bulk_timeout_ms < cfg.provider.timeout_ms {
		return Err(Error::Validation {
			message: "provider.bulk_timeout_ms must be at least provider.timeout_ms.".to_string(),
		});
	}
	if cfg.cache.positive_capacity == 0 || cfg.cache.negative_capacity == 0 {
		return Err(Error::Validation {
			message: "cache capacities must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.positive_ttl_secs == 0 || cfg.cache.negative_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache TTLs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.negative_ttl_secs > cfg.cache.positive_ttl_secs {
		return Err(Error::Validation {
			message: "cache.negative_ttl_secs must not exceed cache.positive_ttl_secs."
				.to_string(),
		});
	}
	if cfg.search.max_results_per_category == 0 {
		return Err(Error::Validation {
			message: "search.max_results_per_category must be greater than zero.".to_string(),
		});
	}
	if !(1..=5).contains(&cfg.search.max_attempts) {
		return Err(Error::Validation {
			message: "search.max_attempts must be in the range 1-5.".to_string(),
		});
	}
	if cfg.search.max_concurrent_categories == 0 || cfg.search.max_categories == 0 {
		return Err(Error::Validation {
			message: "search.max_concurrent_categories and search.max_categories must be greater than zero."
				.to_string(),
		});
	}
	if cfg.search.default_window_years <= 0 {
		return Err(Error::Validation {
			message: "search.default_window_years must be greater than zero.".to_string(),
		});
	}
	if cfg.search.widened_window_years <= cfg.search.default_window_years {
		return Err(Error::Validation {
			message: "search.widened_window_years must exceed search.default_window_years."
				.to_string(),
		});
	}
	if cfg.search.max_evidence == 0 {
		return Err(Error::Validation {
			message: "search.max_evidence must be greater than zero.".to_string(),
		});
	}

	let quality = &cfg.quality;

	for (name, value) in [
		("quality.excellent_ratio", quality.excellent_ratio),
		("quality.good_ratio", quality.good_ratio),
		("quality.domain_confidence", quality.domain_confidence),
	] {
		if !value.is_finite() || value <= 0.0 || value > 1.0 {
			return Err(Error::Validation {
				message: format!("{name} must be greater than 0.0 and at most 1.0."),
			});
		}
	}

	if quality.good_ratio >= quality.excellent_ratio {
		return Err(Error::Validation {
			message: "quality.good_ratio must be less than quality.excellent_ratio.".to_string(),
		});
	}
	if quality.min_total == 0 || quality.min_total > quality.max_total {
		return Err(Error::Validation {
			message: "quality.min_total must be greater than zero and at most quality.max_total."
				.to_string(),
		});
	}
	if quality.sample_size == 0 {
		return Err(Error::Validation {
			message: "quality.sample_size must be greater than zero.".to_string(),
		});
	}
	if cfg.response.reserve_bytes >= cfg.response.max_bytes {
		return Err(Error::Validation {
			message: "response.reserve_bytes must be less than response.max_bytes.".to_string(),
		});
	}
	if cfg.telemetry.capacity == 0 {
		return Err(Error::Validation {
			message: "telemetry.capacity must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.provider.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.provider.api_key = None;
	}
	if let Some(key) = cfg.provider.api_key.as_mut() {
		*key = key.trim().to_string();
	}

	cfg.provider.api_base = cfg.provider.api_base.trim().trim_end_matches('/').to_string();

	if cfg.lexicon.path.as_ref().map(|path| path.as_os_str().is_empty()).unwrap_or(false) {
		cfg.lexicon.path = None;
	}
}
