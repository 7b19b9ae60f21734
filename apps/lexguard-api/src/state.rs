use std::sync::Arc;

use lexguard_service::{LexguardService, Providers};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LexguardService>,
}
impl AppState {
	pub fn new(config: lexguard_config::Config) -> color_eyre::Result<Self> {
		let providers = Providers::law_api(&config.provider)?;
		let service = LexguardService::new(config, providers)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LexguardService) -> Self {
		Self { service: Arc::new(service) }
	}
}
