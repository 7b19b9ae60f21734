pub mod budget;
pub mod search;
pub mod telemetry;

mod error;

pub use budget::{BudgetStage, Budgeted, Budgeter};
pub use error::{Error, Result};
pub use search::{
	CategorySearchRequest, CategorySearchResponse, Citation, DocumentReport, DocumentRequest,
	FailedCategory, LookupRequest, LookupResponse, MissingReason, ReferenceNote, ResultBundle,
	RiskLevel, SearchAttempt, SearchRequest, Stage,
};
pub use telemetry::{Telemetry, TelemetrySnapshot, TelemetryStats};

use std::{collections::HashMap, sync::Arc};

use lexguard_config::Config;
use lexguard_domain::{
	category::Category,
	classify::DomainClassifier,
	document::DocumentAnalyzer,
	evidence::EvidenceExtractor,
	intent::IntentDetector,
	lexicon::Lexicon,
	planner::QueryPlanner,
	provision::ProvisionMatcher,
	quality::{QualityEvaluator, QualityThresholds, RetryPolicy},
};
use lexguard_providers::{LawApiClient, SearchProvider};

use search::ResultCache;

/// Category → provider dispatch, resolved once at startup.
#[derive(Clone, Default)]
pub struct Providers {
	by_category: HashMap<Category, Arc<dyn SearchProvider>>,
}
impl Providers {
	pub fn new() -> Self {
		Self::default()
	}

	/// One provider serving every category.
	pub fn uniform(provider: Arc<dyn SearchProvider>) -> Self {
		let mut providers = Self::new();

		for category in Category::ALL {
			providers.register(category, provider.clone());
		}

		providers
	}

	/// The law.go.kr client for every category. A missing API key is not an error here; each
	/// attempt reports it instead.
	pub fn law_api(cfg: &lexguard_config::Provider) -> Result<Self> {
		let client = LawApiClient::new(cfg.clone())?;

		if !client.is_configured() {
			tracing::warn!(
				"Law API key is not set. Searches will report the provider as not configured."
			);
		}

		Ok(Self::uniform(Arc::new(client)))
	}

	pub fn with_provider(mut self, category: Category, provider: Arc<dyn SearchProvider>) -> Self {
		self.register(category, provider);

		self
	}

	pub fn register(&mut self, category: Category, provider: Arc<dyn SearchProvider>) {
		self.by_category.insert(category, provider);
	}

	pub fn get(&self, category: Category) -> Option<Arc<dyn SearchProvider>> {
		self.by_category.get(&category).cloned()
	}
}

/// The retrieval orchestrator. Cheap to clone; clones share caches and telemetry.
#[derive(Clone)]
pub struct LexguardService {
	pub cfg: Arc<Config>,
	lexicon: Arc<Lexicon>,
	planner: Arc<QueryPlanner>,
	classifier: Arc<DomainClassifier>,
	intents: Arc<IntentDetector>,
	evaluator: Arc<QualityEvaluator>,
	retry: Arc<RetryPolicy>,
	evidence: Arc<EvidenceExtractor>,
	provisions: Arc<ProvisionMatcher>,
	documents: Arc<DocumentAnalyzer>,
	cache: ResultCache,
	telemetry: Arc<Telemetry>,
	providers: Arc<Providers>,
	budgeter: Budgeter,
}
impl LexguardService {
	/// Loads the lexicon from `lexicon.path`, or the embedded copy when unset.
	pub fn new(cfg: Config, providers: Providers) -> Result<Self> {
		let lexicon = match cfg.lexicon.path.as_deref() {
			Some(path) => Lexicon::load(path)?,
			None => Lexicon::embedded()?,
		};

		Self::with_lexicon(cfg, providers, lexicon)
	}

	pub fn with_lexicon(cfg: Config, providers: Providers, lexicon: Lexicon) -> Result<Self> {
		let lexicon = Arc::new(lexicon);
		let thresholds = QualityThresholds {
			min_total: cfg.quality.min_total,
			max_total: cfg.quality.max_total,
			sample_size: cfg.quality.sample_size,
			excellent_ratio: cfg.quality.excellent_ratio,
			good_ratio: cfg.quality.good_ratio,
		};

		Ok(Self {
			planner: Arc::new(QueryPlanner::new(lexicon.clone(), cfg.search.max_synonym_variants)),
			classifier: Arc::new(DomainClassifier::new(
				lexicon.clone(),
				cfg.quality.domain_confidence,
			)),
			intents: Arc::new(IntentDetector::new(lexicon.clone())?),
			evaluator: Arc::new(QualityEvaluator::new(lexicon.clone(), thresholds)),
			retry: Arc::new(RetryPolicy::new(
				cfg.search.max_attempts,
				cfg.quality.max_total,
				cfg.search.widened_window_years,
			)),
			evidence: Arc::new(EvidenceExtractor::new(lexicon.clone())),
			provisions: Arc::new(ProvisionMatcher::new()),
			documents: Arc::new(DocumentAnalyzer::new(lexicon.clone())),
			cache: ResultCache::new(&cfg.cache, &cfg.provider),
			telemetry: Arc::new(Telemetry::new(cfg.telemetry.capacity)),
			providers: Arc::new(providers),
			budgeter: Budgeter::from_config(&cfg.response),
			lexicon,
			cfg: Arc::new(cfg),
		})
	}

	pub fn lexicon(&self) -> &Lexicon {
		&self.lexicon
	}

	pub fn budgeter(&self) -> Budgeter {
		self.budgeter
	}

	pub fn telemetry(&self) -> TelemetrySnapshot {
		self.telemetry.snapshot()
	}

	pub fn clear_cache(&self) {
		self.cache.clear();
	}
}
