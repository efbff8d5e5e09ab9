pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod format;
pub mod http;
pub mod media;
pub mod orchestrator;
pub mod primary;
pub mod stats;

pub use config::{load_config, BrowserConfig, MessagesSection, SelectorSection, TokfetchConfig};
pub use error::{ConfigError, Result};
pub use extractor::{ExtractionError, ExtractionResult, Extractor};
pub use fallback::{FallbackExtractor, Harvest};
pub use format::{derive_video_id, format_count, format_duration, video_id_from_url};
pub use http::{router, serve, shutdown_signal, AppState, ServeError, ServiceInfo, StatusReport};
pub use media::{MediaDraft, MediaResult, Method, Normalizer};
pub use orchestrator::{
    BuildError, DownloadError, Orchestrator, OrchestratorError, ValidationError,
};
pub use primary::{HttpStructuredSource, PrimaryExtractor, SourceError, StructuredSource};
pub use stats::{StatsCounters, StatsRegistry};
