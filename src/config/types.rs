use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Folio
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Worker pool and run policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineConfig {
    /// Number of domains processed concurrently
    pub workers: u32,

    /// Maximum number of thumbnail captures in flight, independent of `workers`
    pub capture_concurrency: u32,

    /// Minimum age in days before a snapshot is refreshed
    pub staleness_days: u32,

    /// Whole-run deadline in seconds (0 disables it)
    pub run_timeout_secs: u64,

    /// How long in-flight tasks may keep running after cancellation
    pub shutdown_grace_secs: u64,

    /// Pause a worker takes after each processed domain (milliseconds)
    pub politeness_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            capture_concurrency: 2,
            staleness_days: 7,
            run_timeout_secs: 0,
            shutdown_grace_secs: 10,
            politeness_delay_ms: 0,
        }
    }
}

impl PipelineConfig {
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

/// Page fetch timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            connect_timeout_secs: 10,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Where the domain list comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InputConfig {
    pub domains_path: PathBuf,

    /// Reject the whole list when a line is malformed
    pub strict: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            domains_path: PathBuf::from("portfolio.txt"),
            strict: false,
        }
    }
}

/// Which backend holds the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Json,
    Sqlite,
}

/// Catalog persistence configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Json,
            path: PathBuf::from("portfolio/data.json"),
        }
    }
}

/// Thumbnail capture configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ThumbnailConfig {
    /// Directory thumbnails are written to
    pub dir: PathBuf,

    /// Bounding box of every thumbnail
    pub width: u32,
    pub height: u32,

    pub jpeg_quality: u8,

    /// Smallest `<img>` (width * height) considered representative
    pub min_image_area: u64,

    /// Upper bound on `<img>` candidates downloaded per page
    pub max_image_candidates: usize,

    pub image_timeout_secs: u64,

    /// Images larger than this are not decoded
    pub max_image_bytes: usize,

    /// Deadline shared by all captures of one run (0 disables it)
    pub batch_timeout_secs: u64,

    /// Substrings that disqualify an `<img>` source
    pub denylist: Vec<String>,

    /// Draw the domain initials on placeholders
    pub placeholder_initials: bool,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("portfolio/thumbnails"),
            width: 300,
            height: 200,
            jpeg_quality: 85,
            min_image_area: 5000,
            max_image_candidates: 12,
            image_timeout_secs: 10,
            max_image_bytes: 10 * 1024 * 1024,
            batch_timeout_secs: 0,
            denylist: ["icon", "logo", "spacer", "blank", "pixel"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            placeholder_initials: true,
        }
    }
}

impl ThumbnailConfig {
    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        (self.batch_timeout_secs > 0).then(|| Duration::from_secs(self.batch_timeout_secs))
    }
}

/// Headless browser configuration for rendered captures
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RenderConfig {
    pub enabled: bool,

    /// Maximum number of browser pages open at once
    pub max_pages: u32,

    pub viewport_width: u32,
    pub viewport_height: u32,

    pub timeout_secs: u64,

    /// Time given to the page to settle after navigation (milliseconds)
    pub settle_ms: u64,

    pub attempts: u32,

    pub chrome_path: Option<PathBuf>,

    /// DevTools websocket of an already running browser
    pub remote_url: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_pages: 2,
            viewport_width: 1200,
            viewport_height: 1600,
            timeout_secs: 30,
            settle_ms: 3000,
            attempts: 1,
            chrome_path: None,
            remote_url: None,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Content analysis tuning and optional pattern tables
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AnalyzerConfig {
    pub max_keywords: usize,
    pub min_words_keywords: usize,
    pub min_words_theme: usize,

    /// Replaces the built-in theme table when non-empty
    #[serde(rename = "theme")]
    pub themes: Vec<ThemeEntry>,

    /// Replaces the built-in technology table when non-empty
    #[serde(rename = "technology")]
    pub technologies: Vec<TechnologyEntry>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_keywords: 10,
            min_words_keywords: 10,
            min_words_theme: 20,
            themes: Vec::new(),
            technologies: Vec::new(),
        }
    }
}

/// A theme and the words that indicate it
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeEntry {
    pub name: String,
    pub keywords: Vec<String>,
}

/// A technology and the markup fragments that reveal it
#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyEntry {
    pub name: String,
    pub patterns: Vec<String>,
}

/// Recurring runs for `--daemon`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScheduleConfig {
    /// Local time of day, "HH:MM"
    pub daily_at: Option<String>,
}
