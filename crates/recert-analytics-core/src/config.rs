//! Configuration management for the analytics engine.
//!
//! All documented constants (the 70/30 typicality/usage weighting, the
//! sensitivity ceiling table, the usage factor table, clustering and
//! graduation thresholds) live here as configuration with the documented
//! values as defaults, not as hard-coded literals.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::proximity::ProximityWeights;
use crate::types::{SensitivityLevel, UsagePattern};

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub proximity: ProximityWeights,
    pub scoring: ScoringConfig,
    pub clustering: ClusteringConfig,
    pub graduation: GraduationConfig,
}

impl EngineConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{RECERT_ENV}.toml (environment-specific)
    /// 3. Environment variables with RECERT_ prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("RECERT_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("RECERT").separator("__"));

        let cfg: EngineConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Configuration with the documented defaults, for testing and
    /// embedded use.
    pub fn default_config() -> Self {
        Self {
            logging: LoggingConfig::default(),
            proximity: ProximityWeights::default(),
            scoring: ScoringConfig::default(),
            clustering: ClusteringConfig::default(),
            graduation: GraduationConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let cfg: EngineConfig = toml::from_str(&content)
            .map_err(|e| CoreError::config(format!("Failed to parse config file: {}", e)))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration values.
    ///
    /// Invalid configuration is rejected before any computation starts;
    /// nothing is partially applied.
    pub fn validate(&self) -> CoreResult<()> {
        self.proximity.validate()?;
        self.scoring.validate()?;
        self.clustering.validate()?;
        self.graduation.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Assurance scoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Weight of peer typicality in the raw score.
    pub weight_typicality: f32,
    /// Weight of the usage factor in the raw score.
    pub weight_usage: f32,

    /// Score at or above which an item is High Assurance.
    pub high_assurance_threshold: f32,
    /// Score at or above which an item is Medium Assurance.
    pub medium_assurance_threshold: f32,

    /// Sensitivity ceiling table. Ceilings cap the score; they are not
    /// weights. The Critical ceiling must be 0.0.
    pub ceiling_public: f32,
    pub ceiling_internal: f32,
    pub ceiling_confidential: f32,
    pub ceiling_critical: f32,

    /// Usage factor table per recency band.
    pub usage_active: f32,
    pub usage_recent: f32,
    pub usage_stale: f32,
    pub usage_dormant: f32,

    /// Recency band boundaries in days.
    pub active_days: i64,
    pub recent_days: i64,
    pub stale_days: i64,

    /// Typicality assigned when no peer comparison is possible.
    pub cold_start_typicality: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_typicality: 0.7,
            weight_usage: 0.3,
            high_assurance_threshold: 80.0,
            medium_assurance_threshold: 50.0,
            ceiling_public: 1.0,
            ceiling_internal: 0.85,
            ceiling_confidential: 0.5,
            ceiling_critical: 0.0,
            usage_active: 1.0,
            usage_recent: 0.8,
            usage_stale: 0.5,
            usage_dormant: 0.1,
            active_days: 30,
            recent_days: 90,
            stale_days: 365,
            cold_start_typicality: 0.5,
        }
    }
}

impl ScoringConfig {
    /// Ceiling for a sensitivity level.
    pub fn ceiling(&self, level: SensitivityLevel) -> f32 {
        match level {
            SensitivityLevel::Public => self.ceiling_public,
            SensitivityLevel::Internal => self.ceiling_internal,
            SensitivityLevel::Confidential => self.ceiling_confidential,
            SensitivityLevel::Critical => self.ceiling_critical,
        }
    }

    /// Usage factor for a recency band.
    pub fn usage_factor(&self, pattern: UsagePattern) -> f32 {
        match pattern {
            UsagePattern::Active => self.usage_active,
            UsagePattern::Recent => self.usage_recent,
            UsagePattern::Stale => self.usage_stale,
            UsagePattern::Dormant => self.usage_dormant,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        let sum = self.weight_typicality + self.weight_usage;
        if (sum - 1.0).abs() > 1e-3 {
            return Err(CoreError::validation(
                "scoring.weights",
                format!("typicality + usage weights must sum to 1.0, got {}", sum),
            ));
        }
        if self.weight_typicality < 0.0 || self.weight_usage < 0.0 {
            return Err(CoreError::validation(
                "scoring.weights",
                "weights must be non-negative",
            ));
        }
        if self.high_assurance_threshold <= self.medium_assurance_threshold {
            return Err(CoreError::validation(
                "scoring.thresholds",
                "high_assurance_threshold must exceed medium_assurance_threshold",
            ));
        }
        // The zero Critical ceiling is the core trust property; a config
        // that weakens it is rejected outright.
        if self.ceiling_critical != 0.0 {
            return Err(CoreError::validation(
                "scoring.ceiling_critical",
                "Critical ceiling must be 0.0",
            ));
        }
        for (name, v) in [
            ("ceiling_public", self.ceiling_public),
            ("ceiling_internal", self.ceiling_internal),
            ("ceiling_confidential", self.ceiling_confidential),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CoreError::validation(
                    format!("scoring.{}", name),
                    "ceilings must be in [0,1]",
                ));
            }
        }
        if !(self.active_days < self.recent_days && self.recent_days < self.stale_days) {
            return Err(CoreError::validation(
                "scoring.recency",
                "recency bands must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Clustering ensemble configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusteringConfig {
    /// Seed for randomized algorithms; recorded in every outcome for audit.
    pub seed: u64,
    /// Upper bound on candidate cluster counts for auto-k selection.
    pub max_clusters: usize,
    /// Minimum cluster size used to bound auto-k selection.
    pub min_cluster_size: usize,
    /// Usable peer-group sizes below this are statistically unreliable.
    pub min_peer_group: usize,
    /// Populations below this skip clustering entirely (cold start).
    pub min_population: usize,
    /// Per-algorithm typicality at or above this means "typical".
    pub typicality_threshold: f32,
    /// Consensus below this raises the disagreement flag.
    pub consensus_threshold: f32,
    /// DBSCAN neighborhood radius in distance space (1 - proximity).
    pub dbscan_eps: f32,
    pub dbscan_min_samples: usize,
    /// Minimum proximity for an edge in the access-overlap graph.
    pub community_min_edge_weight: f32,
    /// Iteration cap for k-medoids refinement and label propagation.
    pub max_iterations: usize,
    /// Restrict pairwise comparison and clustering to same-LOB blocks.
    pub block_by_lob: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_clusters: 50,
            min_cluster_size: 5,
            min_peer_group: 5,
            min_population: 5,
            typicality_threshold: 0.5,
            consensus_threshold: 0.8,
            dbscan_eps: 0.3,
            dbscan_min_samples: 5,
            community_min_edge_weight: 0.2,
            max_iterations: 50,
            block_by_lob: true,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_cluster_size == 0 || self.min_peer_group == 0 || self.min_population == 0 {
            return Err(CoreError::validation(
                "clustering.minimums",
                "min_cluster_size, min_peer_group and min_population must be > 0",
            ));
        }
        if self.max_clusters < 2 {
            return Err(CoreError::validation(
                "clustering.max_clusters",
                "max_clusters must be at least 2",
            ));
        }
        if !(0.0..=1.0).contains(&self.typicality_threshold)
            || !(0.0..=1.0).contains(&self.consensus_threshold)
        {
            return Err(CoreError::validation(
                "clustering.thresholds",
                "typicality and consensus thresholds must be in [0,1]",
            ));
        }
        if self.dbscan_eps <= 0.0 || self.dbscan_eps > 1.0 {
            return Err(CoreError::validation(
                "clustering.dbscan_eps",
                "dbscan_eps must be in (0,1]",
            ));
        }
        if self.max_iterations == 0 {
            return Err(CoreError::validation(
                "clustering.max_iterations",
                "max_iterations must be > 0",
            ));
        }
        Ok(())
    }
}

/// Graduation state-machine thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraduationConfig {
    /// Observation → Eligible gates, over the trailing window.
    pub min_campaigns: usize,
    pub min_decisions: u64,
    pub min_acceptance_rate: f32,
    pub max_override_rate: f32,
    pub max_false_positive_rate: f32,
    pub min_consensus: f32,
    pub max_cluster_churn: f32,

    /// Graduated → Suspended rollback triggers (post-graduation metrics).
    pub rollback_override_rate: f32,
    pub rollback_false_positive_rate: f32,
    pub rollback_min_consensus: f32,

    /// Post-graduation probation window and sampling.
    pub probation_days: i64,
    pub probation_sampling_rate: f32,

    /// Trailing campaign windows retained for metrics.
    pub metrics_window_campaigns: usize,
}

impl Default for GraduationConfig {
    fn default() -> Self {
        Self {
            min_campaigns: 3,
            min_decisions: 100,
            min_acceptance_rate: 0.90,
            max_override_rate: 0.10,
            max_false_positive_rate: 0.15,
            min_consensus: 0.80,
            max_cluster_churn: 0.10,
            rollback_override_rate: 0.15,
            rollback_false_positive_rate: 0.20,
            rollback_min_consensus: 0.70,
            probation_days: 30,
            probation_sampling_rate: 0.10,
            metrics_window_campaigns: 6,
        }
    }
}

impl GraduationConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.min_campaigns == 0 || self.min_decisions == 0 {
            return Err(CoreError::validation(
                "graduation.minimums",
                "min_campaigns and min_decisions must be > 0",
            ));
        }
        if self.metrics_window_campaigns < self.min_campaigns {
            return Err(CoreError::validation(
                "graduation.metrics_window_campaigns",
                "metrics window must retain at least min_campaigns campaigns",
            ));
        }
        // Rollback triggers must be looser than the advancement gates, or a
        // category would suspend in the same state it graduated from.
        if self.rollback_override_rate <= self.max_override_rate {
            return Err(CoreError::validation(
                "graduation.rollback_override_rate",
                "rollback override trigger must exceed the advancement gate",
            ));
        }
        if self.rollback_min_consensus >= self.min_consensus {
            return Err(CoreError::validation(
                "graduation.rollback_min_consensus",
                "rollback consensus floor must be below the advancement gate",
            ));
        }
        if self.probation_days < 0 {
            return Err(CoreError::validation(
                "graduation.probation_days",
                "probation_days must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.probation_sampling_rate) {
            return Err(CoreError::validation(
                "graduation.probation_sampling_rate",
                "sampling rate must be in [0,1]",
            ));
        }
        Ok(())
    }
}
