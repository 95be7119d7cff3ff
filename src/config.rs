/// Lines held by the sector cache when nothing else is configured.
pub const DEFAULT_CACHE_LINES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub cache_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_lines: DEFAULT_CACHE_LINES,
        }
    }
}

impl EngineConfig {
    /// At least one line is always kept.
    pub fn with_cache_lines(mut self, cache_lines: usize) -> Self {
        self.cache_lines = core::cmp::max(cache_lines, 1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_lines_clamped() {
        assert_eq!(EngineConfig::default().cache_lines, DEFAULT_CACHE_LINES);
        assert_eq!(EngineConfig::default().with_cache_lines(0).cache_lines, 1);
        assert_eq!(EngineConfig::default().with_cache_lines(8).cache_lines, 8);
    }
}
