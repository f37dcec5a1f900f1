//! Cache statistics

/// Counters reported by [`MemoryCache`](crate::MemoryCache).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (absent or expired)
    pub misses: u64,
    /// Total number of lookups
    pub total_requests: u64,
    /// Current number of entries, including expired ones not yet purged
    pub entry_count: u64,
    /// Sum of stored payload sizes in bytes
    pub memory_usage: u64,
}

impl CacheStatistics {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }

    /// Calculate miss rate (0.0 to 1.0)
    pub fn miss_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.misses as f64 / self.total_requests as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_with_zero_requests() {
        let stats = CacheStatistics::default();
        assert!(stats.hit_rate().abs() < f64::EPSILON);
        assert!(stats.miss_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_rates() {
        let stats = CacheStatistics {
            hits: 3,
            misses: 1,
            total_requests: 4,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!((stats.miss_rate() - 0.25).abs() < f64::EPSILON);
    }
}
