//! Crawl report
//!
//! Counters collected while a crawl runs and a markdown rendering of them
//! for the CLI.

use std::time::Duration;

/// Failed URLs listed in the summary before truncating
const MAX_LISTED_FAILURES: usize = 50;

/// What happened during one crawl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Pages handed to the sink
    pub pages_done: u64,

    /// Failed URLs with the reason recorded by the frontier
    pub pages_failed: Vec<(String, String)>,

    /// Pages served from the cache without a fetch
    pub cache_hits: u64,

    /// Pages fetched over the network
    pub fetched: u64,

    /// True if the crawl stopped because of a cancel request
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl CrawlReport {
    /// Pages processed, successful or not
    pub fn pages_total(&self) -> u64 {
        self.pages_done + self.pages_failed.len() as u64
    }

    /// Percentage of processed pages that succeeded
    pub fn success_rate(&self) -> f64 {
        let total = self.pages_total();
        if total == 0 {
            0.0
        } else {
            self.pages_done as f64 / total as f64 * 100.0
        }
    }

    /// Percentage of successful pages served from the cache
    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.cache_hits + self.fetched;
        if served == 0 {
            0.0
        } else {
            self.cache_hits as f64 / served as f64 * 100.0
        }
    }

    /// Formats the report as markdown
    pub fn format_summary(&self) -> String {
        let mut md = String::new();

        md.push_str("# Crawl Summary\n\n");

        md.push_str("## Overall Statistics\n\n");
        md.push_str(&format!(
            "- **Status**: {}\n",
            if self.cancelled { "cancelled" } else { "completed" }
        ));
        md.push_str(&format!(
            "- **Duration**: {:.2} seconds\n",
            self.elapsed.as_secs_f64()
        ));
        md.push_str(&format!("- **Pages Done**: {}\n", self.pages_done));
        md.push_str(&format!("- **Pages Failed**: {}\n", self.pages_failed.len()));
        md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", self.success_rate()));

        md.push_str("## Cache\n\n");
        md.push_str("| Source | Pages |\n");
        md.push_str("|--------|-------|\n");
        md.push_str(&format!("| Cache | {} |\n", self.cache_hits));
        md.push_str(&format!("| Network | {} |\n\n", self.fetched));
        md.push_str(&format!("Cache hit rate: {:.2}%\n\n", self.cache_hit_rate()));

        if !self.pages_failed.is_empty() {
            md.push_str("## Failures\n\n");
            md.push_str("| URL | Reason |\n");
            md.push_str("|-----|--------|\n");
            for (url, reason) in self.pages_failed.iter().take(MAX_LISTED_FAILURES) {
                md.push_str(&format!("| {} | {} |\n", url, reason.replace('|', "\\|")));
            }
            if self.pages_failed.len() > MAX_LISTED_FAILURES {
                md.push_str(&format!(
                    "\n... and {} more\n",
                    self.pages_failed.len() - MAX_LISTED_FAILURES
                ));
            }
            md.push('\n');
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> CrawlReport {
        CrawlReport {
            pages_done: 3,
            pages_failed: vec![(
                "https://example.com/missing".to_string(),
                "HTTP 404 for https://example.com/missing".to_string(),
            )],
            cache_hits: 1,
            fetched: 2,
            cancelled: false,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_rates() {
        let report = report();
        assert_eq!(report.pages_total(), 4);
        assert!((report.success_rate() - 75.0).abs() < 1e-9);
        assert!((report.cache_hit_rate() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_rates_of_empty_report() {
        let report = CrawlReport::default();
        assert_eq!(report.success_rate(), 0.0);
        assert_eq!(report.cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_format_summary() {
        let md = report().format_summary();

        assert!(md.starts_with("# Crawl Summary"));
        assert!(md.contains("- **Status**: completed"));
        assert!(md.contains("- **Pages Done**: 3"));
        assert!(md.contains("| Cache | 1 |"));
        assert!(md.contains("| https://example.com/missing | HTTP 404"));
    }

    #[test]
    fn test_format_summary_without_failures() {
        let report = CrawlReport {
            cancelled: true,
            ..CrawlReport::default()
        };
        let md = report.format_summary();

        assert!(md.contains("- **Status**: cancelled"));
        assert!(!md.contains("## Failures"));
    }
}
