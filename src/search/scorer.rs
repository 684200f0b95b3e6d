//! Relevance scoring

/// Default BM25 term-frequency saturation
pub const DEFAULT_K1: f64 = 1.2;

/// Default BM25 length normalization
pub const DEFAULT_B: f64 = 0.75;

/// Collection-wide statistics a scorer needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusStats {
    pub document_count: u64,
    pub average_length: f64,
}

impl CorpusStats {
    pub fn new(document_count: u64, total_length: u64) -> Self {
        let average_length = if document_count == 0 {
            0.0
        } else {
            total_length as f64 / document_count as f64
        };
        Self {
            document_count,
            average_length,
        }
    }
}

/// Scores one (term, document) match
pub trait RelevanceScorer: Send + Sync {
    /// Contribution of a term with `term_frequency` occurrences in a document
    /// of `document_length` tokens, where the term appears in
    /// `document_frequency` documents of the corpus
    fn score(
        &self,
        term_frequency: u32,
        document_length: u32,
        document_frequency: u64,
        stats: &CorpusStats,
    ) -> f64;

    fn name(&self) -> &'static str;
}

/// Okapi BM25
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25 {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25 {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }
}

impl Bm25 {
    pub fn new(k1: f64, b: f64) -> Self {
        Self { k1, b }
    }

    /// `ln(1 + (N - df + 0.5) / (df + 0.5))`, never negative
    pub fn idf(document_count: u64, document_frequency: u64) -> f64 {
        let n = document_count as f64;
        let df = document_frequency as f64;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl RelevanceScorer for Bm25 {
    fn score(
        &self,
        term_frequency: u32,
        document_length: u32,
        document_frequency: u64,
        stats: &CorpusStats,
    ) -> f64 {
        if term_frequency == 0 {
            return 0.0;
        }

        let tf = term_frequency as f64;
        let length_ratio = if stats.average_length > 0.0 {
            document_length as f64 / stats.average_length
        } else {
            1.0
        };

        let idf = Self::idf(stats.document_count, document_frequency);
        let norm = self.k1 * (1.0 - self.b + self.b * length_ratio);
        idf * tf * (self.k1 + 1.0) / (tf + norm)
    }

    fn name(&self) -> &'static str {
        "bm25"
    }
}
