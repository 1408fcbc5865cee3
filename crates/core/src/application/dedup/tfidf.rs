// TF-IDF vectorizer with cosine similarity
//
// Term weights: raw count x smooth idf, ln((1 + n) / (1 + df)) + 1,
// then L2-normalised so cosine similarity is a dot product.

use std::collections::{HashMap, HashSet};

/// Sparse L2-normalised document vector (term index -> weight)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: HashMap<usize, f64>,
}

impl TermVector {
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn cosine(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|o| w * o))
            .sum()
    }
}

pub struct Vectorizer {
    stop_words: HashSet<&'static str>,
}

impl Vectorizer {
    pub fn new(stop_words: &[&'static str]) -> Self {
        Self {
            stop_words: stop_words.iter().copied().collect(),
        }
    }

    /// Lowercased tokens of at least two word characters, stop words removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2 && !self.stop_words.contains(t))
            .map(str::to_string)
            .collect()
    }

    /// Fit on the corpus and return one vector per document, in order
    pub fn fit_transform(&self, documents: &[&str]) -> Vec<TermVector> {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();

        let counts: Vec<HashMap<usize, f64>> = documents
            .iter()
            .map(|doc| {
                let mut tf: HashMap<usize, f64> = HashMap::new();
                for token in self.tokenize(doc) {
                    let next = vocabulary.len();
                    let term = *vocabulary.entry(token).or_insert(next);
                    if term == document_frequency.len() {
                        document_frequency.push(0);
                    }
                    let count = tf.entry(term).or_insert(0.0);
                    if *count == 0.0 {
                        document_frequency[term] += 1;
                    }
                    *count += 1.0;
                }
                tf
            })
            .collect();

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        counts
            .into_iter()
            .map(|tf| {
                let mut weights: HashMap<usize, f64> = tf
                    .into_iter()
                    .map(|(term, count)| (term, count * idf[term]))
                    .collect();
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    weights.values_mut().for_each(|w| *w /= norm);
                }
                TermVector { weights }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dedup::stopwords::stop_words;
    use crate::domain::Language;

    fn english() -> Vectorizer {
        Vectorizer::new(stop_words(Language::English))
    }

    #[test]
    fn test_tokenize() {
        let tokens = english().tokenize("We need a C++ dev: Rust, k8s & AWS_Lambda!");
        assert_eq!(tokens, vec!["need", "dev", "rust", "k8s", "aws_lambda"]);
    }

    #[test]
    fn test_paraphrase_is_similar_and_unrelated_is_not() {
        let docs = [
            "We are hiring a senior Rust engineer to build distributed storage systems with async networking",
            "We are hiring a senior Rust developer to build distributed storage systems with async networking",
            "Registered nurse needed for night shifts in pediatric intensive care unit",
        ];
        let vectors = english().fit_transform(&docs);

        let paraphrase = vectors[0].cosine(&vectors[1]);
        assert!(paraphrase >= 0.75, "paraphrase similarity {paraphrase}");
        assert!(paraphrase < 1.0);
        assert_eq!(vectors[0].cosine(&vectors[2]), 0.0);
    }

    #[test]
    fn test_identical_documents_score_one() {
        let docs = ["Rust backend role", "Rust backend role"];
        let vectors = english().fit_transform(&docs);
        assert!((vectors[0].cosine(&vectors[1]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_word_only_document_is_empty() {
        let vectors = english().fit_transform(&["the and of", "rust"]);
        assert!(vectors[0].is_empty());
        assert_eq!(vectors[0].cosine(&vectors[1]), 0.0);
    }
}
