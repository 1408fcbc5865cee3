// Duplicate Detector - exact-key and content-similarity dedup
//
// Incoming records are checked against the reference (master) set. A
// duplicate is dropped from the incoming set after its survivor absorbed
// any strictly newer content.

mod stopwords;
mod tfidf;

pub use stopwords::stop_words;
pub use tfidf::{TermVector, Vectorizer};

use crate::domain::{
    DomainError, DuplicateAssociation, DuplicateRegistry, KeyId, Locale, MatchType, RecordSet,
};
use tracing::{debug, info, warn};

/// Default cosine similarity at or above which two descriptions match
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Corpora smaller than this give unreliable idf weights
pub const DEFAULT_MIN_CORPUS_SIZE: usize = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct DedupSettings {
    pub similarity_threshold: f64,
    pub min_corpus_size: usize,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_corpus_size: DEFAULT_MIN_CORPUS_SIZE,
        }
    }
}

impl DedupSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(DomainError::ValidationError(format!(
                "similarity threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Everything one detector pass found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupReport {
    pub associations: Vec<DuplicateAssociation>,
    /// Survivors that took newer content from a duplicate
    pub refreshed: usize,
    /// Documents in the content-similarity corpus
    pub corpus_size: usize,
    pub corpus_too_small: bool,
}

impl DedupReport {
    pub fn count(&self, match_type: MatchType) -> usize {
        self.associations
            .iter()
            .filter(|a| a.match_type == match_type)
            .count()
    }

    pub fn absorb(&mut self, other: DedupReport) {
        self.associations.extend(other.associations);
        self.refreshed += other.refreshed;
        self.corpus_size = self.corpus_size.max(other.corpus_size);
        self.corpus_too_small |= other.corpus_too_small;
    }
}

pub struct DuplicateDetector {
    settings: DedupSettings,
}

impl DuplicateDetector {
    pub fn new(settings: DedupSettings) -> Self {
        Self { settings }
    }

    /// Resolve incoming records the registry already knows as duplicates.
    ///
    /// No comparison happens: the recorded original absorbs newer content
    /// (when it is in `master`) and the incoming copy is dropped.
    pub fn resolve_known(
        &self,
        registry: &DuplicateRegistry,
        master: &mut RecordSet,
        incoming: &mut RecordSet,
    ) -> DedupReport {
        let mut report = DedupReport::default();
        let known: Vec<KeyId> = incoming
            .keys()
            .filter(|k| registry.contains(k))
            .cloned()
            .collect();

        for key_id in known {
            let (Some(entry), Some(duplicate)) =
                (registry.original_of(&key_id), incoming.remove(&key_id))
            else {
                continue;
            };
            if let Some(original) = master.get_mut(&entry.original_id) {
                if original.update_if_newer(&duplicate) {
                    report.refreshed += 1;
                }
            }
            debug!(
                duplicate = %key_id,
                original = %entry.original_id,
                "Known duplicate resolved from registry"
            );
            report.associations.push(DuplicateAssociation::new(
                entry.original_id.clone(),
                key_id,
                entry.match_type,
            ));
        }
        report
    }

    /// Exact-key pass, then content pass. Duplicates are removed from
    /// `incoming`; survivors in `master` (or earlier incoming records on a
    /// first run) take strictly newer content.
    pub fn detect(&self, master: &mut RecordSet, incoming: &mut RecordSet, locale: Locale) -> DedupReport {
        let mut report = self.exact_key_pass(master, incoming);
        report.absorb(self.content_pass(master, incoming, locale));

        info!(
            exact = report.count(MatchType::ExactKey),
            content = report.count(MatchType::ContentMatch),
            refreshed = report.refreshed,
            "Duplicate detection complete"
        );
        report
    }

    fn exact_key_pass(&self, master: &mut RecordSet, incoming: &mut RecordSet) -> DedupReport {
        let mut report = DedupReport::default();
        let shared: Vec<KeyId> = incoming
            .keys()
            .filter(|k| master.contains_key(*k))
            .cloned()
            .collect();

        for key_id in shared {
            let (Some(existing), Some(duplicate)) = (master.get_mut(&key_id), incoming.remove(&key_id))
            else {
                continue;
            };
            if existing.update_if_newer(&duplicate) {
                report.refreshed += 1;
            }
            report.associations.push(DuplicateAssociation::new(
                key_id.clone(),
                key_id,
                MatchType::ExactKey,
            ));
        }
        report
    }

    fn content_pass(&self, master: &mut RecordSet, incoming: &mut RecordSet, locale: Locale) -> DedupReport {
        let mut report = DedupReport::default();

        let queries: Vec<KeyId> = incoming
            .iter()
            .filter(|(_, r)| !r.description.trim().is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        if queries.is_empty() {
            return report;
        }
        let references: Vec<KeyId> = master
            .iter()
            .filter(|(_, r)| !r.description.trim().is_empty())
            .map(|(k, _)| k.clone())
            .collect();
        let within_batch = references.is_empty();

        let mut documents: Vec<&str> = references
            .iter()
            .filter_map(|k| master.get(k))
            .map(|r| r.description.as_str())
            .collect();
        documents.extend(
            queries
                .iter()
                .filter_map(|k| incoming.get(k))
                .map(|r| r.description.as_str()),
        );

        report.corpus_size = documents.len();
        if documents.len() < self.settings.min_corpus_size {
            report.corpus_too_small = true;
            warn!(
                corpus_size = documents.len(),
                min_corpus_size = self.settings.min_corpus_size,
                "DuplicateCorpusTooSmall: similarity scores may be unreliable"
            );
        }

        let vectorizer = Vectorizer::new(stop_words(locale.language()));
        let vectors = vectorizer.fit_transform(&documents);
        let (reference_vectors, query_vectors) = vectors.split_at(references.len());

        // (original, duplicate, original lives in master)
        let mut matches: Vec<(KeyId, KeyId, bool)> = Vec::new();
        let mut absorbed = vec![false; queries.len()];

        for (qi, query_vector) in query_vectors.iter().enumerate() {
            let threshold = self.settings.similarity_threshold;
            let found = if within_batch {
                (0..qi)
                    .filter(|earlier| !absorbed[*earlier])
                    .find(|earlier| query_vector.cosine(&query_vectors[*earlier]) >= threshold)
                    .map(|earlier| (queries[earlier].clone(), false))
            } else {
                reference_vectors
                    .iter()
                    .position(|reference| query_vector.cosine(reference) >= threshold)
                    .map(|ri| (references[ri].clone(), true))
            };
            if let Some((original, in_master)) = found {
                absorbed[qi] = true;
                matches.push((original, queries[qi].clone(), in_master));
            }
        }

        for (original_id, duplicate_id, in_master) in matches {
            let Some(duplicate) = incoming.remove(&duplicate_id) else {
                continue;
            };
            let survivor = if in_master {
                master.get_mut(&original_id)
            } else {
                incoming.get_mut(&original_id)
            };
            if let Some(survivor) = survivor {
                if survivor.update_if_newer(&duplicate) {
                    report.refreshed += 1;
                }
            }
            debug!(original = %original_id, duplicate = %duplicate_id, "Content match");
            report.associations.push(DuplicateAssociation::new(
                original_id,
                duplicate_id,
                MatchType::ContentMatch,
            ));
        }
        report
    }
}
