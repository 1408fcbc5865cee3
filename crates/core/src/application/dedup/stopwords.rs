// Stop-word lists for the content-similarity pass

use crate::domain::Language;

const ENGLISH: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are", "as",
    "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "us", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

const FRENCH: &[&str] = &[
    "ai", "aie", "au", "aux", "avec", "avons", "avez", "ce", "ces", "cet", "cette", "dans", "de",
    "des", "du", "elle", "elles", "en", "est", "et", "étaient", "était", "être", "eu", "il",
    "ils", "je", "la", "le", "les", "leur", "leurs", "lui", "ma", "mais", "me", "mes", "moi",
    "mon", "ne", "nos", "notre", "nous", "on", "ont", "ou", "par", "pas", "pour", "qu", "que",
    "qui", "sa", "se", "ses", "son", "sont", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un",
    "une", "vos", "votre", "vous",
];

const GERMAN: &[&str] = &[
    "aber", "alle", "als", "also", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis", "bist",
    "da", "damit", "das", "dass", "dein", "dem", "den", "der", "des", "die", "dir", "doch", "du",
    "durch", "ein", "eine", "einem", "einen", "einer", "eines", "er", "es", "für", "hat",
    "haben", "hatte", "ich", "ihr", "ihre", "im", "in", "ist", "ja", "kann", "mit", "nach",
    "nicht", "noch", "nur", "oder", "sein", "sich", "sie", "sind", "so", "um", "und", "uns",
    "unser", "unsere", "von", "vor", "war", "was", "wenn", "wer", "wie", "wir", "wird", "zu",
    "zum", "zur",
];

pub fn stop_words(language: Language) -> &'static [&'static str] {
    match language {
        Language::English => ENGLISH,
        Language::French => FRENCH,
        Language::German => GERMAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_are_lowercase() {
        for language in [Language::English, Language::French, Language::German] {
            assert!(stop_words(language)
                .iter()
                .all(|w| *w == w.to_lowercase().as_str()));
        }
    }
}
