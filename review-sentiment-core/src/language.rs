use {
    std::collections::{HashMap, HashSet},
    once_cell::sync::Lazy,
    whatlang::Lang,
    crate::error::LanguageError,
};

const MIN_STOPWORD_HITS: usize = 1;

pub trait LanguageDetector: Send + Sync {
    /// ISO 639-1 code of the detected language.
    fn detect(&self, text: &str) -> Result<String, LanguageError>;
}

static STOPWORDS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let profiles: [(&str, &[&str]); 6] = [
        ("en", &["the", "and", "is", "it", "this", "to", "of", "for", "was", "with", "my", "i", "not", "but", "very", "you", "have", "that", "are", "on"]),
        ("es", &["el", "la", "los", "las", "es", "y", "de", "que", "muy", "pero", "para", "con", "no", "lo", "una", "un", "por", "mi", "producto", "bueno"]),
        ("fr", &["le", "la", "les", "est", "et", "de", "des", "que", "très", "mais", "pour", "avec", "pas", "une", "un", "je", "ce", "mon", "produit", "bien"]),
        ("de", &["der", "die", "das", "ist", "und", "nicht", "sehr", "aber", "für", "mit", "ein", "eine", "ich", "es", "zu", "auf", "mein", "gut", "produkt", "auch"]),
        ("pt", &["o", "os", "as", "é", "e", "de", "que", "muito", "mas", "para", "com", "não", "uma", "um", "eu", "meu", "produto", "bom", "por", "isso"]),
        ("it", &["il", "lo", "gli", "è", "e", "di", "che", "molto", "ma", "per", "con", "non", "una", "un", "io", "mio", "prodotto", "buono", "questo", "sono"]),
    ];

    profiles.into_iter()
        .map(|(language, words)| (language, words.iter().copied().collect()))
        .collect()
});

/// Trigram detection, falling back to stopword profiles when the guess is unreliable,
/// which is common for reviews of a few words.
pub struct TrigramLanguageDetector {
    fallback: StopwordLanguageDetector,
}

impl TrigramLanguageDetector {
    pub fn new() -> Self {
        Self {
            fallback: StopwordLanguageDetector::new(),
        }
    }
}

impl Default for TrigramLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for TrigramLanguageDetector {
    fn detect(&self, text: &str) -> Result<String, LanguageError> {
        match whatlang::detect(text) {
            Some(info) if info.is_reliable() => Ok(iso_639_1(info.lang()).to_owned()),
            _ => self.fallback.detect(text),
        }
    }
}

// languages without a two-letter mapping keep their three-letter code
fn iso_639_1(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Spa => "es",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Nld => "nl",
        Lang::Rus => "ru",
        Lang::Pol => "pl",
        Lang::Ukr => "uk",
        Lang::Tur => "tr",
        Lang::Swe => "sv",
        Lang::Jpn => "ja",
        Lang::Cmn => "zh",
        Lang::Kor => "ko",
        Lang::Ara => "ar",
        other => other.code(),
    }
}

/// Picks the language whose stopword profile covers the most words of the text.
pub struct StopwordLanguageDetector {
    min_hits: usize,
}

impl StopwordLanguageDetector {
    pub fn new() -> Self {
        Self {
            min_hits: MIN_STOPWORD_HITS,
        }
    }
}

impl Default for StopwordLanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for StopwordLanguageDetector {
    fn detect(&self, text: &str) -> Result<String, LanguageError> {
        let text = text.to_lowercase();
        let words: Vec<&str> = text.split(|c: char| !c.is_alphabetic())
            .filter(|w| !w.is_empty())
            .collect();

        let mut best: Option<(&str, usize)> = None;
        let mut tied = false;

        // sorted for a deterministic result
        let mut languages: Vec<&&str> = STOPWORDS.keys().collect();
        languages.sort();

        for language in languages {
            let stopwords = &STOPWORDS[*language];
            let hits = words.iter().filter(|w| stopwords.contains(*w)).count();

            match best {
                Some((_, best_hits)) if hits == best_hits => tied = true,
                Some((_, best_hits)) if hits < best_hits => {},
                _ => {
                    best = Some((*language, hits));
                    tied = false;
                }
            }
        }

        match best {
            Some((language, hits)) if hits >= self.min_hits && !tied => Ok(language.to_string()),
            _ => Err(LanguageError::Undetermined),
        }
    }
}
