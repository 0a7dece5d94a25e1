//! Text normalization applied before feature extraction and classification.
//!
//! The output is a space separated token stream where fixed idioms are replaced by
//! sentinels (`POSIDIOM_<n>`, `NEGIDIOM_<n>`, `DOUBLENEG_<n>`), contractions are expanded
//! and words inside a negation scope carry a `NEG<k>_` marker, `k = 1` being the word right
//! after the trigger.
use {
    once_cell::sync::Lazy,
    regex::Regex,
    crate::lexicon::{
        POSITIVE_IDIOMS,
        NEGATIVE_IDIOMS,
        DOUBLE_NEGATIONS,
        CONTRACTIONS,
        NEGATION_TRIGGERS,
        NEGATION_SCOPE,
        NEGATION_DECAY,
    },
};

pub const POSITIVE_IDIOM_SENTINEL: &str = "POSIDIOM_";
pub const NEGATIVE_IDIOM_SENTINEL: &str = "NEGIDIOM_";
pub const DOUBLE_NEGATION_SENTINEL: &str = "DOUBLENEG_";

const NEGATION_MARKER: &str = "NEG";

struct PhraseRule {
    pattern: Regex,
    sentinel: String,
}

static PHRASE_RULES: Lazy<Vec<PhraseRule>> = Lazy::new(|| {
    let mut phrases: Vec<(&str, String)> = Vec::new();
    phrases.extend(DOUBLE_NEGATIONS.iter().enumerate().map(|(i, p)| (*p, format!("{}{}", DOUBLE_NEGATION_SENTINEL, i))));
    phrases.extend(NEGATIVE_IDIOMS.iter().enumerate().map(|(i, p)| (*p, format!("{}{}", NEGATIVE_IDIOM_SENTINEL, i))));
    phrases.extend(POSITIVE_IDIOMS.iter().enumerate().map(|(i, p)| (*p, format!("{}{}", POSITIVE_IDIOM_SENTINEL, i))));

    // longest phrases win when one idiom contains another
    phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    phrases.into_iter()
        .map(|(phrase, sentinel)| PhraseRule {
            pattern: phrase_pattern(phrase),
            sentinel,
        })
        .collect()
});

static CONTRACTION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut rules: Vec<(Regex, &'static str)> = CONTRACTIONS.iter()
        .map(|(from, to)| (word_pattern(&regex::escape(from)), *to))
        .collect();

    rules.extend([
        (word_pattern(r"(\w+)n't"), "$1 not"),
        (word_pattern(r"(\w+)'re"), "$1 are"),
        (word_pattern(r"(\w+)'ve"), "$1 have"),
        (word_pattern(r"(\w+)'ll"), "$1 will"),
        (word_pattern(r"(\w+)'d"), "$1 would"),
        (word_pattern(r"(\w+)'m"), "$1 am"),
    ]);

    rules
});

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| regex(r"[\p{L}\p{N}_'\-]+|[.!?;]"));

/// A token of normalized text, as seen by the feature extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NormalizedToken<'a> {
    Word {
        word: &'a str,
        /// position inside a negation scope, 1-based
        negation: Option<usize>,
    },
    PositiveIdiom,
    NegativeIdiom,
    DoubleNegation,
    SentenceBreak,
}

impl<'a> NormalizedToken<'a> {
    pub fn parse(token: &'a str) -> Self {
        if token.starts_with(POSITIVE_IDIOM_SENTINEL) {
            return Self::PositiveIdiom;
        }
        if token.starts_with(NEGATIVE_IDIOM_SENTINEL) {
            return Self::NegativeIdiom;
        }
        if token.starts_with(DOUBLE_NEGATION_SENTINEL) {
            return Self::DoubleNegation;
        }
        if is_sentence_break(token) {
            return Self::SentenceBreak;
        }

        if let Some((marker, word)) = token.split_once('_') {
            if let Some(position) = marker.strip_prefix(NEGATION_MARKER).and_then(|v| v.parse::<usize>().ok()) {
                if (1..=NEGATION_SCOPE).contains(&position) && !word.is_empty() {
                    return Self::Word {
                        word,
                        negation: Some(position),
                    };
                }
            }
        }

        Self::Word {
            word: token,
            negation: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::PositiveIdiom | Self::NegativeIdiom | Self::DoubleNegation)
    }
}

/// Strength of the negation at a given scope position (1-based).
pub fn negation_weight(position: usize) -> f32 {
    position.checked_sub(1)
        .and_then(|index| NEGATION_DECAY.get(index))
        .copied()
        .unwrap_or(0.0)
}

pub fn tokens(normalized: &str) -> impl Iterator<Item = NormalizedToken<'_>> {
    normalized.split_whitespace().map(NormalizedToken::parse)
}

pub fn normalize(raw_text: &str) -> String {
    let text = unify_quotes(&raw_text.to_lowercase());
    let text = replace_idioms(&text);
    let text = expand_contractions(&text);
    mark_negation_scope(&text)
}

fn unify_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' | '\u{00b4}' => '\'',
            other => other,
        })
        .collect()
}

fn replace_idioms(text: &str) -> String {
    let mut text = text.to_owned();
    for rule in PHRASE_RULES.iter() {
        if rule.pattern.is_match(&text) {
            let replacement = format!(" {} ", rule.sentinel);
            text = rule.pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
    }
    text
}

fn expand_contractions(text: &str) -> String {
    let mut text = text.to_owned();
    for (pattern, replacement) in CONTRACTION_RULES.iter() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, *replacement).into_owned();
        }
    }
    text
}

fn mark_negation_scope(text: &str) -> String {
    let mut output: Vec<String> = Vec::new();
    let mut scope_position = 0;
    let mut in_scope = false;

    for token in TOKEN_PATTERN.find_iter(text).map(|m| m.as_str()) {
        let parsed = NormalizedToken::parse(token);

        if parsed.is_sentinel() || parsed == NormalizedToken::SentenceBreak {
            in_scope = false;
            output.push(token.to_owned());
            continue;
        }

        if NEGATION_TRIGGERS.contains(token) {
            in_scope = true;
            scope_position = 0;
            output.push(token.to_owned());
            continue;
        }

        if in_scope {
            scope_position += 1;
            output.push(format!("{}{}_{}", NEGATION_MARKER, scope_position, token));
            if scope_position >= NEGATION_SCOPE {
                in_scope = false;
            }
        } else {
            output.push(token.to_owned());
        }
    }

    output.join(" ")
}

fn is_sentence_break(token: &str) -> bool {
    matches!(token, "." | "!" | "?" | ";")
}

fn phrase_pattern(phrase: &str) -> Regex {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    word_pattern(&words.join(r"\s+"))
}

fn word_pattern(body: &str) -> Regex {
    regex(&format!(r"\b{}\b", body))
}

fn regex(pattern: &str) -> Regex {
    // patterns are built from the static lexicon, a failure here is a programming error
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid lexicon pattern {}: {}", pattern, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn contractions_are_expanded() {
        assert_eq!(normalize("I can't say"), "i cannot NEG1_say");
        assert_eq!(normalize("they're here"), "they are here");
        assert_eq!(normalize("it doesn\u{2019}t fit"), "it does not NEG1_fit");
    }

    #[test]
    fn negation_scope_is_bounded() {
        let normalized = normalize("not one two three four five six");
        assert_eq!(normalized, "not NEG1_one NEG2_two NEG3_three NEG4_four NEG5_five six");
    }

    #[test]
    fn negation_scope_stops_at_sentence_break() {
        assert_eq!(normalize("not good. great"), "not NEG1_good . great");
    }

    #[test]
    fn negation_scope_stops_at_idiom() {
        let normalized = normalize("never thought it would be worth every penny honestly");
        let tokens: Vec<_> = tokens(&normalized).collect();

        assert!(tokens.contains(&NormalizedToken::PositiveIdiom));
        assert_eq!(tokens.last(), Some(&NormalizedToken::Word { word: "honestly", negation: None }));
    }

    #[test]
    fn double_negation_becomes_sentinel() {
        let normalized = normalize("No problem at all");
        let tokens: Vec<_> = tokens(&normalized).collect();

        assert_eq!(tokens[0], NormalizedToken::DoubleNegation);
        assert_eq!(tokens[1], NormalizedToken::Word { word: "at", negation: None });
    }

    #[test]
    fn longer_idiom_wins() {
        let normalized = normalize("Don't waste your money on this");
        assert!(normalized.starts_with(NEGATIVE_IDIOM_SENTINEL));
        assert!(!normalized.contains("waste"));
    }

    #[test]
    fn negation_markers_parse_back() {
        assert_eq!(NormalizedToken::parse("NEG3_good"), NormalizedToken::Word { word: "good", negation: Some(3) });
        assert_eq!(NormalizedToken::parse("neg3_good"), NormalizedToken::Word { word: "neg3_good", negation: None });
        assert_eq!(negation_weight(1), 1.0);
        assert_eq!(negation_weight(5), 0.2);
        assert_eq!(negation_weight(6), 0.0);
    }
}
