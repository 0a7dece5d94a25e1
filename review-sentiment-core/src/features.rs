//! Linguistic feature vector fed to the classifier next to the hashed TF-IDF terms.
//!
//! Every ratio is `count / max(1, denominator)` so no component can become NaN, and the
//! order of `FEATURE_NAMES` is the order the model artifact's scaler was fitted on.
use {
    std::collections::HashSet,
    once_cell::sync::Lazy,
    regex::Regex,
    crate::{
        lexicon::{
            word_polarity,
            ADJECTIVE_SUFFIXES,
            COMPARATIVES,
            CONTRASTIVE,
            EXTREME_WORDS,
            FIRST_PERSON,
            INTENSIFIERS,
            INTERROGATIVES,
            NEGATION_TRIGGERS,
            NEGATIVE_EMOTICONS,
            POSITIVE_EMOTICONS,
            RECOMMENDATION_WORDS,
            SHIFTERS,
            STRONG_NEGATIVE_WORDS,
            STRONG_POSITIVE_WORDS,
            WARRANTY_WORDS,
        },
        normalizer::{tokens, negation_weight, NormalizedToken},
    },
};

pub const FEATURE_COUNT: usize = 35;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "exclamation_ratio",
    "question_ratio",
    "ellipsis_ratio",
    "caps_ratio",
    "intensifier_ratio",
    "negation_ratio",
    "positive_emoticons",
    "negative_emoticons",
    "char_count",
    "word_count",
    "sentence_count",
    "capitalized_word_ratio",
    "repeated_char_runs",
    "interrogative_ratio",
    "comparative_ratio",
    "first_person_ratio",
    "strong_positive_ratio",
    "strong_negative_ratio",
    "net_sentiment",
    "negated_positive_ratio",
    "negated_negative_ratio",
    "avg_word_length",
    "type_token_ratio",
    "contrastive_ratio",
    "positive_idiom_count",
    "negative_idiom_count",
    "double_negation_count",
    "warranty_ratio",
    "shifter_proximity",
    "first_sentence_sentiment",
    "last_sentence_sentiment",
    "adjective_suffix_ratio",
    "extreme_word_count",
    "recommendation_balance",
    "emphasized_sentiment",
];

const SHIFTER_WINDOW: usize = 3;

static RAW_WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap_or_else(|err| panic!("{}", err)));
static ELLIPSIS_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}|…").unwrap_or_else(|err| panic!("{}", err)));

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES.iter()
            .position(|v| *v == name)
            .map(|index| self.values[index])
    }
}

pub fn extract(raw_text: &str, normalized_text: &str) -> FeatureVector {
    let punctuation = PunctuationStats::from_raw(raw_text);
    let emoticons = EmoticonStats::from_raw(raw_text);
    let length = LengthStats::from_raw(raw_text);
    let emphasis = EmphasisStats::from_raw(raw_text);
    let lexical = LexicalStats::from_normalized(normalized_text);
    let polarity = PolarityStats::from_normalized(normalized_text);
    let sentences = SentenceSentiment::from_normalized(normalized_text);

    let net_sentiment = ratio(polarity.positive - polarity.negative, lexical.words);
    let emphasized = net_sentiment * (1.0 + ratio(punctuation.exclamations, length.sentences));

    let values = [
        ratio(punctuation.exclamations, length.chars),
        ratio(punctuation.questions, length.chars),
        ratio(punctuation.ellipses, length.sentences),
        ratio(emphasis.uppercase_letters, length.letters),
        ratio(lexical.intensifiers, lexical.words),
        ratio(lexical.negations, lexical.words),
        emoticons.positive,
        emoticons.negative,
        length.chars,
        length.words,
        length.sentences,
        ratio(emphasis.capitalized_words, length.words),
        emphasis.repeated_runs,
        ratio(lexical.interrogatives, lexical.words),
        ratio(lexical.comparatives, lexical.words),
        ratio(lexical.first_person, lexical.words),
        ratio(polarity.strong_positive, lexical.words),
        ratio(polarity.strong_negative, lexical.words),
        net_sentiment,
        ratio(polarity.negated_positive, lexical.words),
        ratio(polarity.negated_negative, lexical.words),
        ratio(length.letters, length.words),
        ratio(lexical.distinct_words, lexical.words),
        ratio(lexical.contrastive, lexical.words),
        polarity.positive_idioms,
        polarity.negative_idioms,
        polarity.double_negations,
        ratio(lexical.warranty, lexical.words),
        ratio(polarity.shifter_proximity, lexical.words),
        sentences.first,
        sentences.last,
        ratio(lexical.adjective_suffixes, lexical.words),
        lexical.extreme,
        ratio(polarity.recommend - polarity.negated_recommend, polarity.recommend + polarity.negated_recommend),
        emphasized,
    ];

    FeatureVector {
        values: values.map(|v| if v.is_finite() { v } else { 0.0 }),
    }
}

fn ratio(count: f32, denominator: f32) -> f32 {
    count / denominator.max(1.0)
}

#[derive(Debug, Default, PartialEq)]
pub struct PunctuationStats {
    pub exclamations: f32,
    pub questions: f32,
    pub ellipses: f32,
}

impl PunctuationStats {
    pub fn from_raw(text: &str) -> Self {
        Self {
            exclamations: text.matches('!').count() as f32,
            questions: text.matches('?').count() as f32,
            ellipses: ELLIPSIS_PATTERN.find_iter(text).count() as f32,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct EmoticonStats {
    pub positive: f32,
    pub negative: f32,
}

impl EmoticonStats {
    pub fn from_raw(text: &str) -> Self {
        let text = text.to_lowercase();
        let count = |emoticons: &[&str]| emoticons.iter().map(|e| text.matches(e).count()).sum::<usize>() as f32;

        Self {
            positive: count(POSITIVE_EMOTICONS),
            negative: count(NEGATIVE_EMOTICONS),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct LengthStats {
    pub chars: f32,
    pub letters: f32,
    pub words: f32,
    pub sentences: f32,
}

impl LengthStats {
    pub fn from_raw(text: &str) -> Self {
        let words: Vec<&str> = RAW_WORD_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
        let sentences = text.split(|c: char| matches!(c, '.' | '!' | '?' | '…'))
            .filter(|s| s.chars().any(char::is_alphanumeric))
            .count();

        Self {
            chars: text.chars().count() as f32,
            letters: words.iter().map(|w| w.chars().filter(|c| c.is_alphabetic()).count()).sum::<usize>() as f32,
            words: words.len() as f32,
            sentences: sentences as f32,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct EmphasisStats {
    pub uppercase_letters: f32,
    pub capitalized_words: f32,
    pub repeated_runs: f32,
}

impl EmphasisStats {
    pub fn from_raw(text: &str) -> Self {
        let capitalized_words = RAW_WORD_PATTERN.find_iter(text)
            .map(|m| m.as_str())
            .filter(|w| {
                let letters: Vec<char> = w.chars().filter(|c| c.is_alphabetic()).collect();
                letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
            })
            .count();

        Self {
            uppercase_letters: text.chars().filter(|c| c.is_uppercase()).count() as f32,
            capitalized_words: capitalized_words as f32,
            repeated_runs: repeated_runs(text) as f32,
        }
    }
}

// runs of three or more identical letters, or of `!` / `?`
fn repeated_runs(text: &str) -> usize {
    let mut runs = 0;
    let mut previous: Option<char> = None;
    let mut run_length = 0;

    for c in text.chars().flat_map(char::to_lowercase) {
        if Some(c) == previous {
            run_length += 1;
            if run_length == 3 && (c.is_alphabetic() || c == '!' || c == '?') {
                runs += 1;
            }
        } else {
            previous = Some(c);
            run_length = 1;
        }
    }

    runs
}

#[derive(Debug, Default, PartialEq)]
pub struct LexicalStats {
    /// words and sentinels of the normalized text
    pub words: f32,
    pub distinct_words: f32,
    pub intensifiers: f32,
    pub negations: f32,
    pub interrogatives: f32,
    pub comparatives: f32,
    pub first_person: f32,
    pub contrastive: f32,
    pub warranty: f32,
    pub adjective_suffixes: f32,
    pub extreme: f32,
}

impl LexicalStats {
    pub fn from_normalized(normalized: &str) -> Self {
        let mut stats = Self::default();
        let mut distinct = HashSet::new();

        for token in tokens(normalized) {
            let word = match token {
                NormalizedToken::SentenceBreak => continue,
                NormalizedToken::Word { word, .. } => word,
                _ => {
                    stats.words += 1.0;
                    continue;
                },
            };

            stats.words += 1.0;
            distinct.insert(word);

            stats.intensifiers += hit(&INTENSIFIERS, word);
            stats.negations += hit(&NEGATION_TRIGGERS, word);
            stats.interrogatives += hit(&INTERROGATIVES, word);
            stats.comparatives += hit(&COMPARATIVES, word);
            stats.first_person += hit(&FIRST_PERSON, word);
            stats.contrastive += hit(&CONTRASTIVE, word);
            stats.warranty += hit(&WARRANTY_WORDS, word);
            stats.extreme += hit(&EXTREME_WORDS, word);

            if has_adjective_suffix(word) {
                stats.adjective_suffixes += 1.0;
            }
        }

        stats.distinct_words = distinct.len() as f32;
        stats
    }
}

fn hit(words: &HashSet<&'static str>, word: &str) -> f32 {
    if words.contains(word) { 1.0 } else { 0.0 }
}

fn has_adjective_suffix(word: &str) -> bool {
    ADJECTIVE_SUFFIXES.iter().any(|suffix| word.len() > suffix.len() + 2 && word.ends_with(suffix))
}

#[derive(Debug, Default, PartialEq)]
pub struct PolarityStats {
    /// decay weighted: a negated negative word counts as positive
    pub positive: f32,
    pub negative: f32,
    pub strong_positive: f32,
    pub strong_negative: f32,
    pub negated_positive: f32,
    pub negated_negative: f32,
    pub positive_idioms: f32,
    pub negative_idioms: f32,
    pub double_negations: f32,
    pub shifter_proximity: f32,
    pub recommend: f32,
    pub negated_recommend: f32,
}

impl PolarityStats {
    pub fn from_normalized(normalized: &str) -> Self {
        let mut stats = Self::default();
        let mut recent_words: Vec<&str> = Vec::new();

        for token in tokens(normalized) {
            match token {
                NormalizedToken::SentenceBreak => recent_words.clear(),
                NormalizedToken::PositiveIdiom => {
                    stats.positive += 1.0;
                    stats.positive_idioms += 1.0;
                },
                NormalizedToken::NegativeIdiom => {
                    stats.negative += 1.0;
                    stats.negative_idioms += 1.0;
                },
                NormalizedToken::DoubleNegation => {
                    stats.positive += 1.0;
                    stats.double_negations += 1.0;
                },
                NormalizedToken::Word { word, negation } => {
                    stats.add_word(word, negation);

                    if word_polarity(word) != 0.0 {
                        stats.shifter_proximity += shifter_proximity(&recent_words);
                    }
                    recent_words.push(word);
                },
            }
        }

        stats
    }

    fn add_word(&mut self, word: &str, negation: Option<usize>) {
        let polarity = word_polarity(word);

        match negation {
            None => {
                if polarity > 0.0 {
                    self.positive += 1.0;
                } else if polarity < 0.0 {
                    self.negative += 1.0;
                }
                if STRONG_POSITIVE_WORDS.contains(word) {
                    self.strong_positive += 1.0;
                }
                if STRONG_NEGATIVE_WORDS.contains(word) {
                    self.strong_negative += 1.0;
                }
                if RECOMMENDATION_WORDS.contains(word) {
                    self.recommend += 1.0;
                }
            },
            Some(position) => {
                let weight = negation_weight(position);
                if polarity > 0.0 {
                    self.negative += weight;
                    self.negated_positive += weight;
                } else if polarity < 0.0 {
                    self.positive += weight;
                    self.negated_negative += weight;
                }
                if RECOMMENDATION_WORDS.contains(word) {
                    self.negated_recommend += 1.0;
                }
            },
        }
    }
}

// 1/distance to the closest shifter among the previous few words
fn shifter_proximity(previous_words: &[&str]) -> f32 {
    previous_words.iter()
        .rev()
        .take(SHIFTER_WINDOW)
        .position(|word| SHIFTERS.contains(word))
        .map(|index| 1.0 / (index + 1) as f32)
        .unwrap_or(0.0)
}

#[derive(Debug, Default, PartialEq)]
pub struct SentenceSentiment {
    pub first: f32,
    pub last: f32,
}

impl SentenceSentiment {
    pub fn from_normalized(normalized: &str) -> Self {
        let mut sentences: Vec<Vec<&str>> = vec![Vec::new()];
        for token in normalized.split_whitespace() {
            if NormalizedToken::parse(token) == NormalizedToken::SentenceBreak {
                sentences.push(Vec::new());
            } else if let Some(current) = sentences.last_mut() {
                current.push(token);
            }
        }

        let scores: Vec<f32> = sentences.into_iter()
            .filter(|sentence| !sentence.is_empty())
            .map(|sentence| {
                let text = sentence.join(" ");
                let polarity = PolarityStats::from_normalized(&text);
                ratio(polarity.positive - polarity.negative, sentence.len() as f32)
            })
            .collect();

        Self {
            first: scores.first().copied().unwrap_or(0.0),
            last: scores.last().copied().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        proptest::prelude::*,
        crate::normalizer::normalize,
    };

    fn features(text: &str) -> FeatureVector {
        extract(text, &normalize(text))
    }

    fn net_sentiment(text: &str) -> f32 {
        features(text).get("net_sentiment").unwrap()
    }

    #[test]
    fn empty_text_gives_zero_vector() {
        let vector = features("");
        assert_eq!(vector.len(), FEATURE_COUNT);
        assert!(vector.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn negation_lowers_sentiment() {
        assert!(net_sentiment("not good") < net_sentiment("good"));
        assert!(net_sentiment("not good") < 0.0);
    }

    #[test]
    fn double_negation_reads_as_positive_idiom() {
        let no_problem = net_sentiment("no problem");
        let idiom = net_sentiment("worth every penny");
        let problem = net_sentiment("problem");

        assert!(no_problem > 0.0);
        assert!((no_problem - idiom).abs() < 1e-6);
        assert!(problem < 0.0);
    }

    #[test]
    fn negation_decays_with_distance() {
        let close = features("not good at all").get("negated_positive_ratio").unwrap();
        let far = features("not that it was really good").get("negated_positive_ratio").unwrap();
        assert!(close > far);
    }

    #[test]
    fn punctuation_and_emphasis() {
        let vector = features("AMAZING!!! Sooo good :)");

        assert!(vector.get("exclamation_ratio").unwrap() > 0.0);
        assert_eq!(vector.get("repeated_char_runs").unwrap(), 2.0);
        assert_eq!(vector.get("positive_emoticons").unwrap(), 1.0);
        assert_eq!(vector.get("capitalized_word_ratio").unwrap(), 1.0 / 3.0);
        assert!(vector.get("emphasized_sentiment").unwrap() > vector.get("net_sentiment").unwrap());
    }

    #[test]
    fn sentence_level_sentiment() {
        let vector = features("Terrible packaging. But the blender itself is great!");
        assert!(vector.get("first_sentence_sentiment").unwrap() < 0.0);
        assert!(vector.get("last_sentence_sentiment").unwrap() > 0.0);
        assert!(vector.get("contrastive_ratio").unwrap() > 0.0);
    }

    #[test]
    fn recommendation_balance() {
        assert_eq!(features("I recommend it").get("recommendation_balance").unwrap(), 1.0);
        assert_eq!(features("I would not recommend it").get("recommendation_balance").unwrap(), -1.0);
        assert_eq!(features("it arrived").get("recommendation_balance").unwrap(), 0.0);
    }

    #[test]
    fn shifter_proximity_counts_nearby_shifters() {
        assert_eq!(shifter_proximity(&["not"]), 1.0);
        assert_eq!(shifter_proximity(&["slightly", "too"]), 0.5);
        assert_eq!(shifter_proximity(&["hardly", "a", "b", "c"]), 0.0);
    }

    proptest! {
        #[test]
        fn vector_is_always_finite(text in "\\PC{0,200}") {
            let vector = features(&text);
            prop_assert_eq!(vector.len(), FEATURE_COUNT);
            prop_assert!(vector.as_slice().iter().all(|v| v.is_finite()));
        }
    }
}
