// word lists shared by the normalizer and the feature extractor.
// all entries are lowercase, matching is done on lowercased text.
use {
    std::collections::HashSet,
    once_cell::sync::Lazy,
};

pub const POSITIVE_IDIOMS: &[&str] = &[
    "worth every penny",
    "does the trick",
    "did the trick",
    "works like a charm",
    "worked like a charm",
    "hit the spot",
    "exceeded my expectations",
    "exceeded expectations",
    "blown away",
    "can't go wrong",
    "cannot go wrong",
    "couldn't be happier",
    "could not be happier",
    "best purchase",
    "highly recommend",
    "five stars",
    "a must have",
    "must-have",
    "game changer",
    "bang for your buck",
    "bang for the buck",
    "money well spent",
    "top notch",
    "top-notch",
    "thumbs up",
    "over the moon",
    "well worth it",
    "works as advertised",
];

pub const NEGATIVE_IDIOMS: &[&str] = &[
    "waste of money",
    "waste of time",
    "don't waste your money",
    "do not waste your money",
    "save your money",
    "piece of junk",
    "piece of crap",
    "fell apart",
    "falls apart",
    "stopped working",
    "quit working",
    "not worth it",
    "not worth the money",
    "returned it",
    "sent it back",
    "buyer beware",
    "rip off",
    "ripoff",
    "thumbs down",
    "one star",
    "zero stars",
    "dead on arrival",
    "what a joke",
    "cheaply made",
    "never again",
    "too good to be true",
    "total lemon",
];

// phrases built from two negative parts that read as praise
pub const DOUBLE_NEGATIONS: &[&str] = &[
    "no problem",
    "no problems",
    "no issues",
    "no issue",
    "no complaints",
    "not bad",
    "not too bad",
    "can't complain",
    "cannot complain",
    "nothing wrong",
    "never disappoints",
    "not disappointed",
    "wasn't disappointed",
    "was not disappointed",
    "didn't disappoint",
    "did not disappoint",
    "no regrets",
    "never fails",
];

// irregular forms first, generic suffix rules are applied by the normalizer afterwards
pub const CONTRACTIONS: &[(&str, &str)] = &[
    ("can't", "cannot"),
    ("won't", "will not"),
    ("shan't", "shall not"),
    ("ain't", "is not"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("there's", "there is"),
    ("what's", "what is"),
    ("let's", "let us"),
    ("dont", "do not"),
    ("doesnt", "does not"),
    ("didnt", "did not"),
    ("isnt", "is not"),
    ("wasnt", "was not"),
    ("werent", "were not"),
    ("cant", "cannot"),
    ("couldnt", "could not"),
    ("wouldnt", "would not"),
    ("shouldnt", "should not"),
    ("havent", "have not"),
    ("hasnt", "has not"),
];

pub const NEGATION_SCOPE: usize = 5;
pub const NEGATION_DECAY: [f32; NEGATION_SCOPE] = [1.0, 0.8, 0.6, 0.4, 0.2];

pub static NEGATION_TRIGGERS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "nowhere",
    "cannot", "without", "hardly", "barely", "scarcely", "lack", "lacks", "lacking",
].into_iter().collect());

pub static POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "superb", "outstanding",
    "brilliant", "love", "loved", "loves", "best", "better", "happy", "pleased", "perfect",
    "perfectly", "awesome", "incredible", "beautiful", "nice", "sturdy", "durable", "reliable",
    "comfortable", "easy", "fast", "quick", "recommend", "recommended", "impressed",
    "impressive", "satisfied", "solid", "worth", "value", "quality", "works", "worked",
    "helpful", "flawless", "glad", "enjoy", "enjoyed", "favorite", "fine", "smooth",
    "gorgeous", "cute", "convenient", "efficient", "effective", "affordable", "bargain",
    "fabulous", "terrific", "delighted", "exceptional", "stellar",
].into_iter().collect());

pub static NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "bad", "terrible", "awful", "horrible", "poor", "poorly", "worst", "worse", "hate",
    "hated", "disappointing", "disappointed", "disappointment", "broken", "broke", "defective",
    "cheap", "flimsy", "useless", "waste", "junk", "garbage", "trash", "problem", "problems",
    "issue", "issues", "fail", "failed", "fails", "failure", "wrong", "damaged", "refund",
    "return", "returned", "slow", "difficult", "uncomfortable", "leak", "leaks", "leaking",
    "crack", "cracked", "missing", "fake", "scam", "overpriced", "mediocre", "annoying",
    "frustrating", "unreliable", "faulty", "ripped", "smell", "smells", "noisy", "dull",
    "ugly", "regret", "disgusting", "pathetic",
].into_iter().collect());

pub static STRONG_POSITIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "excellent", "amazing", "wonderful", "fantastic", "superb", "outstanding", "brilliant",
    "love", "loved", "perfect", "awesome", "incredible", "flawless", "exceptional",
    "fabulous", "terrific", "stellar", "best",
].into_iter().collect());

pub static STRONG_NEGATIVE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "terrible", "awful", "horrible", "worst", "hate", "hated", "useless", "garbage",
    "trash", "junk", "scam", "disgusting", "pathetic", "defective", "broken",
].into_iter().collect());

pub static EXTREME_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "best", "worst", "perfect", "terrible", "horrible", "awful", "amazing", "incredible",
    "flawless", "garbage", "useless", "outstanding", "excellent", "disgusting", "fantastic",
    "atrocious", "never", "always",
].into_iter().collect());

pub static INTENSIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "very", "really", "extremely", "so", "super", "totally", "absolutely", "incredibly",
    "highly", "completely", "truly", "quite", "too", "utterly", "remarkably", "seriously",
    "insanely", "especially",
].into_iter().collect());

pub static INTERROGATIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "what", "why", "how", "when", "where", "who", "which", "whom", "whose",
].into_iter().collect());

pub static COMPARATIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "better", "worse", "more", "less", "than", "compared", "cheaper", "faster", "slower",
    "bigger", "smaller", "stronger", "weaker", "nicer", "easier", "harder",
].into_iter().collect());

pub static FIRST_PERSON: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "i", "me", "my", "mine", "myself", "we", "us", "our", "ours", "ourselves",
].into_iter().collect());

pub static CONTRASTIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "but", "however", "although", "though", "yet", "whereas", "nevertheless", "nonetheless",
    "except", "unfortunately", "otherwise",
].into_iter().collect());

pub static WARRANTY_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "warranty", "refund", "refunded", "return", "returned", "returning", "replacement",
    "replace", "exchange", "guarantee", "rma", "support",
].into_iter().collect());

// words that weaken or flip the polarity of what follows them
pub static SHIFTERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut shifters: HashSet<&'static str> = NEGATION_TRIGGERS.iter().copied().collect();
    shifters.extend(["rarely", "seldom", "less", "least", "somewhat", "slightly", "almost"]);
    shifters
});

pub static RECOMMENDATION_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| [
    "recommend", "recommended", "recommending", "recommends", "suggest", "endorse",
].into_iter().collect());

pub const ADJECTIVE_SUFFIXES: &[&str] = &[
    "ful", "ous", "ive", "able", "ible", "less", "ic", "ish", "al", "ent", "ant",
];

pub const POSITIVE_EMOTICONS: &[&str] = &[
    ":)", ":-)", ":d", ":-d", ";)", ";-)", "=)", ":]", "<3", "😀", "😊", "😍", "👍", "❤", "🙂", "😁",
];

pub const NEGATIVE_EMOTICONS: &[&str] = &[
    ":(", ":-(", ":'(", "=(", ":/", ":-/", ":[", "😞", "😠", "😡", "👎", "💔", "😢", "🙁",
];

/// Polarity of a bare word: +1 for positive lexicon entries, -1 for negative ones.
pub fn word_polarity(word: &str) -> f32 {
    if POSITIVE_WORDS.contains(word) {
        1.0
    } else if NEGATIVE_WORDS.contains(word) {
        -1.0
    } else {
        0.0
    }
}
