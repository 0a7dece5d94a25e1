use {
    std::{collections::BTreeMap, fmt},
    serde::{Serialize, Deserialize},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawReview {
    pub id: String,
    #[serde(default)]
    pub reviewer_name: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub verified_purchase: bool,
}

impl RawReview {
    /// Identity of the review within a session, the trimmed text when the source gives no id.
    pub fn dedup_key(&self) -> String {
        if self.id.trim().is_empty() {
            format!("text:{}", self.text.trim())
        } else {
            self.id.clone()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [Self::Negative, Self::Neutral, Self::Positive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "negative" | "label_0" | "neg" => Some(Self::Negative),
            "neutral" | "label_1" | "neu" => Some(Self::Neutral),
            "positive" | "label_2" | "pos" => Some(Self::Positive),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: SentimentLabel,
    pub confidence: f32,
    /// 0 is fully negative, 0.5 neutral, 1 fully positive
    pub score: f32,
    pub probabilities: BTreeMap<SentimentLabel, f32>,
}

impl PredictionResult {
    pub fn from_probabilities(probabilities: BTreeMap<SentimentLabel, f32>) -> Option<Self> {
        let (label, confidence) = probabilities.iter()
            .filter(|(_, p)| p.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, p)| (*label, p.clamp(0.0, 1.0)))?;

        let score = match label {
            SentimentLabel::Negative => (1.0 - confidence) * 0.5,
            SentimentLabel::Neutral => 0.5,
            SentimentLabel::Positive => 0.5 + confidence * 0.5,
        };

        Some(Self {
            label,
            confidence,
            score,
            probabilities,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AcceptedReview {
    pub review: RawReview,
    pub prediction: PredictionResult,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<RawReview>,
    #[serde(default)]
    pub total_available: Option<u32>,
}
