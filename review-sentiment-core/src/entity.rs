use {
    typed_builder::TypedBuilder,
    serde::Serialize,
    chrono::{DateTime, Utc},
    rand::{distributions::Alphanumeric, Rng},
    crate::{
        collector::CollectionOutcome,
        models::{AcceptedReview, SentimentLabel},
    },
};

// one row per accepted review, flat so it serializes into csv as is
#[derive(TypedBuilder, Serialize, Debug, Clone, PartialEq)]
pub struct ReviewEntity {
    session_id: String,
    product_id: String,
    review_id: String,
    // unique per session, unlike review_id which sources may leave blank
    #[serde(skip)]
    review_key: String,
    reviewer_name: Option<String>,
    title: String,
    text: String,
    rating: Option<f32>,
    submitted_at: Option<String>,
    verified_purchase: bool,
    sentiment: String,
    confidence: f32,
    score: f32,
    probability_negative: f32,
    probability_neutral: f32,
    probability_positive: f32,
    collected_at: String,
}

#[derive(TypedBuilder, Serialize, Debug, Clone, PartialEq)]
pub struct SessionSummaryEntity {
    session_id: String,
    product_id: String,
    target: String,
    threshold: Option<f32>,
    total_processed: u32,
    accepted: u32,
    filtered_by_quality: u32,
    filtered_by_language: u32,
    duplicates_skipped: u32,
    pages_fetched: u32,
    pages_attempted: u32,
    total_available: Option<u32>,
    stop_reason: String,
    positive_count: u32,
    negative_count: u32,
    neutral_count: u32,
    average_confidence: f32,
    average_score: f32,
    started_at: String,
    finished_at: String,
}

impl ReviewEntity {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn review_id(&self) -> &str {
        &self.review_id
    }

    pub fn review_key(&self) -> &str {
        &self.review_key
    }

    pub fn reviewer_name(&self) -> Option<&str> {
        self.reviewer_name.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rating(&self) -> Option<f32> {
        self.rating
    }

    pub fn submitted_at(&self) -> Option<&str> {
        self.submitted_at.as_deref()
    }

    pub fn verified_purchase(&self) -> bool {
        self.verified_purchase
    }

    pub fn sentiment(&self) -> &str {
        &self.sentiment
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn probabilities(&self) -> [f32; 3] {
        [self.probability_negative, self.probability_neutral, self.probability_positive]
    }

    pub fn collected_at(&self) -> &str {
        &self.collected_at
    }
}

impl SessionSummaryEntity {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    pub fn total_processed(&self) -> u32 {
        self.total_processed
    }

    pub fn accepted(&self) -> u32 {
        self.accepted
    }

    pub fn filtered_by_quality(&self) -> u32 {
        self.filtered_by_quality
    }

    pub fn filtered_by_language(&self) -> u32 {
        self.filtered_by_language
    }

    pub fn duplicates_skipped(&self) -> u32 {
        self.duplicates_skipped
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn pages_attempted(&self) -> u32 {
        self.pages_attempted
    }

    pub fn total_available(&self) -> Option<u32> {
        self.total_available
    }

    pub fn stop_reason(&self) -> &str {
        &self.stop_reason
    }

    /// negative, neutral, positive
    pub fn sentiment_counts(&self) -> [u32; 3] {
        [self.negative_count, self.neutral_count, self.positive_count]
    }

    pub fn average_confidence(&self) -> f32 {
        self.average_confidence
    }

    pub fn average_score(&self) -> f32 {
        self.average_score
    }

    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    pub fn finished_at(&self) -> &str {
        &self.finished_at
    }
}

pub fn into_review_entity(session_id: &str, product_id: &str, collected_at: &DateTime<Utc>, accepted: &AcceptedReview) -> ReviewEntity {
    let review = &accepted.review;
    let prediction = &accepted.prediction;
    let probability = |label: SentimentLabel| prediction.probabilities.get(&label).copied().unwrap_or(0.0);

    ReviewEntity::builder()
        .session_id(session_id.to_owned())
        .product_id(product_id.to_owned())
        .review_id(review.id.clone())
        .review_key(review.dedup_key())
        .reviewer_name(review.reviewer_name.clone())
        .title(review.title.clone())
        .text(review.text.clone())
        .rating(review.rating)
        .submitted_at(review.submitted_at.clone())
        .verified_purchase(review.verified_purchase)
        .sentiment(prediction.label.to_string())
        .confidence(prediction.confidence)
        .score(prediction.score)
        .probability_negative(probability(SentimentLabel::Negative))
        .probability_neutral(probability(SentimentLabel::Neutral))
        .probability_positive(probability(SentimentLabel::Positive))
        .collected_at(collected_at.to_rfc3339())
        .build()
}

pub fn into_session_summary_entity(session_id: &str, outcome: &CollectionOutcome) -> SessionSummaryEntity {
    let count = |label: SentimentLabel| outcome.accepted.iter().filter(|v| v.prediction.label == label).count() as u32;
    let average = |value: fn(&AcceptedReview) -> f32| if outcome.accepted.is_empty() {
        0.0
    } else {
        outcome.accepted.iter().map(value).sum::<f32>() / outcome.accepted.len() as f32
    };

    SessionSummaryEntity::builder()
        .session_id(session_id.to_owned())
        .product_id(outcome.product_id.clone())
        .target(outcome.target.to_string())
        .threshold(outcome.threshold)
        .total_processed(outcome.total_processed)
        .accepted(outcome.accepted.len() as u32)
        .filtered_by_quality(outcome.filtered_by_quality)
        .filtered_by_language(outcome.filtered_by_language)
        .duplicates_skipped(outcome.duplicates_skipped)
        .pages_fetched(outcome.pages_fetched)
        .pages_attempted(outcome.pages_attempted)
        .total_available(outcome.total_available)
        .stop_reason(outcome.stop_reason.to_string())
        .positive_count(count(SentimentLabel::Positive))
        .negative_count(count(SentimentLabel::Negative))
        .neutral_count(count(SentimentLabel::Neutral))
        .average_confidence(average(|v| v.prediction.confidence))
        .average_score(average(|v| v.prediction.score))
        .started_at(outcome.started_at.to_rfc3339())
        .finished_at(outcome.finished_at.to_rfc3339())
        .build()
}

pub fn into_review_entities(session_id: &str, outcome: &CollectionOutcome) -> Vec<ReviewEntity> {
    outcome.accepted.iter()
        .map(|accepted| into_review_entity(session_id, &outcome.product_id, &outcome.finished_at, accepted))
        .collect()
}

pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::collections::BTreeMap,
        crate::{
            collector::{StopReason, Target},
            models::{PredictionResult, RawReview},
        },
    };

    fn accepted(id: &str, label: SentimentLabel, confidence: f32) -> AcceptedReview {
        let rest = (1.0 - confidence) / 2.0;
        let probabilities: BTreeMap<SentimentLabel, f32> = SentimentLabel::ALL.iter()
            .map(|l| (*l, if *l == label { confidence } else { rest }))
            .collect();

        AcceptedReview {
            review: RawReview {
                id: id.to_owned(),
                reviewer_name: None,
                title: "title".to_owned(),
                text: "text".to_owned(),
                rating: Some(5.0),
                submitted_at: Some("2024-03-01".to_owned()),
                verified_purchase: false,
            },
            prediction: PredictionResult::from_probabilities(probabilities).unwrap(),
        }
    }

    fn outcome(accepted: Vec<AcceptedReview>) -> CollectionOutcome {
        let now = Utc::now();
        CollectionOutcome {
            product_id: "123".to_owned(),
            target: Target::Count(2),
            threshold: Some(0.6),
            total_processed: 3,
            filtered_by_quality: 3 - accepted.len() as u32,
            filtered_by_language: 0,
            skipped_short: 0,
            duplicates_skipped: 0,
            pages_fetched: 1,
            pages_attempted: 1,
            total_available: None,
            accepted,
            stop_reason: StopReason::TargetMet,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn summary_counts_sentiments() {
        let outcome = outcome(vec![
            accepted("a", SentimentLabel::Positive, 0.9),
            accepted("b", SentimentLabel::Negative, 0.7),
        ]);

        let summary = into_session_summary_entity("session", &outcome);
        assert_eq!(summary.sentiment_counts(), [1, 0, 1]);
        assert_eq!(summary.accepted(), 2);
        assert_eq!(summary.stop_reason(), "target_met");
        assert_eq!(summary.target(), "2");
        assert!((summary.average_confidence() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn review_entity_carries_prediction() {
        let outcome = outcome(vec![accepted("a", SentimentLabel::Positive, 0.9)]);
        let entities = into_review_entities("session", &outcome);

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].review_id(), "a");
        assert_eq!(entities[0].review_key(), "a");
        assert_eq!(entities[0].sentiment(), "positive");
        assert_eq!(entities[0].probabilities()[2], 0.9);
        assert!((entities[0].score() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn session_ids_are_alphanumeric() {
        let id = generate_session_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_session_id());
    }
}
