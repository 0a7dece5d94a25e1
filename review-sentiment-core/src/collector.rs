//! Adaptive review collection.
//!
//! A session walks the source page by page, classifies every new review and keeps the ones the
//! predictor is confident enough about. The loop stops once the target is met, the source runs
//! dry, the source keeps failing, the page budget is spent or the caller cancels.
use {
    std::{collections::HashSet, fmt, sync::Arc, time::Duration},
    chrono::{DateTime, Utc},
    rand::Rng,
    serde::Serialize,
    tokio::sync::mpsc::UnboundedSender,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    crate::{
        error::CollectorError,
        language::LanguageDetector,
        models::{AcceptedReview, RawReview},
        predictor::SentimentPredictor,
        source::ReviewSource,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Count(u32),
    /// Everything the source has.
    All,
}

impl Target {
    pub fn parse(target: &str) -> Option<Self> {
        let target = target.trim().to_lowercase();
        match target.as_str() {
            "all" | "max" | "unlimited" => Some(Target::All),
            _ => target.parse::<u32>().ok().filter(|v| *v > 0).map(Target::Count),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Count(count) => write!(f, "{}", count),
            Target::All => f.write_str("all"),
        }
    }
}

/// Parses `0.7`, `70%`, `none` or `default`. `Ok(None)` means every review is accepted.
pub fn parse_threshold(threshold: &str) -> Result<Option<f32>, CollectorError> {
    let trimmed = threshold.trim().to_lowercase();
    if trimmed.is_empty() || trimmed == "none" || trimmed == "default" {
        return Ok(None);
    }

    let parsed = match trimmed.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f32>().map(|v| v / 100.0),
        None => trimmed.parse::<f32>(),
    };

    match parsed {
        Ok(value) => validate_threshold(value).map(Some),
        Err(_) => Err(CollectorError::InvalidThreshold(threshold.to_owned())),
    }
}

fn validate_threshold(threshold: f32) -> Result<f32, CollectorError> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(CollectorError::InvalidThreshold(threshold.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct CollectionRequest {
    pub product_id: String,
    pub target: Target,
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// ISO 639-1 code reviews must be written in.
    pub language: String,
    pub min_review_length: usize,
    pub max_consecutive_empty_pages: u32,
    pub max_consecutive_failures: u32,
    pub backoff: Duration,
    pub backoff_jitter: Duration,
    pub reviews_per_page: u32,
    /// Page budget for `Target::All` while the source has not reported its total.
    pub max_pages_unbounded: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            language: "en".to_owned(),
            min_review_length: 3,
            max_consecutive_empty_pages: 3,
            max_consecutive_failures: 3,
            backoff: Duration::from_millis(1000),
            backoff_jitter: Duration::from_millis(500),
            reviews_per_page: 20,
            max_pages_unbounded: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TargetMet,
    Exhausted,
    UnreliableSource,
    PageBudgetExceeded,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::TargetMet => "target_met",
            StopReason::Exhausted => "exhausted",
            StopReason::UnreliableSource => "unreliable_source",
            StopReason::PageBudgetExceeded => "page_budget_exceeded",
            StopReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FetchingPage,
    ProcessingPage,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub processed_count: u32,
    pub accepted_count: u32,
    pub stage: Stage,
    pub percent: f32,
}

/// Mutable state of one collection run.
#[derive(Debug)]
pub struct CollectionSession {
    pub target: Target,
    pub threshold: Option<f32>,
    pub accepted: Vec<AcceptedReview>,
    pub processed: u32,
    pub filtered_by_threshold: u32,
    pub filtered_by_language: u32,
    pub skipped_short: u32,
    pub duplicates_skipped: u32,
    pub consecutive_empty_pages: u32,
    pub consecutive_failures: u32,
    pub pages_attempted: u32,
    pub pages_fetched: u32,
    pub total_available: Option<u32>,
    seen: HashSet<String>,
}

impl CollectionSession {
    pub fn new(target: Target, threshold: Option<f32>) -> Self {
        Self {
            target,
            threshold,
            accepted: Vec::new(),
            processed: 0,
            filtered_by_threshold: 0,
            filtered_by_language: 0,
            skipped_short: 0,
            duplicates_skipped: 0,
            consecutive_empty_pages: 0,
            consecutive_failures: 0,
            pages_attempted: 0,
            pages_fetched: 0,
            total_available: None,
            seen: HashSet::new(),
        }
    }

    pub fn accepted_count(&self) -> u32 {
        self.accepted.len() as u32
    }

    /// `None` while collecting everything and the source has not said how much there is.
    pub fn effective_target(&self) -> Option<u32> {
        match self.target {
            Target::Count(count) => Some(count),
            Target::All => self.total_available,
        }
    }

    pub fn target_met(&self) -> bool {
        self.effective_target()
            .map(|target| self.accepted_count() >= target)
            .unwrap_or(false)
    }

    pub fn page_budget(&self, config: &CollectorConfig) -> u32 {
        let per_page = config.reviews_per_page.max(1);
        match (self.target, self.total_available) {
            (Target::Count(count), _) => div_ceil(count, per_page).saturating_mul(4).saturating_add(5),
            (Target::All, Some(total)) => div_ceil(total, per_page).saturating_mul(2).saturating_add(5),
            (Target::All, None) => config.max_pages_unbounded,
        }
    }

    pub fn percent(&self) -> f32 {
        match self.effective_target() {
            Some(0) => 100.0,
            Some(target) => (self.accepted_count() as f32 / target as f32 * 100.0).min(100.0),
            None => 50.0,
        }
    }

    pub fn stop_reason(&self, config: &CollectorConfig) -> Option<StopReason> {
        if self.target_met() {
            Some(StopReason::TargetMet)
        } else if self.consecutive_empty_pages >= config.max_consecutive_empty_pages {
            Some(StopReason::Exhausted)
        } else if self.consecutive_failures >= config.max_consecutive_failures {
            Some(StopReason::UnreliableSource)
        } else if self.pages_attempted >= self.page_budget(config) {
            Some(StopReason::PageBudgetExceeded)
        } else {
            None
        }
    }

    /// False when the review was already seen in this session.
    fn mark_seen(&mut self, review: &RawReview) -> bool {
        self.seen.insert(review.dedup_key())
    }

    fn progress(&self, stage: Stage) -> ProgressUpdate {
        ProgressUpdate {
            processed_count: self.processed,
            accepted_count: self.accepted_count(),
            stage,
            percent: self.percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub product_id: String,
    pub target: Target,
    pub threshold: Option<f32>,
    pub accepted: Vec<AcceptedReview>,
    pub total_processed: u32,
    pub filtered_by_quality: u32,
    pub filtered_by_language: u32,
    pub skipped_short: u32,
    pub duplicates_skipped: u32,
    pub pages_fetched: u32,
    pub pages_attempted: u32,
    pub total_available: Option<u32>,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Collector<S: ReviewSource> {
    source: S,
    predictor: Arc<SentimentPredictor>,
    detector: Arc<dyn LanguageDetector>,
    config: CollectorConfig,
}

impl<S: ReviewSource> Collector<S> {
    pub fn new(source: S, predictor: Arc<SentimentPredictor>, detector: Arc<dyn LanguageDetector>, config: CollectorConfig) -> Self {
        Self {
            source,
            predictor,
            detector,
            config,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub async fn collect(
        &self,
        request: &CollectionRequest,
        progress: Option<&UnboundedSender<ProgressUpdate>>,
        cancel: &CancellationToken,
    ) -> Result<CollectionOutcome, CollectorError> {
        let threshold = request.threshold.map(validate_threshold).transpose()?;
        if !self.predictor.is_available() {
            return Err(CollectorError::ModelUnavailable("model failed to load".to_owned()));
        }

        let started_at = Utc::now();
        let mut session = CollectionSession::new(request.target, threshold);
        info!(
            "starting collection for product {} (target: {}, threshold: {})",
            request.product_id,
            request.target,
            threshold.map(|v| v.to_string()).unwrap_or("none".to_owned()),
        );

        let mut page = 1;
        let stop_reason = loop {
            if session.target_met() {
                break StopReason::TargetMet;
            }
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            report(progress, session.progress(Stage::FetchingPage));
            session.pages_attempted += 1;

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                fetched = self.source.fetch_page(&request.product_id, page) => fetched,
            };

            match fetched {
                Ok(review_page) => {
                    session.consecutive_failures = 0;
                    session.pages_fetched += 1;
                    if let Some(total) = review_page.total_available {
                        session.total_available = Some(total);
                    }

                    report(progress, session.progress(Stage::ProcessingPage));
                    let new_reviews = self.process_page(&mut session, review_page.reviews)?;
                    if new_reviews == 0 {
                        session.consecutive_empty_pages += 1;
                    } else {
                        session.consecutive_empty_pages = 0;
                    }

                    debug!(
                        "page {} for product {}: {} new reviews, {} accepted so far",
                        page, request.product_id, new_reviews, session.accepted_count(),
                    );
                    page += 1;
                },
                Err(err) => {
                    session.consecutive_failures += 1;
                    warn!(
                        "failed to fetch page {} for product {} (failure {} in a row): {}",
                        page, request.product_id, session.consecutive_failures, err,
                    );
                }
            }

            if let Some(reason) = session.stop_reason(&self.config) {
                break reason;
            }

            if session.consecutive_failures > 0 {
                let delay = self.backoff_delay();
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break StopReason::Cancelled,
                    _ = tokio::time::sleep(delay) => {},
                }
            }
        };

        report(progress, session.progress(Stage::Completed));
        info!(
            "collection for product {} stopped ({}): {} processed, {} accepted, {} pages",
            request.product_id, stop_reason, session.processed, session.accepted_count(), session.pages_fetched,
        );

        let outcome = CollectionOutcome {
            product_id: request.product_id.clone(),
            target: request.target,
            threshold,
            total_processed: session.processed,
            filtered_by_quality: session.filtered_by_threshold,
            filtered_by_language: session.filtered_by_language,
            skipped_short: session.skipped_short,
            duplicates_skipped: session.duplicates_skipped,
            pages_fetched: session.pages_fetched,
            pages_attempted: session.pages_attempted,
            total_available: session.total_available,
            accepted: session.accepted,
            stop_reason,
            started_at,
            finished_at: Utc::now(),
        };

        if outcome.total_processed > 0 && outcome.accepted.is_empty() {
            return Err(CollectorError::NoQualifyingReviews {
                processed: outcome.total_processed,
                stop_reason,
                outcome: Box::new(outcome),
            });
        }

        Ok(outcome)
    }

    /// Returns the number of reviews on the page not seen before.
    fn process_page(&self, session: &mut CollectionSession, reviews: Vec<RawReview>) -> Result<u32, CollectorError> {
        let mut new_reviews = 0;

        for review in reviews {
            if session.target_met() {
                break;
            }

            if !session.mark_seen(&review) {
                session.duplicates_skipped += 1;
                continue;
            }
            new_reviews += 1;

            if review.text.trim().chars().count() < self.config.min_review_length {
                session.skipped_short += 1;
                continue;
            }

            match self.detector.detect(&review.text) {
                Ok(language) if language != self.config.language => {
                    session.filtered_by_language += 1;
                    continue;
                },
                Ok(_) => {},
                Err(err) => warn!("language detection failed for review {}, keeping it: {}", review.id, err),
            }

            let prediction = match self.predictor.predict(&review.text, &review.title)? {
                Some(v) => v,
                None => {
                    session.skipped_short += 1;
                    continue;
                }
            };
            session.processed += 1;

            match session.threshold {
                Some(threshold) if prediction.confidence < threshold => session.filtered_by_threshold += 1,
                _ => session.accepted.push(AcceptedReview {
                    review,
                    prediction,
                }),
            }
        }

        Ok(new_reviews)
    }

    fn backoff_delay(&self) -> Duration {
        let jitter_ms = self.config.backoff_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=jitter_ms)
        } else {
            0
        };
        self.config.backoff + Duration::from_millis(jitter)
    }
}

fn report(progress: Option<&UnboundedSender<ProgressUpdate>>, update: ProgressUpdate) {
    if let Some(progress) = progress {
        // the receiver going away does not stop the session
        let _ = progress.send(update);
    }
}

fn div_ceil(value: u32, divisor: u32) -> u32 {
    value / divisor + u32::from(value % divisor != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_parsing() {
        assert_eq!(parse_threshold("0.7").unwrap(), Some(0.7));
        assert_eq!(parse_threshold("70%").unwrap(), Some(0.7));
        assert_eq!(parse_threshold(" 1 ").unwrap(), Some(1.0));
        assert_eq!(parse_threshold("default").unwrap(), None);
        assert_eq!(parse_threshold("none").unwrap(), None);

        assert!(matches!(parse_threshold("1.2"), Err(CollectorError::InvalidThreshold(_))));
        assert!(matches!(parse_threshold("-0.1"), Err(CollectorError::InvalidThreshold(_))));
        assert!(matches!(parse_threshold("NaN"), Err(CollectorError::InvalidThreshold(_))));
        assert!(matches!(parse_threshold("high"), Err(CollectorError::InvalidThreshold(_))));
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse("50"), Some(Target::Count(50)));
        assert_eq!(Target::parse("ALL"), Some(Target::All));
        assert_eq!(Target::parse("0"), None);
        assert_eq!(Target::parse("many"), None);
    }

    #[test]
    fn page_budget() {
        let config = CollectorConfig::default();

        let session = CollectionSession::new(Target::Count(50), None);
        assert_eq!(session.page_budget(&config), 3 * 4 + 5);

        let mut session = CollectionSession::new(Target::All, None);
        assert_eq!(session.page_budget(&config), config.max_pages_unbounded);
        session.total_available = Some(41);
        assert_eq!(session.page_budget(&config), 3 * 2 + 5);
    }

    #[test]
    fn page_budget_handles_huge_targets() {
        let config = CollectorConfig::default();

        let mut session = CollectionSession::new(Target::All, None);
        session.total_available = Some(u32::MAX);
        assert_eq!(session.page_budget(&config), (u32::MAX / 20 + 1) * 2 + 5);

        let session = CollectionSession::new(Target::Count(u32::MAX), None);
        assert_eq!(session.page_budget(&config), (u32::MAX / 20 + 1) * 4 + 5);

        assert_eq!(div_ceil(u32::MAX, 1), u32::MAX);
        assert_eq!(div_ceil(40, 20), 2);
        assert_eq!(div_ceil(41, 20), 3);
    }

    #[test]
    fn percent_of_target() {
        let mut session = CollectionSession::new(Target::All, None);
        assert_eq!(session.percent(), 50.0);

        session.total_available = Some(0);
        assert_eq!(session.percent(), 100.0);

        let session = CollectionSession::new(Target::Count(40), None);
        assert_eq!(session.percent(), 0.0);
    }

    #[test]
    fn stop_reason_priority() {
        let config = CollectorConfig::default();
        let mut session = CollectionSession::new(Target::Count(1), None);
        session.consecutive_empty_pages = 3;
        session.consecutive_failures = 3;
        assert_eq!(session.stop_reason(&config), Some(StopReason::Exhausted));

        session.consecutive_empty_pages = 0;
        assert_eq!(session.stop_reason(&config), Some(StopReason::UnreliableSource));

        session.consecutive_failures = 2;
        session.pages_attempted = session.page_budget(&config);
        assert_eq!(session.stop_reason(&config), Some(StopReason::PageBudgetExceeded));
    }
}
