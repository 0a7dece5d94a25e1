use {
    std::sync::Arc,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    review_sentiment_core::{
        collector::{CollectionOutcome, CollectionRequest, Collector},
        config::Config,
        database::Database,
        entity::{generate_session_id, into_review_entities, into_session_summary_entity},
        error::CollectorError,
        export::{write_csv, write_json_by_sentiment},
        source::{product_id_from_url, ReviewSource},
    },
    crate::progress::report_progress,
};

pub async fn collect_step<S: ReviewSource>(
    config: &Config,
    collector: &Collector<S>,
    database: Option<Arc<Database>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    info!("running collect step");

    let step = &config.steps.collector;
    let target = step.target();
    let threshold = step.confidence_threshold()?;

    for product in &step.products {
        if cancel.is_cancelled() {
            warn!("collection cancelled, skipping remaining products");
            break;
        }

        let product_id = match product_id_from_url(product) {
            Some(v) => v,
            None => {
                warn!("no product id in \"{}\", skipping", product);
                continue;
            }
        };

        let request = CollectionRequest {
            product_id: product_id.clone(),
            target,
            threshold,
        };

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(report_progress(format!("collecting reviews for {}", product_id), progress_rx));
        let result = collector.collect(&request, Some(&progress_tx), &cancel).await;
        drop(progress_tx);
        reporter.await?;

        let outcome = match result {
            Ok(v) => v,
            Err(CollectorError::NoQualifyingReviews { processed, stop_reason, outcome }) => {
                warn!(
                    "product {}: none of the {} processed reviews met the confidence threshold (stopped: {}), try lowering it",
                    product_id, processed, stop_reason,
                );
                *outcome
            },
            Err(err) => return Err(err.into()),
        };

        save_outcome(config, database.as_deref(), &outcome).await?;
    }

    Ok(())
}

async fn save_outcome(config: &Config, database: Option<&Database>, outcome: &CollectionOutcome) -> anyhow::Result<()> {
    let session_id = generate_session_id();
    let summary = into_session_summary_entity(&session_id, outcome);
    let reviews = into_review_entities(&session_id, outcome);

    let [negative, neutral, positive] = summary.sentiment_counts();
    info!(
        "session {} for product {}: {} reviews (positive: {}, negative: {}, neutral: {}), avg confidence {:.2}, avg score {:.3}, stopped: {}",
        session_id,
        outcome.product_id,
        reviews.len(),
        positive,
        negative,
        neutral,
        summary.average_confidence(),
        summary.average_score(),
        outcome.stop_reason,
    );

    if let Some(database) = database {
        database.save_session(&summary, &reviews).await?;
    }

    if config.steps.export.enabled && !reviews.is_empty() {
        let output_dir = config.steps.export.output_dir();
        write_csv(&output_dir.join(format!("reviews_{}_{}.csv", outcome.product_id, session_id)), &reviews)?;
        write_json_by_sentiment(&output_dir, &outcome.product_id, &reviews)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        review_sentiment_core::{
            error::SourceError,
            language::TrigramLanguageDetector,
            model::{Classifier, ModelInput},
            models::{RawReview, ReviewPage, SentimentLabel},
            predictor::SentimentPredictor,
        },
    };

    struct SinglePageSource;

    #[async_trait]
    impl ReviewSource for SinglePageSource {
        async fn fetch_page(&self, _product_id: &str, page: u32) -> Result<ReviewPage, SourceError> {
            let reviews = if page == 1 {
                (0..3)
                    .map(|id| RawReview {
                        id: format!("r{}", id),
                        reviewer_name: None,
                        title: String::new(),
                        text: format!("the blender is fine and it works {}", id),
                        rating: Some(3.0),
                        submitted_at: None,
                        verified_purchase: false,
                    })
                    .collect()
            } else {
                Vec::new()
            };

            Ok(ReviewPage {
                reviews,
                total_available: None,
            })
        }
    }

    struct UnsureClassifier;

    impl Classifier for UnsureClassifier {
        fn labels(&self) -> &[SentimentLabel] {
            &SentimentLabel::ALL
        }

        fn predict_proba(&self, _input: &ModelInput<'_>) -> Vec<f32> {
            vec![0.25, 0.25, 0.5]
        }
    }

    #[tokio::test]
    async fn session_without_accepted_reviews_is_still_recorded() {
        let config = Config::parse(r#"
            [steps.collector]
            enabled = true
            products = ["42"]
            confidence_threshold = 0.9
            backoff_ms = 0
            backoff_jitter_ms = 0

            [steps.export]
            enabled = false
        "#).unwrap();

        let collector = Collector::new(
            SinglePageSource,
            Arc::new(SentimentPredictor::new(Box::new(UnsureClassifier))),
            Arc::new(TrigramLanguageDetector::new()),
            config.steps.collector.collector_config(),
        );
        let database = Arc::new(Database::connect("sqlite::memory:").await.unwrap());

        collect_step(&config, &collector, Some(database.clone()), CancellationToken::new()).await.unwrap();

        let sessions = database.session_ids("42").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(database.count_reviews(&sessions[0]).await.unwrap(), 0);
        assert_eq!(database.session_stop_reason(&sessions[0]).await.unwrap(), Some("exhausted".to_owned()));
    }
}
