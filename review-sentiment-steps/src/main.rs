mod batch_classify;
mod collect;
mod progress;
mod utils;

use {
    std::sync::Arc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    review_sentiment_core::{
        collector::Collector,
        config::Config,
        database::Database,
        language::TrigramLanguageDetector,
        predictor::SentimentPredictor,
        source::HttpReviewSource,
    },
    crate::{
        batch_classify::batch_classify_step,
        collect::collect_step,
        utils::init_logging,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_error) = match Config::try_load() {
        Ok(config) => (config, None),
        Err(err) => (Config::default(), Some(err)),
    };

    init_logging(&config.logging);
    if let Some(err) = config_error {
        warn!("failed to read config: {}", err);
    }

    let infra = config.infra();
    let model_path = infra.model().path();
    let predictor = Arc::new(tokio::task::spawn_blocking(move || SentimentPredictor::load(&model_path)).await?);

    if config.steps.batch_classifier().enabled {
        batch_classify_step(&config.steps.batch_classifier(), &predictor)?;
    }

    if config.steps.collector.enabled {
        let database = match infra.database().connection_string() {
            Some(_) => Some(Arc::new(Database::new(infra.database()).await?)),
            None => {
                info!("no database configured, sessions will only be exported");
                None
            }
        };

        let collector = Collector::new(
            HttpReviewSource::new(&infra.source())?,
            predictor.clone(),
            Arc::new(TrigramLanguageDetector::new()),
            config.steps.collector.collector_config(),
        );

        let cancel = CancellationToken::new();
        let ctrl_c_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("received ctrl-c, stopping collection");
                ctrl_c_cancel.cancel();
            }
        });

        collect_step(&config, &collector, database, cancel).await?;
    }

    Ok(())
}
