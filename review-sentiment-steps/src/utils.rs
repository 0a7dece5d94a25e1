use {
    tracing::{Level, Metadata},
    tracing_subscriber::{
        prelude::*,
        filter::{filter_fn, FilterFn},
    },
    review_sentiment_core::config::LoggingConfig,
};

pub fn init_logging(config: &LoggingConfig) {
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(Level::INFO);

    if config.json {
        builder.json().finish().with(quiet_sqlx_queries()).init();
    } else {
        builder.finish().with(quiet_sqlx_queries()).init();
    }
}

fn quiet_sqlx_queries() -> FilterFn<impl Fn(&Metadata<'_>) -> bool> {
    filter_fn(|metadata| {
        if metadata.target().starts_with("sqlx::query") {
            metadata.level() > &Level::INFO
        } else {
            true
        }
    })
}
