use {
    sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool},
    tracing::info,
    crate::{
        config::DatabaseConfig,
        entity::{ReviewEntity, SessionSummaryEntity},
        error::StoreError,
    },
};

const MIGRATIONS: [&str; 3] = [
    "create table if not exists collection_sessions (
        session_id text primary key,
        product_id text not null,
        target text not null,
        threshold real,
        total_processed integer not null,
        accepted integer not null,
        filtered_by_quality integer not null,
        filtered_by_language integer not null,
        duplicates_skipped integer not null,
        pages_fetched integer not null,
        pages_attempted integer not null,
        total_available integer,
        stop_reason text not null,
        positive_count integer not null,
        negative_count integer not null,
        neutral_count integer not null,
        average_confidence real not null,
        average_score real not null,
        started_at text not null,
        finished_at text not null
    )",
    "create table if not exists reviews (
        session_id text not null references collection_sessions (session_id),
        review_id text not null,
        review_key text not null,
        product_id text not null,
        reviewer_name text,
        title text not null,
        text text not null,
        rating real,
        submitted_at text,
        verified_purchase boolean not null,
        sentiment text not null,
        confidence real not null,
        score real not null,
        probability_negative real not null,
        probability_neutral real not null,
        probability_positive real not null,
        collected_at text not null,
        primary key (session_id, review_key)
    )",
    "create index if not exists reviews_product_id on reviews (product_id)",
];

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let connection_string = config.connection_string().ok_or(StoreError::NotConfigured)?;
        Self::connect(connection_string).await
    }

    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        // in-memory databases exist per connection
        let max_connections = if connection_string.contains(":memory:") { 1 } else { 5 };

        let database = Self {
            pool: SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect(connection_string)
                .await?,
        };
        database.migrate().await?;

        Ok(database)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for migration in MIGRATIONS {
            sqlx::query(migration).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Stores the session summary and its reviews, all or nothing.
    pub async fn save_session(&self, summary: &SessionSummaryEntity, reviews: &[ReviewEntity]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("insert into collection_sessions (
                session_id, product_id, target, threshold, total_processed, accepted, filtered_by_quality,
                filtered_by_language, duplicates_skipped, pages_fetched, pages_attempted, total_available,
                stop_reason, positive_count, negative_count, neutral_count, average_confidence, average_score,
                started_at, finished_at
            ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(summary.session_id())
            .bind(summary.product_id())
            .bind(summary.target())
            .bind(summary.threshold().map(|v| v as f64))
            .bind(summary.total_processed() as i64)
            .bind(summary.accepted() as i64)
            .bind(summary.filtered_by_quality() as i64)
            .bind(summary.filtered_by_language() as i64)
            .bind(summary.duplicates_skipped() as i64)
            .bind(summary.pages_fetched() as i64)
            .bind(summary.pages_attempted() as i64)
            .bind(summary.total_available().map(|v| v as i64))
            .bind(summary.stop_reason())
            .bind(summary.sentiment_counts()[2] as i64)
            .bind(summary.sentiment_counts()[0] as i64)
            .bind(summary.sentiment_counts()[1] as i64)
            .bind(summary.average_confidence() as f64)
            .bind(summary.average_score() as f64)
            .bind(summary.started_at())
            .bind(summary.finished_at())
            .execute(&mut tx)
            .await?;

        for review in reviews {
            let [negative, neutral, positive] = review.probabilities();

            sqlx::query("insert into reviews (
                    session_id, review_id, review_key, product_id, reviewer_name, title, text, rating, submitted_at,
                    verified_purchase, sentiment, confidence, score, probability_negative, probability_neutral,
                    probability_positive, collected_at
                ) values (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
                .bind(review.session_id())
                .bind(review.review_id())
                .bind(review.review_key())
                .bind(review.product_id())
                .bind(review.reviewer_name())
                .bind(review.title())
                .bind(review.text())
                .bind(review.rating().map(|v| v as f64))
                .bind(review.submitted_at())
                .bind(review.verified_purchase())
                .bind(review.sentiment())
                .bind(review.confidence() as f64)
                .bind(review.score() as f64)
                .bind(negative as f64)
                .bind(neutral as f64)
                .bind(positive as f64)
                .bind(review.collected_at())
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        info!("saved session {} with {} reviews", summary.session_id(), reviews.len());

        Ok(())
    }

    pub async fn count_reviews(&self, session_id: &str) -> Result<i64, StoreError> {
        let row = sqlx::query("select count(*) as total from reviews where session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("total")?)
    }

    /// Accepted reviews per sentiment across every session of a product.
    pub async fn sentiment_counts(&self, product_id: &str) -> Result<Vec<(String, i64)>, StoreError> {
        let rows = sqlx::query("select sentiment, count(*) as total from reviews where product_id = ? group by sentiment order by sentiment")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Ok::<_, StoreError>((row.try_get::<String, _>("sentiment")?, row.try_get::<i64, _>("total")?)))
            .collect()
    }

    pub async fn session_ids(&self, product_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("select session_id from collection_sessions where product_id = ? order by started_at")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("session_id").map_err(StoreError::from))
            .collect()
    }

    pub async fn session_stop_reason(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("select stop_reason from collection_sessions where session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.try_get("stop_reason"))
            .transpose()
            .map_err(StoreError::from)
    }
}
