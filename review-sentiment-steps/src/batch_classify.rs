use {
    std::{collections::HashSet, fs::File, io::{Read, Write}},
    serde::{Serialize, Deserialize},
    tracing::info,
    review_sentiment_core::{
        config::BatchClassifierStepConfig,
        predictor::SentimentPredictor,
    },
    crate::progress::Progress,
};

#[derive(Deserialize, Debug)]
struct ReviewRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(alias = "review_text", alias = "body")]
    text: String,
    #[serde(default)]
    rating: Option<f32>,
}

#[derive(Serialize, Debug)]
struct ClassifiedRecord {
    id: Option<String>,
    title: String,
    text: String,
    rating: Option<f32>,
    sentiment: String,
    confidence: f32,
    score: f32,
}

#[derive(Debug, Default, PartialEq)]
pub struct BatchStats {
    pub classified: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

pub fn batch_classify_step(config: &BatchClassifierStepConfig, predictor: &SentimentPredictor) -> anyhow::Result<()> {
    info!("running batch classify step for {}", config.input().display());

    let input = File::open(config.input())?;
    let output = File::create(config.output())?;
    let stats = classify_records(predictor, input, output)?;

    info!(
        "classified {} reviews into {} ({} duplicates, {} skipped)",
        stats.classified, config.output().display(), stats.duplicates, stats.skipped,
    );
    Ok(())
}

/// Duplicate review texts are classified once.
pub fn classify_records<R: Read, W: Write>(predictor: &SentimentPredictor, input: R, output: W) -> anyhow::Result<BatchStats> {
    let mut reader = csv::Reader::from_reader(input);
    let mut writer = csv::Writer::from_writer(output);
    let mut seen = HashSet::new();
    let mut stats = BatchStats::default();
    let mut progress = Progress::new("classifying reviews".to_owned());

    for record in reader.deserialize() {
        let record: ReviewRecord = record?;

        if !seen.insert(record.text.trim().to_lowercase()) {
            stats.duplicates += 1;
            continue;
        }

        let prediction = match predictor.predict(&record.text, &record.title)? {
            Some(v) => v,
            None => {
                stats.skipped += 1;
                continue;
            }
        };

        writer.serialize(ClassifiedRecord {
            id: record.id,
            title: record.title,
            text: record.text,
            rating: record.rating,
            sentiment: prediction.label.to_string(),
            confidence: prediction.confidence,
            score: prediction.score,
        })?;

        stats.classified += 1;
        progress.update();
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        review_sentiment_core::{
            model::{Classifier, ModelInput},
            models::SentimentLabel,
        },
    };

    struct KeywordClassifier;

    impl Classifier for KeywordClassifier {
        fn labels(&self) -> &[SentimentLabel] {
            &SentimentLabel::ALL
        }

        fn predict_proba(&self, input: &ModelInput<'_>) -> Vec<f32> {
            if input.normalized.contains("broke") {
                vec![0.8, 0.1, 0.1]
            } else {
                vec![0.1, 0.1, 0.8]
            }
        }
    }

    #[test]
    fn classifies_csv_rows() {
        let predictor = SentimentPredictor::new(Box::new(KeywordClassifier));
        let input = "id,title,review_text,rating\n\
            1,Great,Works really well,5\n\
            2,Bad,It broke after a week,1\n\
            3,Again,Works really well,5\n\
            4,,!!,\n";

        let mut output = Vec::new();
        let stats = classify_records(&predictor, input.as_bytes(), &mut output).unwrap();

        assert_eq!(stats, BatchStats {
            classified: 2,
            duplicates: 1,
            skipped: 1,
        });

        let mut reader = csv::Reader::from_reader(output.as_slice());
        let rows: Vec<csv::StringRecord> = reader.records().map(|v| v.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "positive");
        assert_eq!(&rows[1][4], "negative");
    }

    #[test]
    fn unavailable_model_fails() {
        let predictor = SentimentPredictor::unavailable("missing");
        let mut output = Vec::new();
        assert!(classify_records(&predictor, "title,text\na,great stuff\n".as_bytes(), &mut output).is_err());
    }
}
