use {
    std::{collections::BTreeMap, path::Path},
    tracing::{error, warn},
    crate::{
        error::PredictorError,
        features::extract,
        model::{Classifier, EnsembleModel, ModelInput},
        models::{PredictionResult, SentimentLabel},
        normalizer::normalize,
    },
};

pub const TITLE_SEPARATOR: &str = " || ";
pub const MAX_INPUT_CHARS: usize = 2000;
pub const MIN_MEANINGFUL_CHARS: usize = 3;

pub struct SentimentPredictor {
    classifier: Result<Box<dyn Classifier>, String>,
}

impl SentimentPredictor {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier: Ok(classifier),
        }
    }

    /// A predictor whose model failed to load; every prediction fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            classifier: Err(reason.into()),
        }
    }

    pub fn load(model_path: &Path) -> Self {
        match EnsembleModel::load(model_path) {
            Ok(model) => Self::new(Box::new(model)),
            Err(err) => {
                error!("failed to load sentiment model from {}: {}", model_path.display(), err);
                Self::unavailable(err.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_ok()
    }

    /// `Ok(None)` when the review has nothing to classify.
    pub fn predict(&self, raw_text: &str, title: &str) -> Result<Option<PredictionResult>, PredictorError> {
        let classifier = self.classifier.as_ref()
            .map_err(|reason| PredictorError::ModelUnavailable(reason.clone()))?;

        let text = model_text(raw_text, title);
        if meaningful_chars(&text) < MIN_MEANINGFUL_CHARS {
            return Ok(None);
        }

        let normalized = normalize(&text);
        let features = extract(&text, &normalized);
        let probabilities = classifier.predict_proba(&ModelInput {
            normalized: &normalized,
            features: &features,
        });

        let labels = classifier.labels();
        if probabilities.len() != labels.len() {
            warn!("classifier returned {} probabilities for {} labels", probabilities.len(), labels.len());
            return Ok(None);
        }

        let probabilities: BTreeMap<SentimentLabel, f32> = labels.iter().copied().zip(probabilities).collect();
        Ok(PredictionResult::from_probabilities(probabilities))
    }
}

fn model_text(raw_text: &str, title: &str) -> String {
    let title = title.trim();
    let body = raw_text.trim();

    let text = if title.is_empty() {
        body.to_owned()
    } else if body.is_empty() {
        title.to_owned()
    } else {
        format!("{}{}{}", title, TITLE_SEPARATOR, body)
    };

    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((end, _)) => text[..end].to_owned(),
        None => text,
    }
}

fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::model::tests::lexicon_artifact,
    };

    fn predictor() -> SentimentPredictor {
        SentimentPredictor::new(Box::new(EnsembleModel::from_artifact(lexicon_artifact()).unwrap()))
    }

    #[test]
    fn predicts_label_with_probabilities() {
        let prediction = predictor().predict("Works great, love it", "Five stars").unwrap().unwrap();

        assert_eq!(prediction.label, SentimentLabel::Positive);
        assert!(prediction.confidence > 0.5 && prediction.confidence <= 1.0);
        assert!((prediction.probabilities.values().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(prediction.probabilities.len(), 3);
    }

    #[test]
    fn near_empty_text_is_skipped() {
        assert_eq!(predictor().predict("", "").unwrap(), None);
        assert_eq!(predictor().predict("!!", " ").unwrap(), None);
        assert_eq!(predictor().predict("a.", "b").unwrap(), None);
    }

    #[test]
    fn unavailable_model_fails_every_call() {
        let predictor = SentimentPredictor::unavailable("artifact missing");
        assert!(!predictor.is_available());
        assert!(matches!(predictor.predict("great product", ""), Err(PredictorError::ModelUnavailable(_))));
        assert!(matches!(predictor.predict("", ""), Err(PredictorError::ModelUnavailable(_))));
    }

    #[test]
    fn load_failure_makes_model_unavailable() {
        let predictor = SentimentPredictor::load(Path::new("/nonexistent/model.json"));
        assert!(!predictor.is_available());
    }

    #[test]
    fn model_text_joins_title_and_truncates() {
        assert_eq!(model_text("body", "title"), "title || body");
        assert_eq!(model_text("body", "  "), "body");
        assert_eq!(model_text("", "title"), "title");

        let long = "é".repeat(MAX_INPUT_CHARS + 10);
        assert_eq!(model_text(&long, "").chars().count(), MAX_INPUT_CHARS);
    }
}
