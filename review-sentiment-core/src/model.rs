//! Pre-fit sentiment classifier.
//!
//! The artifact holds everything the training pipeline fitted: the idf weights of the hashed
//! tf-idf terms, the scaler of the linguistic features and the linear members of a voting
//! ensemble. Nothing is fitted here.
use {
    std::{fs, path::Path},
    serde::{Serialize, Deserialize},
    ndarray::{Array1, Array2},
    tracing::info,
    crate::{
        error::ModelLoadError,
        features::{FeatureVector, FEATURE_COUNT},
        hashing::tfidf_vector,
        models::SentimentLabel,
    },
};

/// What the classifier sees for one review.
pub struct ModelInput<'a> {
    pub normalized: &'a str,
    pub features: &'a FeatureVector,
}

pub trait Classifier: Send + Sync {
    /// Class order of the probabilities returned by `predict_proba`.
    fn labels(&self) -> &[SentimentLabel];

    fn predict_proba(&self, input: &ModelInput<'_>) -> Vec<f32>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Voting {
    Soft,
    Hard,
}

impl Default for Voting {
    fn default() -> Self {
        Voting::Soft
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModelArtifact {
    pub labels: Vec<String>,
    #[serde(default)]
    pub voting: Voting,
    pub idf: Vec<f32>,
    pub scaler: ScalerArtifact,
    pub members: Vec<MemberArtifact>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScalerArtifact {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MemberArtifact {
    pub name: String,
    #[serde(default = "default_member_weight")]
    pub weight: f32,
    /// one row per class, one column per hashing bucket
    pub text_weights: Vec<Vec<f32>>,
    /// one row per class, one column per linguistic feature
    pub feature_weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

fn default_member_weight() -> f32 {
    1.0
}

struct LinearMember {
    name: String,
    weight: f32,
    text_weights: Array2<f32>,
    feature_weights: Array2<f32>,
    bias: Array1<f32>,
}

struct StandardScaler {
    mean: Array1<f32>,
    scale: Array1<f32>,
}

pub struct EnsembleModel {
    labels: Vec<SentimentLabel>,
    voting: Voting,
    idf: Array1<f32>,
    scaler: StandardScaler,
    members: Vec<LinearMember>,
}

impl EnsembleModel {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let artifact: ModelArtifact = serde_json::from_str(&fs::read_to_string(path)?)?;
        let model = Self::from_artifact(artifact)?;

        info!(
            "loaded sentiment model from {} ({} members, {} voting, {} buckets)",
            path.display(),
            model.members.len(),
            if model.voting == Voting::Soft { "soft" } else { "hard" },
            model.idf.len(),
        );
        for member in &model.members {
            info!("ensemble member: {} (weight {})", member.name, member.weight);
        }

        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelLoadError> {
        let labels = artifact.labels.iter()
            .map(|label| SentimentLabel::parse(label).ok_or_else(|| shape_error(format!("unknown label: {}", label))))
            .collect::<Result<Vec<_>, _>>()?;
        if labels.is_empty() {
            return Err(shape_error("model has no labels".to_owned()));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(shape_error(format!("duplicate label: {}", label)));
            }
        }

        let buckets = artifact.idf.len();
        if buckets == 0 {
            return Err(shape_error("idf vector is empty".to_owned()));
        }

        if artifact.scaler.mean.len() != FEATURE_COUNT || artifact.scaler.scale.len() != FEATURE_COUNT {
            return Err(shape_error(format!("scaler expects {} features", FEATURE_COUNT)));
        }

        if artifact.members.is_empty() {
            return Err(shape_error("ensemble has no members".to_owned()));
        }

        let classes = labels.len();
        let members = artifact.members.into_iter()
            .map(|member| {
                if !(member.weight > 0.0) {
                    return Err(shape_error(format!("member {} has a non-positive weight", member.name)));
                }
                if member.bias.len() != classes {
                    return Err(shape_error(format!("member {} bias does not match {} classes", member.name, classes)));
                }

                Ok(LinearMember {
                    text_weights: matrix(&member.name, "text_weights", member.text_weights, classes, buckets)?,
                    feature_weights: matrix(&member.name, "feature_weights", member.feature_weights, classes, FEATURE_COUNT)?,
                    bias: Array1::from(member.bias),
                    weight: member.weight,
                    name: member.name,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            labels,
            voting: artifact.voting,
            idf: Array1::from(artifact.idf),
            scaler: StandardScaler {
                mean: Array1::from(artifact.scaler.mean),
                // constant features were fitted with a zero scale
                scale: Array1::from(artifact.scaler.scale).mapv(|v| if v == 0.0 || !v.is_finite() { 1.0 } else { v }),
            },
            members,
        })
    }
}

impl Classifier for EnsembleModel {
    fn labels(&self) -> &[SentimentLabel] {
        &self.labels
    }

    fn predict_proba(&self, input: &ModelInput<'_>) -> Vec<f32> {
        let text = tfidf_vector(input.normalized, &self.idf);
        let features = self.scaler.transform(input.features);

        let total_weight: f32 = self.members.iter().map(|m| m.weight).sum();
        let mut combined = Array1::<f32>::zeros(self.labels.len());

        for member in &self.members {
            let probabilities = member.predict_proba(&text, &features);
            match self.voting {
                Voting::Soft => combined.scaled_add(member.weight, &probabilities),
                Voting::Hard => combined[argmax(&probabilities)] += member.weight,
            }
        }

        (combined / total_weight).to_vec()
    }
}

impl LinearMember {
    fn predict_proba(&self, text: &Array1<f32>, features: &Array1<f32>) -> Array1<f32> {
        let logits = self.text_weights.dot(text) + self.feature_weights.dot(features) + &self.bias;
        softmax(logits)
    }
}

impl StandardScaler {
    fn transform(&self, features: &FeatureVector) -> Array1<f32> {
        let features = Array1::from(features.as_slice().to_vec());
        (features - &self.mean) / &self.scale
    }
}

fn softmax(logits: Array1<f32>) -> Array1<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if sum > 0.0 && sum.is_finite() {
        exp / sum
    } else {
        let classes = exp.len();
        Array1::from_elem(classes, 1.0 / classes as f32)
    }
}

fn argmax(values: &Array1<f32>) -> usize {
    values.iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

fn matrix(member: &str, field: &str, rows: Vec<Vec<f32>>, expected_rows: usize, expected_columns: usize) -> Result<Array2<f32>, ModelLoadError> {
    if rows.len() != expected_rows || rows.iter().any(|row| row.len() != expected_columns) {
        return Err(shape_error(format!("member {} {} must be {}x{}", member, field, expected_rows, expected_columns)));
    }

    Array2::from_shape_vec((expected_rows, expected_columns), rows.into_iter().flatten().collect())
        .map_err(|err| shape_error(format!("member {} {}: {}", member, field, err)))
}

fn shape_error(message: String) -> ModelLoadError {
    ModelLoadError::Shape(message)
}

#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::{features::extract, normalizer::normalize},
    };

    const BUCKETS: usize = 16;

    // a single member that only looks at net sentiment, good enough to exercise the plumbing
    pub(crate) fn lexicon_artifact() -> ModelArtifact {
        let net_sentiment = crate::features::FEATURE_NAMES.iter().position(|v| *v == "net_sentiment").unwrap();
        let mut feature_weights = vec![vec![0.0; FEATURE_COUNT]; 3];
        feature_weights[0][net_sentiment] = -4.0;
        feature_weights[2][net_sentiment] = 4.0;

        ModelArtifact {
            labels: vec!["negative".to_owned(), "neutral".to_owned(), "positive".to_owned()],
            voting: Voting::Soft,
            idf: vec![1.0; BUCKETS],
            scaler: ScalerArtifact {
                mean: vec![0.0; FEATURE_COUNT],
                scale: vec![1.0; FEATURE_COUNT],
            },
            members: vec![MemberArtifact {
                name: "net-sentiment".to_owned(),
                weight: 1.0,
                text_weights: vec![vec![0.0; BUCKETS]; 3],
                feature_weights,
                bias: vec![0.0, 0.5, 0.0],
            }],
        }
    }

    fn probabilities(model: &EnsembleModel, text: &str) -> Vec<f32> {
        let normalized = normalize(text);
        let features = extract(text, &normalized);
        model.predict_proba(&ModelInput {
            normalized: &normalized,
            features: &features,
        })
    }

    #[test]
    fn soft_voting_sums_to_one() {
        let model = EnsembleModel::from_artifact(lexicon_artifact()).unwrap();

        let positive = probabilities(&model, "great, I love it");
        assert!((positive.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(argmax(&Array1::from(positive)), 2);

        let negative = probabilities(&model, "terrible and broken");
        assert_eq!(argmax(&Array1::from(negative)), 0);
    }

    #[test]
    fn hard_voting_counts_member_weights() {
        let mut artifact = lexicon_artifact();
        artifact.voting = Voting::Hard;
        let mut neutral_member = artifact.members[0].clone();
        neutral_member.name = "always-neutral".to_owned();
        neutral_member.weight = 3.0;
        neutral_member.feature_weights = vec![vec![0.0; FEATURE_COUNT]; 3];
        neutral_member.bias = vec![0.0, 10.0, 0.0];
        artifact.members.push(neutral_member);

        let model = EnsembleModel::from_artifact(artifact).unwrap();
        let result = probabilities(&model, "great, I love it");

        assert_eq!(result, vec![0.0, 0.75, 0.25]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut artifact = lexicon_artifact();
        artifact.members[0].text_weights.pop();
        assert!(matches!(EnsembleModel::from_artifact(artifact), Err(ModelLoadError::Shape(_))));

        let mut artifact = lexicon_artifact();
        artifact.scaler.mean.pop();
        assert!(matches!(EnsembleModel::from_artifact(artifact), Err(ModelLoadError::Shape(_))));

        let mut artifact = lexicon_artifact();
        artifact.labels[1] = "mixed".to_owned();
        assert!(matches!(EnsembleModel::from_artifact(artifact), Err(ModelLoadError::Shape(_))));
    }

    #[test]
    fn load_reads_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, serde_json::to_vec(&lexicon_artifact()).unwrap()).unwrap();

        let model = EnsembleModel::load(&path).unwrap();
        assert_eq!(model.labels(), &SentimentLabel::ALL);

        assert!(matches!(EnsembleModel::load(&dir.path().join("missing.json")), Err(ModelLoadError::Io(_))));
    }

    #[test]
    fn softmax_handles_extreme_logits() {
        let result = softmax(Array1::from(vec![1000.0, 0.0, -1000.0]));
        assert!(result.iter().all(|v| v.is_finite()));
        assert!((result.sum() - 1.0).abs() < 1e-6);
    }
}
