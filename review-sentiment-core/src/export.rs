use {
    std::{fs, path::{Path, PathBuf}},
    serde::Serialize,
    tracing::info,
    crate::{
        entity::ReviewEntity,
        error::ExportError,
        models::SentimentLabel,
    },
};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Writes `<dir>/<sentiment>/<product_id>.json` for every sentiment that has reviews.
pub fn write_json_by_sentiment(dir: &Path, product_id: &str, reviews: &[ReviewEntity]) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();

    for label in SentimentLabel::ALL {
        let matching: Vec<&ReviewEntity> = reviews.iter()
            .filter(|review| review.sentiment() == label.as_str())
            .collect();
        if matching.is_empty() {
            continue;
        }

        let label_dir = dir.join(label.as_str());
        fs::create_dir_all(&label_dir)?;

        let path = label_dir.join(format!("{}.json", sanitize_file_name(product_id)));
        fs::write(&path, serde_json::to_vec_pretty(&matching)?)?;

        info!("wrote {} {} reviews to {}", matching.len(), label, path.display());
        written.push(path);
    }

    Ok(written)
}

fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "unknown".to_owned()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::Utc,
        std::collections::BTreeMap,
        crate::{
            entity::into_review_entity,
            models::{AcceptedReview, PredictionResult, RawReview},
        },
    };

    fn entity(id: &str, label: SentimentLabel) -> ReviewEntity {
        let accepted = AcceptedReview {
            review: RawReview {
                id: id.to_owned(),
                reviewer_name: None,
                title: String::new(),
                text: format!("review, with \"quotes\" {}", id),
                rating: Some(3.0),
                submitted_at: None,
                verified_purchase: false,
            },
            prediction: PredictionResult::from_probabilities(BTreeMap::from([(label, 0.8)])).unwrap(),
        };
        into_review_entity("session", "42", &Utc::now(), &accepted)
    }

    #[test]
    fn csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reviews.csv");

        write_csv(&path, &[entity("a", SentimentLabel::Positive), entity("b", SentimentLabel::Negative)]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "session_id");
        assert!(headers.iter().any(|v| v == "sentiment"));

        let records: Vec<csv::StringRecord> = reader.records().map(|v| v.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][5], "review, with \"quotes\" a");
    }

    #[test]
    fn json_split_by_sentiment() {
        let dir = tempfile::tempdir().unwrap();
        let reviews = vec![
            entity("a", SentimentLabel::Positive),
            entity("b", SentimentLabel::Positive),
            entity("c", SentimentLabel::Neutral),
        ];

        let written = write_json_by_sentiment(dir.path(), "ip/42", &reviews).unwrap();
        assert_eq!(written, vec![
            dir.path().join("neutral").join("ip_42.json"),
            dir.path().join("positive").join("ip_42.json"),
        ]);
        assert!(!dir.path().join("negative").exists());

        let positive: serde_json::Value = serde_json::from_slice(&fs::read(&written[1]).unwrap()).unwrap();
        assert_eq!(positive.as_array().unwrap().len(), 2);
        assert_eq!(positive[0]["review_id"], "a");
    }
}
