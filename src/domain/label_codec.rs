// ============================================================
// Layer 3 — Label Codec
// ============================================================
// Bijective mapping between material names and class indices.
//
//   "AZO" ↔ 0     "FTO" ↔ 1     "ITO" ↔ 2
//
// Classes are the SORTED set of distinct names seen in the
// full label column, so the mapping does not depend on row
// order or on how the data was later split. The codec is
// persisted next to the fitted pipeline; the pair is only
// meaningful together.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ClassifyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    /// Build the codec from every label in the dataset.
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    /// Number of classes K
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Class names in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Name → index. `None` for labels the codec has never seen.
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Encode a whole label column; fails on the first unknown label.
    pub fn encode_all<'a, I>(&self, labels: I) -> Result<Vec<usize>, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        labels
            .into_iter()
            .map(|l| self.encode(l).ok_or_else(|| format!("unknown label '{l}'")))
            .collect()
    }

    /// Index → name
    pub fn decode(&self, index: usize) -> Result<&str, ClassifyError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                ClassifyError::Inference(format!(
                    "predicted class index {index} is outside the label codec (K = {})",
                    self.classes.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_are_sorted_and_distinct() {
        let codec = LabelCodec::fit(["ITO", "AZO", "FTO", "ITO", "AZO"]);
        assert_eq!(codec.classes(), &["AZO", "FTO", "ITO"]);
        assert_eq!(codec.len(), 3);
    }

    #[test]
    fn test_encode_decode_bijection() {
        let codec = LabelCodec::fit(["ITO", "AZO", "FTO"]);
        for (i, name) in codec.classes().iter().enumerate() {
            assert_eq!(codec.encode(name), Some(i));
            assert_eq!(codec.decode(i).unwrap(), name);
        }
    }

    #[test]
    fn test_unknown_label_and_index() {
        let codec = LabelCodec::fit(["ITO", "AZO"]);
        assert_eq!(codec.encode("GZO"), None);
        assert!(codec.decode(2).is_err());
        assert!(codec.encode_all(["ITO", "GZO"]).is_err());
    }
}
