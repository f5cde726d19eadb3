use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use crate::alphabet::Alphabet;
use crate::error::CoreError;

/// Table bijective label ⇄ index dense `0..K`.
///
/// Construite une seule fois, jamais modifiée. La même table (sérialisée dans
/// `label_map.json`) doit être rechargée à l'inférence : un décalage d'ordre
/// fausse silencieusement toutes les prédictions.
///
/// # Example
/// ```
/// use isl_core::labels::LabelRegistry;
/// let reg = LabelRegistry::new(["അ", "ആ"]).unwrap();
/// assert_eq!(reg.index_of("ആ").unwrap(), 1);
/// assert_eq!(reg.label_of(0).unwrap(), "അ");
/// assert_eq!(reg.size(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct LabelRegistry {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl PartialEq for LabelRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for LabelRegistry {}

impl LabelRegistry {
    /// Construit depuis une liste ordonnée ; l'ordre donne les indices.
    ///
    /// # Errors
    /// `CoreError::DuplicateLabel` si un label est répété,
    /// `CoreError::EmptyDataset` si la liste est vide.
    pub fn new<I, S>(labels: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(CoreError::EmptyDataset("label registry"));
        }
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(CoreError::DuplicateLabel(label.clone()));
            }
        }
        Ok(Self { labels, index })
    }

    /// Registre des lettres de `alphabet` réellement présentes dans les
    /// données, dans l'ordre canonique (pas l'ordre d'apparition).
    ///
    /// # Errors
    /// `CoreError::EmptyDataset` si aucune lettre de l'alphabet n'est présente.
    ///
    /// # Example
    /// ```
    /// use isl_core::alphabet::Alphabet;
    /// use isl_core::labels::LabelRegistry;
    /// let alphabet = Alphabet::new(["അ", "ആ", "ഇ"]).unwrap();
    /// let reg = LabelRegistry::from_present(&alphabet, ["ആ", "അ", "ആ"]).unwrap();
    /// assert_eq!(reg.labels(), ["അ", "ആ"]);
    /// ```
    pub fn from_present<'a, I>(alphabet: &Alphabet, present: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: HashSet<&str> = present.into_iter().collect();
        Self::new(alphabet.filter(|l| present.contains(l)))
    }

    /// # Errors
    /// `CoreError::UnknownLabel` si le label n'est pas dans le registre.
    pub fn index_of(&self, label: &str) -> Result<usize, CoreError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| CoreError::UnknownLabel(label.to_string()))
    }

    /// # Errors
    /// `CoreError::IndexOutOfRange` si `index >= size()`.
    pub fn label_of(&self, index: usize) -> Result<&str, CoreError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(CoreError::IndexOutOfRange {
                index,
                size: self.labels.len(),
            })
    }

    /// Nombre de classes K.
    #[must_use]
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Table index → label, clés numériques ordonnées.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<usize, String> {
        self.labels.iter().cloned().enumerate().collect()
    }

    /// Reconstruit depuis une table index → label.
    ///
    /// # Errors
    /// `CoreError::LabelMapGap` si les clés ne couvrent pas exactement `0..K`,
    /// `CoreError::DuplicateLabel` si deux index portent le même label.
    pub fn from_map(map: BTreeMap<usize, String>) -> Result<Self, CoreError> {
        let size = map.len();
        for (expected, key) in map.keys().enumerate() {
            if *key != expected {
                return Err(CoreError::LabelMapGap {
                    missing: expected,
                    size,
                });
            }
        }
        Self::new(map.into_values())
    }

    /// Sérialise en JSON `{"0": "അ", "1": "ആ", ...}`.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_map()).context("Sérialisation de la label map")
    }

    /// # Errors
    /// Returns an error if the JSON is malformed or the table is not a
    /// gapless bijection.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<usize, String> =
            serde_json::from_str(json).context("Label map JSON invalide")?;
        Ok(Self::from_map(map)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))
    }

    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid label map.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Label map corrompue : {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_both_directions() {
        let reg = LabelRegistry::new(["അ", "ആ", "ഇ", "ക"]).unwrap();
        for i in 0..reg.size() {
            assert_eq!(reg.index_of(reg.label_of(i).unwrap()).unwrap(), i);
        }
        for label in reg.labels() {
            assert_eq!(reg.label_of(reg.index_of(label).unwrap()).unwrap(), label);
        }
    }

    #[test]
    fn canonical_order_wins_over_input_order() {
        let alphabet = Alphabet::new(["അ", "ആ", "ഇ"]).unwrap();
        let data = ["ആ", "അ", "അ", "ആ"];
        let reg = LabelRegistry::from_present(&alphabet, data).unwrap();
        assert_eq!(reg.index_of("അ").unwrap(), 0);
        assert_eq!(reg.index_of("ആ").unwrap(), 1);
        assert_eq!(
            reg.index_of("ഇ").unwrap_err(),
            CoreError::UnknownLabel("ഇ".into())
        );
        assert_eq!(reg.size(), 2);
    }

    #[test]
    fn labels_outside_alphabet_are_ignored() {
        let alphabet = Alphabet::new(["അ", "ആ"]).unwrap();
        let reg = LabelRegistry::from_present(&alphabet, ["ആ", "x"]).unwrap();
        assert_eq!(reg.labels(), ["ആ"]);
    }

    #[test]
    fn out_of_range_index() {
        let reg = LabelRegistry::new(["അ"]).unwrap();
        assert_eq!(
            reg.label_of(1).unwrap_err(),
            CoreError::IndexOutOfRange { index: 1, size: 1 }
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        assert_eq!(
            LabelRegistry::new(["അ", "അ"]).unwrap_err(),
            CoreError::DuplicateLabel("അ".into())
        );
    }

    #[test]
    fn json_uses_string_keys_in_numeric_order() {
        let labels: Vec<String> = (0..12).map(|i| format!("l{i}")).collect();
        let reg = LabelRegistry::new(labels).unwrap();
        let json = reg.to_json().unwrap();
        assert!(json.contains("\"0\": \"l0\""));
        assert!(json.contains("\"11\": \"l11\""));
        let back = LabelRegistry::from_json(&json).unwrap();
        assert_eq!(back, reg);
        assert_eq!(back.index_of("l10").unwrap(), 10);
    }

    #[test]
    fn gap_in_map_is_detected() {
        let json = r#"{"0": "അ", "2": "ഇ"}"#;
        let err = LabelRegistry::from_json(json).unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert_eq!(core, &CoreError::LabelMapGap { missing: 1, size: 2 });
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_map.json");
        let reg = LabelRegistry::new(["അ", "ആ", "ൾ"]).unwrap();
        reg.save(&path).unwrap();
        assert_eq!(LabelRegistry::load(&path).unwrap(), reg);
    }
}
