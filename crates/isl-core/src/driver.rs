//! Classification d'une frame : features → scaler → modèle → argmax → label.

use crate::error::CoreError;
use crate::features::{FEATURE_LEN, FrameFeatures};
use crate::labels::LabelRegistry;
use crate::scaler::FeatureScaler;
use crate::traits::Classifier;

/// Une prédiction : label gagnant et meilleurs candidats.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    pub confidence: f32,
    /// Les `top_k` meilleurs `(label, score)`, par score décroissant.
    pub top: Vec<(String, f32)>,
}

/// Résultat de classification d'une frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Aucune main : rien n'est émis.
    NoHand,
    /// Une prédiction existe mais sous le seuil de confiance configuré.
    BelowThreshold(Prediction),
    Label(Prediction),
}

impl Outcome {
    /// Label émis, s'il y en a un.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Label(p) => Some(&p.label),
            Self::NoHand | Self::BelowThreshold(_) => None,
        }
    }
}

/// Relie scaler, registre et classifieur chargés ensemble.
///
/// Sans état d'une frame à l'autre.
pub struct ClassificationDriver<C> {
    scaler: FeatureScaler,
    registry: LabelRegistry,
    classifier: C,
    min_confidence: Option<f32>,
    top_k: usize,
}

impl<C: Classifier> ClassificationDriver<C> {
    /// # Errors
    /// `CoreError::ArtifactMismatch` si le modèle n'a pas 126 entrées ou si
    /// son nombre de classes diffère de la taille du registre.
    pub fn new(
        scaler: FeatureScaler,
        registry: LabelRegistry,
        classifier: C,
    ) -> Result<Self, CoreError> {
        if classifier.input_len() != FEATURE_LEN {
            return Err(CoreError::ArtifactMismatch(format!(
                "entrée du modèle {} (attendu {FEATURE_LEN})",
                classifier.input_len()
            )));
        }
        if classifier.num_classes() != registry.size() {
            return Err(CoreError::ArtifactMismatch(format!(
                "modèle à {} classes, label map à {}",
                classifier.num_classes(),
                registry.size()
            )));
        }
        Ok(Self {
            scaler,
            registry,
            classifier,
            min_confidence: None,
            top_k: 1,
        })
    }

    /// Seuil de confiance ; `None` désactive le filtre.
    #[must_use]
    pub fn with_min_confidence(mut self, min_confidence: Option<f32>) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Classe une frame assemblée.
    ///
    /// # Errors
    /// `CoreError::ArtifactMismatch` si le modèle renvoie un nombre de scores
    /// différent de K, `CoreError::IndexOutOfRange` en cas de décalage
    /// registre/modèle.
    pub fn classify(&self, frame: &FrameFeatures) -> Result<Outcome, CoreError> {
        if !frame.has_hand() {
            return Ok(Outcome::NoHand);
        }

        let scaled = self.scaler.transform(&frame.vector);
        let scores = self.classifier.scores(&scaled)?;
        if scores.len() != self.registry.size() {
            return Err(CoreError::ArtifactMismatch(format!(
                "{} scores reçus pour {} classes",
                scores.len(),
                self.registry.size()
            )));
        }

        let ranked = rank(&scores);
        let Some(&index) = ranked.first() else {
            return Err(CoreError::ArtifactMismatch("aucun score".into()));
        };
        let confidence = scores[index];
        let top = ranked
            .iter()
            .take(self.top_k)
            .map(|&i| Ok((self.registry.label_of(i)?.to_string(), scores[i])))
            .collect::<Result<Vec<_>, CoreError>>()?;

        let prediction = Prediction {
            label: self.registry.label_of(index)?.to_string(),
            index,
            confidence,
            top,
        };

        match self.min_confidence {
            Some(min) if confidence < min => Ok(Outcome::BelowThreshold(prediction)),
            _ => Ok(Outcome::Label(prediction)),
        }
    }
}

/// Index du premier maximum. `None` pour une slice vide.
///
/// # Example
/// ```
/// use isl_core::driver::argmax;
/// assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
/// assert_eq!(argmax(&[]), None);
/// ```
#[must_use]
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s.total_cmp(&b).is_le() => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Indices triés par score décroissant ; à égalité, l'index le plus bas
/// d'abord, donc `rank(s)[0] == argmax(s)`.
fn rank(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn num_classes(&self) -> usize {
            self.0.len()
        }
        fn scores(&self, _input: &FeatureVector) -> Result<Vec<f32>, CoreError> {
            Ok(self.0.clone())
        }
    }

    struct Liar;

    impl Classifier for Liar {
        fn num_classes(&self) -> usize {
            2
        }
        fn scores(&self, _input: &FeatureVector) -> Result<Vec<f32>, CoreError> {
            Ok(vec![1.0])
        }
    }

    fn identity_scaler() -> FeatureScaler {
        FeatureScaler::from_parts(vec![0.0; FEATURE_LEN], vec![1.0; FEATURE_LEN]).unwrap()
    }

    fn registry() -> LabelRegistry {
        LabelRegistry::new(["അ", "ആ", "ഇ"]).unwrap()
    }

    fn with_hand() -> FrameFeatures {
        FrameFeatures {
            is_right: true,
            ..FrameFeatures::default()
        }
    }

    #[test]
    fn no_hand_emits_nothing() {
        let driver =
            ClassificationDriver::new(identity_scaler(), registry(), Fixed(vec![0.2, 0.5, 0.3]))
                .unwrap();
        assert_eq!(
            driver.classify(&FrameFeatures::default()).unwrap(),
            Outcome::NoHand
        );
    }

    #[test]
    fn argmax_maps_through_registry() {
        let driver =
            ClassificationDriver::new(identity_scaler(), registry(), Fixed(vec![0.2, 0.5, 0.3]))
                .unwrap()
                .with_top_k(2);
        let Outcome::Label(p) = driver.classify(&with_hand()).unwrap() else {
            panic!("expected a label");
        };
        assert_eq!(p.label, "ആ");
        assert_eq!(p.index, 1);
        assert_eq!(p.top, vec![("ആ".to_string(), 0.5), ("ഇ".to_string(), 0.3)]);
    }

    #[test]
    fn ties_resolve_to_first_maximum() {
        let driver =
            ClassificationDriver::new(identity_scaler(), registry(), Fixed(vec![0.4, 0.2, 0.4]))
                .unwrap();
        let out = driver.classify(&with_hand()).unwrap();
        assert_eq!(out.label(), Some("അ"));
    }

    #[test]
    fn rank_head_is_argmax() {
        let s = [0.3, 0.9, 0.1, 0.9];
        assert_eq!(rank(&s), vec![1, 3, 0, 2]);
        assert_eq!(argmax(&s), Some(1));
    }

    #[test]
    fn low_confidence_is_a_distinct_outcome() {
        let driver =
            ClassificationDriver::new(identity_scaler(), registry(), Fixed(vec![0.3, 0.4, 0.3]))
                .unwrap()
                .with_min_confidence(Some(0.75));
        let out = driver.classify(&with_hand()).unwrap();
        assert!(matches!(out, Outcome::BelowThreshold(ref p) if p.label == "ആ"));
        assert_eq!(out.label(), None);
    }

    #[test]
    fn class_count_mismatch_is_rejected_at_construction() {
        let err = ClassificationDriver::new(identity_scaler(), registry(), Fixed(vec![0.5, 0.5]))
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::ArtifactMismatch(_)));
    }

    #[test]
    fn wrong_score_length_is_an_error() {
        let reg = LabelRegistry::new(["അ", "ആ"]).unwrap();
        let driver = ClassificationDriver::new(identity_scaler(), reg, Liar).unwrap();
        assert!(matches!(
            driver.classify(&with_hand()),
            Err(CoreError::ArtifactMismatch(_))
        ));
    }
}
