//! Vecteur de features à 126 dimensions et son assemblage.
//!
//! Disposition fixe, partagée entre capture, entraînement et inférence :
//!
//! ```text
//! [  0.. 21) L x0..x20   [ 63.. 84) R x0..x20
//! [ 21.. 42) L y0..y20   [ 84..105) R y0..y20
//! [ 42.. 63) L z0..z20   [105..126) R z0..z20
//! ```
//!
//! Une main absente laisse sa moitié à 0.0, ce qui est indiscernable d'un
//! landmark situé sur le poignet. Ambiguïté acceptée.

use crate::error::CoreError;
use crate::landmark::{
    AXES, HAND_VECTOR_LEN, HandObservation, HandSide, LANDMARKS_PER_HAND, normalize_hand,
};

/// Longueur totale du vecteur : deux mains × 63.
pub const FEATURE_LEN: usize = 2 * HAND_VECTOR_LEN;

/// Début de la moitié gauche.
pub const LEFT_OFFSET: usize = 0;
/// Début de la moitié droite.
pub const RIGHT_OFFSET: usize = HAND_VECTOR_LEN;

const AXIS_NAMES: [char; AXES] = ['x', 'y', 'z'];

/// Axe d'un landmark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Self; AXES] = [Self::X, Self::Y, Self::Z];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Index d'une feature à partir du triplet (côté, axe, landmark).
///
/// # Example
/// ```
/// use isl_core::features::{feature_index, Axis};
/// use isl_core::landmark::HandSide;
/// assert_eq!(feature_index(HandSide::Left, Axis::X, 0), 0);
/// assert_eq!(feature_index(HandSide::Left, Axis::Y, 0), 21);
/// assert_eq!(feature_index(HandSide::Right, Axis::X, 0), 63);
/// assert_eq!(feature_index(HandSide::Right, Axis::Z, 20), 125);
/// ```
#[inline]
#[must_use]
pub const fn feature_index(side: HandSide, axis: Axis, landmark: usize) -> usize {
    side.slot() * HAND_VECTOR_LEN + axis.index() * LANDMARKS_PER_HAND + landmark
}

/// Nom de colonne CSV pour un index de feature (`L_x0` … `R_z20`).
///
/// # Panics
/// Panics if `index >= FEATURE_LEN`.
#[must_use]
pub fn column_name(index: usize) -> String {
    assert!(index < FEATURE_LEN, "feature index {index} out of range");
    let side = if index < RIGHT_OFFSET {
        HandSide::Left
    } else {
        HandSide::Right
    };
    let local = index % HAND_VECTOR_LEN;
    let axis = AXIS_NAMES[local / LANDMARKS_PER_HAND];
    let landmark = local % LANDMARKS_PER_HAND;
    format!("{}_{axis}{landmark}", side.prefix())
}

/// Les 126 noms de colonnes, dans l'ordre du vecteur.
#[must_use]
pub fn column_names() -> Vec<String> {
    (0..FEATURE_LEN).map(column_name).collect()
}

/// Buffer de features statiquement dimensionné.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureVector(pub [f32; FEATURE_LEN]);

impl Default for FeatureVector {
    fn default() -> Self {
        Self([0.0; FEATURE_LEN])
    }
}

impl FeatureVector {
    /// Construit depuis une slice de longueur exacte.
    ///
    /// # Errors
    /// `CoreError::FeatureLength` si `values.len() != 126`.
    pub fn from_slice(values: &[f32]) -> Result<Self, CoreError> {
        let arr: [f32; FEATURE_LEN] =
            values
                .try_into()
                .map_err(|_| CoreError::FeatureLength {
                    what: "feature vector",
                    expected: FEATURE_LEN,
                    actual: values.len(),
                })?;
        Ok(Self(arr))
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn get(&self, side: HandSide, axis: Axis, landmark: usize) -> f32 {
        self.0[feature_index(side, axis, landmark)]
    }

    /// La moitié (63 valeurs) réservée à un côté.
    #[must_use]
    pub fn half(&self, side: HandSide) -> &[f32] {
        let start = side.slot() * HAND_VECTOR_LEN;
        &self.0[start..start + HAND_VECTOR_LEN]
    }
}

/// Résultat d'assemblage d'une frame : vecteur + drapeaux de présence.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameFeatures {
    pub vector: FeatureVector,
    pub is_left: bool,
    pub is_right: bool,
}

impl FrameFeatures {
    /// Au moins une main détectée.
    #[inline]
    #[must_use]
    pub fn has_hand(&self) -> bool {
        self.is_left || self.is_right
    }
}

/// Assemble le vecteur de 126 features d'une frame.
///
/// Si le détecteur rapporte deux mains du même côté, la dernière écrase la
/// première.
///
/// # Errors
/// `CoreError::InvalidObservation` si une main n'a pas 21 landmarks. Aucune
/// erreur pour une frame sans main.
///
/// # Example
/// ```
/// use isl_core::features::{assemble_frame, FEATURE_LEN};
/// let frame = assemble_frame(&[]).unwrap();
/// assert!(!frame.has_hand());
/// assert_eq!(frame.vector.0.len(), FEATURE_LEN);
/// ```
pub fn assemble_frame(hands: &[HandObservation]) -> Result<FrameFeatures, CoreError> {
    let mut out = FrameFeatures::default();

    for hand in hands {
        let norm = normalize_hand(hand)?;
        let seen = match hand.side {
            HandSide::Left => std::mem::replace(&mut out.is_left, true),
            HandSide::Right => std::mem::replace(&mut out.is_right, true),
        };
        if seen {
            log::debug!("Deux mains '{}' dans la même frame, la dernière gagne", hand.side);
        }

        for axis in Axis::ALL {
            let base = feature_index(hand.side, axis, 0);
            out.vector.0[base..base + LANDMARKS_PER_HAND]
                .copy_from_slice(&norm.axis(axis.index()));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{INDEX_TIP, Landmark, WRIST};

    fn hand(side: HandSide, wrist: Landmark) -> HandObservation {
        let landmarks = (0..LANDMARKS_PER_HAND)
            .map(|i| {
                let t = i as f32 * 0.01;
                Landmark::new(wrist.x + t, wrist.y - t, wrist.z + t * 0.5)
            })
            .collect();
        HandObservation::new(side, landmarks)
    }

    #[test]
    fn column_names_follow_layout() {
        let names = column_names();
        assert_eq!(names.len(), FEATURE_LEN);
        assert_eq!(names[0], "L_x0");
        assert_eq!(names[20], "L_x20");
        assert_eq!(names[21], "L_y0");
        assert_eq!(names[42], "L_z0");
        assert_eq!(names[63], "R_x0");
        assert_eq!(names[125], "R_z20");
    }

    #[test]
    fn index_and_name_agree() {
        for side in [HandSide::Left, HandSide::Right] {
            for axis in Axis::ALL {
                for lm in 0..LANDMARKS_PER_HAND {
                    let idx = feature_index(side, axis, lm);
                    let expected = format!(
                        "{}_{}{lm}",
                        side.prefix(),
                        AXIS_NAMES[axis.index()]
                    );
                    assert_eq!(column_name(idx), expected);
                }
            }
        }
    }

    #[test]
    fn empty_frame_is_all_zero() {
        let frame = assemble_frame(&[]).unwrap();
        assert!(frame.vector.0.iter().all(|&v| v == 0.0));
        assert!(!frame.is_left && !frame.is_right);
    }

    #[test]
    fn right_only_frame_leaves_left_half_zero() {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); LANDMARKS_PER_HAND];
        landmarks[INDEX_TIP] = Landmark::new(0.6, 0.4, 0.0);
        let frame = assemble_frame(&[HandObservation::new(HandSide::Right, landmarks)]).unwrap();

        assert!(frame.is_right);
        assert!(!frame.is_left);
        assert!(frame.vector.half(HandSide::Left).iter().all(|&v| v == 0.0));
        assert_eq!(frame.vector.0[RIGHT_OFFSET], 0.0);
        assert_eq!(frame.vector.get(HandSide::Right, Axis::X, WRIST), 0.0);

        let dx = frame.vector.get(HandSide::Right, Axis::X, INDEX_TIP);
        let dy = frame.vector.get(HandSide::Right, Axis::Y, INDEX_TIP);
        assert!((dx - 0.1).abs() < 1e-6);
        assert!((dy + 0.1).abs() < 1e-6);
    }

    #[test]
    fn both_hands_fill_their_own_slots() {
        let left = hand(HandSide::Left, Landmark::new(0.2, 0.5, 0.0));
        let right = hand(HandSide::Right, Landmark::new(0.8, 0.5, 0.0));
        let frame = assemble_frame(&[right.clone(), left.clone()]).unwrap();
        assert!(frame.is_left && frame.is_right);

        // Same hand shape on both sides: halves match up to f32 rounding.
        let pairs = frame
            .vector
            .half(HandSide::Left)
            .iter()
            .zip(frame.vector.half(HandSide::Right));
        for (l, r) in pairs {
            assert!((l - r).abs() < 1e-6);
        }
        let x5 = frame.vector.get(HandSide::Left, Axis::X, 5);
        assert!((x5 - 0.05).abs() < 1e-6);
        let z10 = frame.vector.get(HandSide::Right, Axis::Z, 10);
        assert!((z10 - 0.05).abs() < 1e-6);
    }

    #[test]
    fn assembly_is_deterministic() {
        let hands = [
            hand(HandSide::Left, Landmark::new(0.1, 0.9, -0.2)),
            hand(HandSide::Right, Landmark::new(0.7, 0.3, 0.1)),
        ];
        let a = assemble_frame(&hands).unwrap();
        let b = assemble_frame(&hands).unwrap();
        let bits_a: Vec<u32> = a.vector.0.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.vector.0.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn invalid_hand_fails_the_frame() {
        let bad = HandObservation::new(HandSide::Left, vec![Landmark::default(); 5]);
        let good = hand(HandSide::Right, Landmark::default());
        assert!(assemble_frame(&[good, bad]).is_err());
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(FeatureVector::from_slice(&[0.0; 125]).is_err());
        let v = FeatureVector::from_slice(&[1.0; FEATURE_LEN]).unwrap();
        assert_eq!(v.as_slice().len(), FEATURE_LEN);
    }
}
