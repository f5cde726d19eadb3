use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Nombre de landmarks par main (modèle de main à 21 points).
pub const LANDMARKS_PER_HAND: usize = 21;

/// Nombre d'axes par landmark (x, y, z).
pub const AXES: usize = 3;

/// Taille d'un vecteur de main normalisé : 21 × 3.
pub const HAND_VECTOR_LEN: usize = LANDMARKS_PER_HAND * AXES;

pub const WRIST: usize = 0;
pub const INDEX_TIP: usize = 8;
pub const PINKY_TIP: usize = 20;

/// Un point anatomique, dans le repère normalisé natif du détecteur.
///
/// # Example
/// ```
/// use isl_core::landmark::Landmark;
/// let lm = Landmark::new(0.5, 0.25, -0.1);
/// assert_eq!(lm.y, 0.25);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Côté de la main tel que rapporté par le détecteur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Préfixe des colonnes CSV ("L" / "R").
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }

    /// Position du côté dans le vecteur de features (Left = 0, Right = 1).
    #[must_use]
    pub const fn slot(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("Left"),
            Self::Right => f.write_str("Right"),
        }
    }
}

/// Une main détectée dans une frame.
///
/// Le détecteur garantit 21 landmarks ordonnés ; ce n'est vérifié qu'à la
/// normalisation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct HandObservation {
    pub side: HandSide,
    pub landmarks: Vec<Landmark>,
}

impl HandObservation {
    #[must_use]
    pub fn new(side: HandSide, landmarks: Vec<Landmark>) -> Self {
        Self { side, landmarks }
    }
}

/// Coordonnées relatives au poignet, une ligne `[x, y, z]` par landmark.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedHand {
    pub coords: [[f32; AXES]; LANDMARKS_PER_HAND],
}

impl NormalizedHand {
    /// Valeurs d'un axe (0 = x, 1 = y, 2 = z), ordonnées par landmark.
    #[must_use]
    pub fn axis(&self, axis: usize) -> [f32; LANDMARKS_PER_HAND] {
        let mut out = [0.0; LANDMARKS_PER_HAND];
        for (dst, row) in out.iter_mut().zip(&self.coords) {
            *dst = row[axis];
        }
        out
    }
}

/// Soustrait le poignet (landmark 0) à chaque landmark.
///
/// Pas de mise à l'échelle, pas de correction de rotation.
///
/// # Errors
/// `CoreError::InvalidObservation` si la main n'a pas exactement 21 landmarks.
///
/// # Example
/// ```
/// use isl_core::landmark::{normalize_hand, HandObservation, HandSide, Landmark};
/// let hand = HandObservation::new(HandSide::Left, vec![Landmark::new(0.5, 0.5, 0.0); 21]);
/// let norm = normalize_hand(&hand).unwrap();
/// assert_eq!(norm.coords[0], [0.0, 0.0, 0.0]);
/// ```
pub fn normalize_hand(hand: &HandObservation) -> Result<NormalizedHand, CoreError> {
    if hand.landmarks.len() != LANDMARKS_PER_HAND {
        return Err(CoreError::InvalidObservation {
            side: hand.side.to_string(),
            count: hand.landmarks.len(),
        });
    }

    let wrist = hand.landmarks[WRIST];
    let mut coords = [[0.0f32; AXES]; LANDMARKS_PER_HAND];
    for (row, lm) in coords.iter_mut().zip(&hand.landmarks) {
        *row = [lm.x - wrist.x, lm.y - wrist.y, lm.z - wrist.z];
    }
    Ok(NormalizedHand { coords })
}
