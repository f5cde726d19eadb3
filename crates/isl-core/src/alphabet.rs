use std::collections::HashSet;

use crate::error::CoreError;

/// Voyelles, dans l'ordre ISL.
pub const VOWELS: &[&str] = &[
    "അ", "ആ", "ഇ", "ഈ", "ഉ", "ഊ", "ഋ", "എ", "ഏ", "ഐ", "ഒ", "ഓ", "ഔ", "അം", "അഃ",
];

/// Consonnes, groupées par varga.
pub const CONSONANTS: &[&str] = &[
    "ക", "ഖ", "ഗ", "ഘ", "ങ", //
    "ച", "ഛ", "ജ", "ഝ", "ഞ", //
    "ട", "ഠ", "ഡ", "ഢ", "ണ", //
    "ത", "ഥ", "ദ", "ധ", "ന", //
    "പ", "ഫ", "ബ", "ഭ", "മ", //
    "യ", "ര", "ല", "വ", //
    "ശ", "ഷ", "സ", "ഹ", //
    "ള", "ഴ", "റ",
];

/// Chillu et signes vocaliques.
pub const MODIFIERS: &[&str] = &[
    "ൺ", "ൻ", "ർ", "ൽ", "ൾ", //
    "ാ", "ി", "ീ", "ു", "ൂ", "ൃ", "ൄ", "െ", "ൈ", "േ", "ൗ",
];

/// Séquence ordonnée de tous les labels cibles.
///
/// Partagée entre capture (suivi de complétude) et entraînement (ordre des
/// indices du registre).
///
/// # Example
/// ```
/// use isl_core::alphabet::Alphabet;
/// let a = Alphabet::malayalam();
/// assert_eq!(a.letters()[0], "അ");
/// assert!(a.contains("ക"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    letters: Vec<String>,
}

impl Alphabet {
    /// Alphabet malayalam complet : voyelles, consonnes, modificateurs.
    #[must_use]
    pub fn malayalam() -> Self {
        Self {
            letters: VOWELS
                .iter()
                .chain(CONSONANTS)
                .chain(MODIFIERS)
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Alphabet personnalisé.
    ///
    /// # Errors
    /// `CoreError::EmptyDataset` si la liste est vide, `CoreError::DuplicateLabel`
    /// si une lettre apparaît deux fois.
    pub fn new<I, S>(letters: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let letters: Vec<String> = letters.into_iter().map(Into::into).collect();
        if letters.is_empty() {
            return Err(CoreError::EmptyDataset("alphabet"));
        }
        let mut seen = HashSet::with_capacity(letters.len());
        for l in &letters {
            if !seen.insert(l.as_str()) {
                return Err(CoreError::DuplicateLabel(l.clone()));
            }
        }
        Ok(Self { letters })
    }

    #[must_use]
    pub fn letters(&self) -> &[String] {
        &self.letters
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.letters.iter().any(|l| l == label)
    }

    /// Lettres de l'alphabet pour lesquelles `present` est vrai, ordre canonique.
    pub fn filter<'a, F>(&'a self, mut present: F) -> impl Iterator<Item = &'a str>
    where
        F: FnMut(&str) -> bool + 'a,
    {
        self.letters
            .iter()
            .map(String::as_str)
            .filter(move |l| present(l))
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::malayalam()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malayalam_has_no_duplicates() {
        let a = Alphabet::malayalam();
        assert_eq!(a.len(), VOWELS.len() + CONSONANTS.len() + MODIFIERS.len());
        assert!(Alphabet::new(a.letters().to_vec()).is_ok());
    }

    #[test]
    fn group_order_is_vowels_consonants_modifiers() {
        let a = Alphabet::malayalam();
        assert_eq!(a.letters()[VOWELS.len() - 1], "അഃ");
        assert_eq!(a.letters()[VOWELS.len()], "ക");
        assert_eq!(a.letters()[a.len() - 1], "ൗ");
    }

    #[test]
    fn custom_alphabet_rejects_duplicates() {
        let err = Alphabet::new(["അ", "ആ", "അ"]).unwrap_err();
        assert_eq!(err, CoreError::DuplicateLabel("അ".into()));
        assert!(Alphabet::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn filter_keeps_canonical_order() {
        let a = Alphabet::new(["അ", "ആ", "ഇ"]).unwrap();
        let kept: Vec<&str> = a.filter(|l| l == "ഇ" || l == "അ").collect();
        assert_eq!(kept, vec!["അ", "ഇ"]);
    }
}
