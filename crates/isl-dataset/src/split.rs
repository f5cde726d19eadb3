use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use isl_core::error::CoreError;
use isl_core::labels::LabelRegistry;

/// Indices train/test dans la matrice d'origine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    /// Sépare `items` selon les indices.
    #[must_use]
    pub fn partition<T: Clone>(&self, items: &[T]) -> (Vec<T>, Vec<T>) {
        let pick = |idx: &[usize]| idx.iter().map(|&i| items[i].clone()).collect();
        (pick(&self.train), pick(&self.test))
    }
}

/// Split stratifié reproductible.
///
/// Chaque classe contribue `round(n × test_ratio)` lignes au test, borné à
/// `[1, n − 1]` pour qu'elle reste présente des deux côtés. Même graine,
/// même entrée ⇒ même split.
///
/// # Errors
/// `CoreError::InsufficientSamplesForStratification` si une classe a moins de
/// deux lignes ; toutes les classes fautives sont listées.
///
/// # Example
/// ```
/// use isl_core::labels::LabelRegistry;
/// use isl_dataset::split::stratified_split;
/// let reg = LabelRegistry::new(["അ", "ആ"]).unwrap();
/// let labels = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
/// let split = stratified_split(&labels, &reg, 0.2, 42).unwrap();
/// assert_eq!(split.test.len(), 2);
/// assert_eq!(split.train.len(), 8);
/// ```
pub fn stratified_split(
    labels: &[usize],
    registry: &LabelRegistry,
    test_ratio: f64,
    seed: u64,
) -> Result<Split, CoreError> {
    let k = registry.size();
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (row, &label) in labels.iter().enumerate() {
        let Some(bucket) = by_class.get_mut(label) else {
            return Err(CoreError::IndexOutOfRange {
                index: label,
                size: k,
            });
        };
        bucket.push(row);
    }

    let too_small: Vec<(String, usize)> = by_class
        .iter()
        .enumerate()
        .filter(|(_, rows)| rows.len() < 2)
        .map(|(i, rows)| Ok((registry.label_of(i)?.to_string(), rows.len())))
        .collect::<Result<_, CoreError>>()?;
    if !too_small.is_empty() {
        return Err(CoreError::InsufficientSamplesForStratification { classes: too_small });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for mut rows in by_class {
        let n = rows.len();
        let n_test = ((n as f64 * test_ratio).round() as usize).clamp(1, n - 1);
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    log::debug!("Split stratifié : {} train / {} test", train.len(), test.len());
    Ok(Split { train, test })
}
