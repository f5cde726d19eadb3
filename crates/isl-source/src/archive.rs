use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::{DynamicImage, ImageFormat};

/// Archive des images de capture : `<root>/<label>/<label>_<n>.jpg`.
///
/// Un label doit être un unique composant de chemin : `..`, `""`, un chemin
/// absolu ou contenant un séparateur sont refusés.
///
/// # Example
/// ```
/// use isl_source::archive::ImageArchive;
/// let archive = ImageArchive::new("malayalam_isl_images");
/// assert!(archive.image_path("അ", 3).unwrap().ends_with("അ/അ_3.jpg"));
/// assert!(archive.label_dir("..").is_err());
/// ```
#[derive(Clone, Debug)]
pub struct ImageArchive {
    root: PathBuf,
}

impl ImageArchive {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Dossier d'un label sous la racine.
    ///
    /// # Errors
    /// Label qui ne désigne pas un unique dossier sous la racine.
    pub fn label_dir(&self, label: &str) -> Result<PathBuf> {
        let mut parts = Path::new(label).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(label)),
            _ => bail!("Label invalide pour l'archive d'images : '{label}'"),
        }
    }

    /// # Errors
    /// Label invalide (voir [`ImageArchive::label_dir`]).
    pub fn image_path(&self, label: &str, n: usize) -> Result<PathBuf> {
        Ok(self.label_dir(label)?.join(format!("{label}_{n}.jpg")))
    }

    /// Décode `source` et le ré-encode en JPEG sous le label.
    ///
    /// # Errors
    /// Label invalide, image illisible ou écriture impossible.
    pub fn store(&self, label: &str, n: usize, source: &Path) -> Result<PathBuf> {
        // Refuser le label avant de décoder l'image.
        self.label_dir(label)?;
        let img = image::open(source)
            .with_context(|| format!("Impossible de charger {}", source.display()))?;
        self.store_image(label, n, &img)
    }

    /// # Errors
    /// Label invalide ou écriture impossible.
    pub fn store_image(&self, label: &str, n: usize, img: &DynamicImage) -> Result<PathBuf> {
        let dir = self.label_dir(label)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Impossible de créer {}", dir.display()))?;
        let path = self.image_path(label, n)?;
        // JPEG n'a pas de canal alpha.
        DynamicImage::ImageRgb8(img.to_rgb8())
            .save_with_format(&path, ImageFormat::Jpeg)
            .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        Ok(path)
    }

    /// Nombre d'images archivées pour un label. 0 pour un label invalide.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        let Ok(dir) = self.label_dir(label) else {
            return 0;
        };
        std::fs::read_dir(dir).map_or(0, |entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"))
                })
                .count()
        })
    }

    /// Supprime le dossier d'un label. Retourne `false` s'il n'existait pas.
    ///
    /// # Errors
    /// Label invalide ou suppression impossible.
    pub fn remove_label(&self, label: &str) -> Result<bool> {
        let dir = self.label_dir(label)?;
        if !dir.exists() {
            return Ok(false);
        }
        std::fs::remove_dir_all(&dir)
            .with_context(|| format!("Impossible de supprimer {}", dir.display()))?;
        log::info!("Images supprimées : {}", dir.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path) {
        let img = RgbaImage::from_fn(8, 6, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 90, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn stores_reencoded_jpeg_under_label() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("frame.png");
        write_png(&src);

        let archive = ImageArchive::new(dir.path().join("imgs"));
        let out = archive.store("ക", 0, &src).unwrap();
        assert_eq!(out, dir.path().join("imgs/ക/ക_0.jpg"));

        let back = image::open(&out).unwrap();
        assert_eq!((back.width(), back.height()), (8, 6));
        assert_eq!(archive.count("ക"), 1);
    }

    #[test]
    fn remove_label_deletes_folder() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("frame.png");
        write_png(&src);
        let archive = ImageArchive::new(dir.path());
        archive.store("അ", 0, &src).unwrap();
        archive.store("അ", 1, &src).unwrap();
        assert_eq!(archive.count("അ"), 2);

        assert!(archive.remove_label("അ").unwrap());
        assert_eq!(archive.count("അ"), 0);
        assert!(!archive.remove_label("അ").unwrap());
    }

    #[test]
    fn labels_escaping_the_root_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("imgs");
        let src = dir.path().join("frame.png");
        write_png(&src);
        let archive = ImageArchive::new(&root);
        archive.store("അ", 0, &src).unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir(&outside).unwrap();

        let absolute = outside.to_string_lossy().into_owned();
        for label in ["..", "", ".", "a/b", "../outside", absolute.as_str()] {
            assert!(archive.label_dir(label).is_err(), "label {label:?}");
            assert!(archive.remove_label(label).is_err(), "label {label:?}");
            assert!(archive.store(label, 0, &src).is_err(), "label {label:?}");
            assert_eq!(archive.count(label), 0);
        }

        // Nothing around the root was touched.
        assert!(src.exists());
        assert!(outside.exists());
        assert_eq!(archive.count("അ"), 1);
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ImageArchive::new(dir.path());
        assert!(archive.store("അ", 0, &dir.path().join("missing.png")).is_err());
    }
}
