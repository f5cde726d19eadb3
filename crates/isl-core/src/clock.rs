use std::time::{Duration, Instant};

/// Cadence de capture à fréquence fixe.
///
/// La frame `n` est due à `start + n / fps`. Une frame en retard n'est pas
/// rattrapée en rafale : `is_due` reste vrai tant que le compteur est derrière
/// la cible, puis on reprend le rythme.
///
/// # Example
/// ```
/// use isl_core::clock::FramePacer;
/// use std::time::{Duration, Instant};
/// let t0 = Instant::now();
/// let mut pacer = FramePacer::starting_at(10, t0);
/// assert!(pacer.is_due(t0));
/// pacer.mark_emitted();
/// assert!(!pacer.is_due(t0 + Duration::from_millis(50)));
/// assert!(pacer.is_due(t0 + Duration::from_millis(100)));
/// ```
#[derive(Clone, Debug)]
pub struct FramePacer {
    fps: u32,
    start: Instant,
    emitted: u64,
}

impl FramePacer {
    /// Démarre maintenant.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self::starting_at(fps, Instant::now())
    }

    #[must_use]
    pub fn starting_at(fps: u32, start: Instant) -> Self {
        Self {
            fps: fps.max(1),
            start,
            emitted: 0,
        }
    }

    /// Nombre de frames qui devraient avoir été émises à `now`.
    #[must_use]
    pub fn target(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        (elapsed * f64::from(self.fps)) as u64 + 1
    }

    #[inline]
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.emitted < self.target(now)
    }

    #[inline]
    pub fn mark_emitted(&mut self) {
        self.emitted += 1;
    }

    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Délai jusqu'à la prochaine frame due (zéro si déjà due).
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Duration {
        let next = self.start + Duration::from_secs_f64(self.emitted as f64 / f64::from(self.fps));
        next.saturating_duration_since(now)
    }

    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }
}
