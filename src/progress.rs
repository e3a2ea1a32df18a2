//! Progress reporting callbacks.

/// Per-file download progress, reported as a fraction in `[0, 1]` after
/// every chunk.
pub trait Progress: Send + Sync {
    fn report(&self, fraction: f32);
}

impl<F> Progress for F
where
    F: Fn(f32) + Send + Sync,
{
    fn report(&self, fraction: f32) {
        self(fraction)
    }
}

/// Grouped progress for snapshot downloads: per-file percent, keyed by the
/// file's name inside the repo.
pub trait GroupProgress: Send + Sync {
    fn report(&self, filename: &str, percent: f32);
}

impl<F> GroupProgress for F
where
    F: Fn(&str, f32) + Send + Sync,
{
    fn report(&self, filename: &str, percent: f32) {
        self(filename, percent)
    }
}
