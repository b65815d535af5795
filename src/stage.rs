/// The per-item computation a worker pool applies.
///
/// A transform is shared by every worker of a pool, so it takes `&self` and
/// must be `Sync`. Anything stateful (a noise source, a counter) needs its
/// own interior synchronization.
pub trait Transform<T>: Send + Sync + 'static {
    /// Type produced for each input
    type Output: Send + 'static;

    /// Transform one input item
    fn apply(&self, input: T) -> Self::Output;

    /// Get a human-readable name for this transform
    fn name(&self) -> &str {
        "transform"
    }
}

/// A transform backed by a closure
pub struct MapTransform<F> {
    name: String,
    mapper: F,
}

impl<F> MapTransform<F> {
    /// Create a new named closure transform
    pub fn new(name: impl Into<String>, mapper: F) -> Self {
        Self {
            name: name.into(),
            mapper,
        }
    }
}

impl<F> std::fmt::Debug for MapTransform<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapTransform").field("name", &self.name).finish()
    }
}

impl<T, U, F> Transform<T> for MapTransform<F>
where
    F: Fn(T) -> U + Send + Sync + 'static,
    U: Send + 'static,
{
    type Output = U;

    fn apply(&self, input: T) -> U {
        (self.mapper)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
