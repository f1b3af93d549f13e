/// A `ParamGen` generates values for the initial state of the model's parameters.
pub trait ParamGen {
    /// Should sample at most `n` parameters.
    ///
    /// # Arguments
    /// * `n` - The upper limit of samples to generate.
    ///
    /// # Returns
    /// The sampled values, or `None` if the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;
}

/// Takes up to `n` from what's left of a generator's budget.
///
/// # Returns
/// How many values to generate now, or `None` if the budget was already spent.
pub(super) fn take(remaining: &mut usize, n: usize) -> Option<usize> {
    if *remaining == 0 {
        return None;
    }

    let n = n.min(*remaining);
    *remaining -= n;
    Some(n)
}
