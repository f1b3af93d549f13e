use rand::{Rng, SeedableRng, rngs::StdRng};

/// The amount of elements the shuffle buffer holds.
pub const SHUFFLE_WINDOW: usize = 10_000;

/// Maps raw `u8` pixels into `[0.0, 1.0]`.
pub fn rescale(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&p| p as f32 / 255.).collect()
}

/// Shuffles a stream through a bounded buffer: the buffer is filled with the first `window`
/// elements, then each step yields a uniformly chosen buffered element and puts the next input
/// in its place.
///
/// A window at least as large as the stream gives a uniform shuffle.
pub struct ShuffleWindow<I: Iterator> {
    iter: I,
    buffer: Vec<I::Item>,
    window: usize,
    rng: StdRng,
}

impl<I: Iterator> ShuffleWindow<I> {
    pub fn new(iter: I, window: usize, seed: u64) -> Self {
        let window = window.max(1);

        Self {
            iter,
            buffer: Vec::with_capacity(window),
            window,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<I: Iterator> Iterator for ShuffleWindow<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        while self.buffer.len() < self.window {
            match self.iter.next() {
                Some(item) => self.buffer.push(item),
                None => break,
            }
        }

        if self.buffer.is_empty() {
            return None;
        }

        let i = self.rng.random_range(0..self.buffer.len());
        match self.iter.next() {
            Some(item) => Some(std::mem::replace(&mut self.buffer[i], item)),
            None => Some(self.buffer.swap_remove(i)),
        }
    }
}

/// Groups a stream into chunks of exactly `size` elements, dropping a trailing partial chunk.
pub struct DropRemainder<I> {
    iter: I,
    size: usize,
}

impl<I> DropRemainder<I> {
    pub fn new(iter: I, size: usize) -> Self {
        Self { iter, size }
    }
}

impl<I: Iterator> Iterator for DropRemainder<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }

        let chunk: Vec<_> = self.iter.by_ref().take(self.size).collect();
        (chunk.len() == self.size).then_some(chunk)
    }
}
