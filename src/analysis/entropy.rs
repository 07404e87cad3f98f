use std::io::{self, Read};

/// Shannon entropy over a 256-bucket byte histogram.
///
/// Feed it byte spans (or wrap a stream in [`EntropyReader`]) and read
/// `entropy()`/`perplexity()` at any point; `reset()` reuses the histogram
/// without reallocating.
#[derive(Clone)]
pub struct EntropyCalculator {
    counts: [u64; 256],
    total: u64,
}

impl Default for EntropyCalculator {
    fn default() -> Self {
        EntropyCalculator { counts: [0; 256], total: 0 }
    }
}

impl EntropyCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.counts[b as usize] += 1;
        }
        self.total += bytes.len() as u64;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `−Σ p·log2(p)` over nonzero buckets. Zero-length input is exactly 0.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        let mut entropy = 0.0;
        for &count in &self.counts {
            if count == 0 {
                continue;
            }
            let prob = count as f64 / total;
            entropy -= prob * prob.log2();
        }
        entropy
    }

    pub fn perplexity(&self) -> f64 {
        2f64.powf(self.entropy())
    }

    pub fn reset(&mut self) {
        self.counts.fill(0);
        self.total = 0;
    }
}

/// A [`Read`] adapter that histograms every byte passing through it.
/// Interleaved reads accumulate; only bytes actually delivered are counted.
pub struct EntropyReader<R: Read> {
    inner: R,
    calculator: EntropyCalculator,
}

impl<R: Read> EntropyReader<R> {
    pub fn new(inner: R) -> Self {
        EntropyReader { inner, calculator: EntropyCalculator::new() }
    }

    pub fn entropy(&self) -> f64 {
        self.calculator.entropy()
    }

    pub fn perplexity(&self) -> f64 {
        self.calculator.perplexity()
    }

    pub fn total(&self) -> u64 {
        self.calculator.total()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for EntropyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.calculator.observe(&buf[..read]);
        Ok(read)
    }
}

/// One-shot entropy and perplexity of a byte span.
pub fn entropy_of(bytes: &[u8]) -> (f64, f64) {
    let mut calculator = EntropyCalculator::new();
    calculator.observe(bytes);
    (calculator.entropy(), calculator.perplexity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn empty_and_uniform_spans_have_zero_entropy() {
        assert_eq!(entropy_of(&[]).0, 0.0);
        assert_eq!(entropy_of(&[0x41; 1024]).0, 0.0);
        assert_eq!(entropy_of(&[0x41; 1024]).1, 1.0);
    }

    #[test]
    fn all_byte_values_equally_often_is_eight_bits() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(256 * 4).collect();
        let (entropy, perplexity) = entropy_of(&bytes);
        assert!((entropy - 8.0).abs() < 1e-9);
        assert!((perplexity - 256.0).abs() < 1e-6);
    }

    #[test]
    fn reader_accumulates_across_reads() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut reader = EntropyReader::new(data.as_slice());
        let mut buf = [0u8; 100];
        while reader.read(&mut buf).unwrap() > 0 {}
        assert_eq!(reader.total(), 256);
        assert!((reader.entropy() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_counts() {
        let mut calc = EntropyCalculator::new();
        calc.observe(&[1, 2, 3, 4]);
        assert!(calc.entropy() > 0.0);
        calc.reset();
        assert_eq!(calc.total(), 0);
        assert_eq!(calc.entropy(), 0.0);
    }
}
