use crate::textutil::char_len;

pub const DEFAULT_CHUNK_CHARS: usize = 5500;

/// Contiguous run of source paragraphs sent in one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub paragraphs: Vec<String>,
}

impl Chunk {
    pub fn char_count(&self) -> usize {
        self.paragraphs.iter().map(|p| char_len(p)).sum()
    }
}

/// Greedy partition under `max_chars`. A paragraph is never split; one that
/// alone exceeds the budget gets a chunk of its own.
pub fn partition_paragraphs(paragraphs: &[String], max_chars: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut used = 0usize;

    for para in paragraphs {
        let add = char_len(para);
        if !current.is_empty() && used + add > max_chars {
            chunks.push(Chunk {
                index: chunks.len(),
                paragraphs: std::mem::take(&mut current),
            });
            used = 0;
        }
        used += add;
        current.push(para.clone());
    }
    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            paragraphs: current,
        });
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paras(lens: &[usize]) -> Vec<String> {
        lens.iter()
            .enumerate()
            .map(|(i, n)| {
                let c = char::from(b'a' + (i % 26) as u8);
                std::iter::repeat(c).take(*n).collect()
            })
            .collect()
    }

    fn assert_complete(input: &[String], chunks: &[Chunk]) {
        let flat: Vec<String> = chunks.iter().flat_map(|c| c.paragraphs.clone()).collect();
        assert_eq!(flat, input);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
            assert!(!c.paragraphs.is_empty());
        }
    }

    #[test]
    fn twelve_thousand_chars_make_three_chunks() {
        let input = paras(&[1000; 12]);
        let chunks = partition_paragraphs(&input, DEFAULT_CHUNK_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_complete(&input, &chunks);
        assert!(chunks.iter().all(|c| c.char_count() <= DEFAULT_CHUNK_CHARS));
        let counts: Vec<usize> = chunks.iter().map(|c| c.paragraphs.len()).collect();
        assert_eq!(counts, vec![5, 5, 2]);
    }

    #[test]
    fn oversized_paragraph_stands_alone() {
        let input = paras(&[100, 6000, 100, 100]);
        let chunks = partition_paragraphs(&input, DEFAULT_CHUNK_CHARS);
        assert_complete(&input, &chunks);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].paragraphs.len(), 1);
        assert_eq!(chunks[1].char_count(), 6000);
        assert_eq!(chunks[2].paragraphs.len(), 2);
    }

    #[test]
    fn exact_budget_fits() {
        let input = paras(&[2750, 2750, 1]);
        let chunks = partition_paragraphs(&input, 5500);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].char_count(), 5500);
    }

    #[test]
    fn budget_counts_chars_not_bytes() {
        let input = vec!["汉".repeat(3), "字".repeat(3)];
        let chunks = partition_paragraphs(&input, 6);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn completeness_over_many_shapes() {
        for budget in [1usize, 7, 50, 333] {
            for seed in 0..20usize {
                let lens: Vec<usize> = (0..(seed % 9 + 1)).map(|i| (i * 37 + seed * 11) % 120 + 1).collect();
                let input = paras(&lens);
                let chunks = partition_paragraphs(&input, budget);
                assert_complete(&input, &chunks);
                for c in &chunks {
                    assert!(c.paragraphs.len() == 1 || c.char_count() <= budget);
                }
            }
        }
    }
}
