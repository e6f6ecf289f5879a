use crate::models::ProductRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticCandidate {
    /// Position in the internal catalog.
    pub index: usize,
    pub score: f32,
}

/// Cosine similarity in [-1, 1]. Zero-norm or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Argmax of cosine similarity with no floor. Candidates without a vector are
/// skipped but still count toward indexing; ties go to the lowest index.
pub fn best_unrestricted<'a, I>(query: &[f32], candidates: I) -> Option<SemanticCandidate>
where
    I: IntoIterator<Item = Option<&'a [f32]>>,
{
    let mut best: Option<SemanticCandidate> = None;
    for (index, vector) in candidates.into_iter().enumerate() {
        let Some(vector) = vector else { continue };
        let score = cosine_similarity(query, vector);
        if score.is_nan() {
            continue;
        }
        if best.map_or(true, |b| score > b.score) {
            best = Some(SemanticCandidate { index, score });
        }
    }
    best
}

/// Nearest-neighbour search with an absolute similarity floor.
#[derive(Debug, Clone, Copy)]
pub struct SemanticMatcher {
    floor: f32,
}

impl SemanticMatcher {
    pub fn new(floor: f32) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    /// Best candidate scoring at least the floor.
    pub fn best_match<'a, I>(&self, query: &[f32], candidates: I) -> Option<SemanticCandidate>
    where
        I: IntoIterator<Item = Option<&'a [f32]>>,
    {
        best_unrestricted(query, candidates).filter(|c| c.score >= self.floor)
    }

    pub fn best_in(&self, query: &[f32], internal: &[ProductRecord]) -> Option<SemanticCandidate> {
        self.best_match(query, internal.iter().map(|r| r.embedding.as_deref()))
    }
}

impl Default for SemanticMatcher {
    fn default() -> Self {
        Self::new(0.8)
    }
}
