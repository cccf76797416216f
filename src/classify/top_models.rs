/// Entries reserved up front; larger rankings grow on demand.
const INITIAL_ENTRIES: usize = 64;

/// A model and its score for one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedModel {
    /// Position of the model in the catalog.
    pub model_index: usize,
    pub score: f64,
}

/// The best scoring models of one query, sorted by descending score.
///
/// A new score must be strictly greater than an existing one to be ranked before it,
/// so among equal scores the model inserted first stays ahead.
#[derive(Debug, Clone)]
pub struct TopModels {
    capacity: usize,
    entries: Vec<RankedModel>,
}

impl TopModels {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity.min(INITIAL_ENTRIES) + 1),
        }
    }

    /// Inserts the model if it belongs to the best `capacity` models seen so far.
    /// Returns `true` if it was inserted.
    pub fn insert(&mut self, model_index: usize, score: f64) -> bool {
        let position = self
            .entries
            .iter()
            .position(|entry| score > entry.score)
            .unwrap_or(self.entries.len());
        if position >= self.capacity {
            return false;
        }

        self.entries
            .insert(position, RankedModel { model_index, score });
        self.entries.truncate(self.capacity);
        true
    }

    pub fn entries(&self) -> &[RankedModel] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<RankedModel> {
        self.entries
    }
}

/// Ranks the scores of all models for one query, keeping the best `top` of them.
///
/// With `top == 0` all models are kept.
pub fn rank(scores: &[f64], top: usize) -> Vec<RankedModel> {
    let capacity = if top == 0 { scores.len() } else { top };
    let mut top_models = TopModels::new(capacity);
    for (model_index, &score) in scores.iter().enumerate() {
        top_models.insert(model_index, score);
    }
    top_models.into_entries()
}
