use crate::token::Category;
use rustc_hash::FxHashMap;

/// Hands out `{Prefix}_{NNN}` names with one counter per category, so names
/// never repeat inside a category. Numbering depends on the order tokens are
/// presented in.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    counters: FxHashMap<Category, usize>,
    width: usize,
}

impl NameGenerator {
    pub fn new(width: usize) -> Self {
        Self {
            counters: FxHashMap::default(),
            width,
        }
    }

    pub fn next_name(&mut self, category: Category, refinement: Option<&str>) -> String {
        let counter = self.counters.entry(category).or_insert(0);
        *counter += 1;
        let n = *counter;
        let width = self.width;

        match refinement.map(sanitize).filter(|r| !r.is_empty()) {
            Some(desc) => format!("{}_{desc}_{n:0width$}", category.prefix()),
            None => format!("{}_{n:0width$}", category.prefix()),
        }
    }
}

fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
