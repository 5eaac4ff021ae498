pub mod classifier;
pub mod context;
pub mod literal_decode;
pub mod naming;
pub mod rewriter;
pub mod scanner;
pub mod section_filter;
pub mod substitution;

use crate::Result;
use crate::document::Document;
use crate::mapping::{Mapping, MappingEntry};
use crate::options::Options;
use crate::token::{Category, Declaration, Token};
use classifier::Classifier;
use context::ContextCollector;
use naming::NameGenerator;
use rustc_hash::FxHashMap;
use scanner::Scanner;
use tracing::debug;

/// First pass. Tallies every token's flagged occurrences, then turns them
/// into a [`Mapping`]. Memory grows with the number of distinct tokens, not
/// with how often they appear. Lines can be fed one at a time so a file never
/// has to be held in memory.
pub struct DeobfuscateContext<'o> {
    options: &'o Options,
    scanner: Scanner<'o>,
    collector: ContextCollector<'o>,
    tokens: Vec<Token>,
    index: FxHashMap<String, usize>,
    declarations: Vec<Declaration>,
    lines_seen: usize,
}

impl<'o> DeobfuscateContext<'o> {
    pub fn new(options: &'o Options) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            scanner: Scanner::new(options)?,
            collector: ContextCollector::new(options),
            tokens: Vec::new(),
            index: FxHashMap::default(),
            declarations: Vec::new(),
            lines_seen: 0,
        })
    }

    pub fn analyze(&mut self, document: &Document) {
        for (index, line) in document.lines().iter().enumerate() {
            self.observe_line(index, line);
        }
        debug!(
            lines = self.lines_seen,
            tokens = self.tokens.len(),
            declarations = self.declarations.len(),
            "analysis complete"
        );
    }

    pub fn observe_line(&mut self, index: usize, line: &str) {
        self.lines_seen += 1;
        let scan = self.scanner.scan_line(index, line);

        if let Some(name) = scan.declaration {
            self.declarations.push(Declaration { line: index, name });
            return;
        }

        if scan.sites.is_empty() {
            return;
        }
        let context = self.collector.line_context(line);
        for (raw, site) in scan.sites {
            let occurrence = self.collector.occurrence(line, &context, &site);
            let slot = match self.index.get(&raw) {
                Some(&slot) => slot,
                None => {
                    self.index.insert(raw.clone(), self.tokens.len());
                    self.tokens.push(Token::new(raw));
                    self.tokens.len() - 1
                }
            };
            self.tokens[slot].record(&occurrence, self.options.sample_limit);
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub const fn lines_seen(&self) -> usize {
        self.lines_seen
    }

    /// Classifies and names tokens in first-seen order.
    pub fn build_mapping(&self) -> Mapping {
        let classifier = Classifier::new(self.options);
        let mut names = NameGenerator::new(self.options.counter_width);
        let mut mapping = Mapping::new();

        for token in &self.tokens {
            let classification = classifier.classify(token);
            let name = names.next_name(
                classification.category,
                classification.refinement.as_deref(),
            );
            let decoded_hint = if classification.category == Category::QuotedString
                && token.forms.literal
            {
                literal_decode::decode_hint(&token.raw)
            } else {
                None
            };

            mapping.insert(MappingEntry {
                raw: token.raw.clone(),
                forms: token.forms,
                category: classification.category,
                name,
                confidence: classification.confidence,
                occurrences: token.total_occurrences,
                refinement: classification.refinement,
                decoded_hint,
                scores: classification.scores,
            });
        }

        debug!(entries = mapping.len(), "mapping built");
        mapping
    }
}
