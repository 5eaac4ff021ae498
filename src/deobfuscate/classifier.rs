use crate::options::{CommandName, Options};
use crate::token::{Category, Token};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: Category,
    pub hits: usize,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: Category,
    /// Ratio of the winning category; 0.0 for the generic fallback.
    pub confidence: f64,
    /// Descriptive name from the command table, function calls only.
    pub refinement: Option<String>,
    /// Non-zero scores in precedence order.
    pub scores: Vec<CategoryScore>,
}

pub struct Classifier<'o> {
    precedence: &'o [Category],
    commands: &'o [CommandName],
}

impl<'o> Classifier<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self {
            precedence: &options.precedence,
            commands: &options.command_names,
        }
    }

    /// Never fails: a token without any flagged occurrence is `Generic`.
    pub fn classify(&self, token: &Token) -> Classification {
        let total = token.tally.sampled;
        let scores: Vec<CategoryScore> = self
            .precedence
            .iter()
            .filter(|c| **c != Category::Generic)
            .map(|&category| {
                let hits = token.tally.votes(category);
                let ratio = if total == 0 {
                    0.0
                } else {
                    hits as f64 / total as f64
                };
                CategoryScore {
                    category,
                    hits,
                    ratio,
                }
            })
            .filter(|s| s.hits > 0)
            .collect();

        let mut best: Option<&CategoryScore> = None;
        for score in &scores {
            if best.is_none_or(|b| score.ratio > b.ratio) {
                best = Some(score);
            }
        }

        let (category, confidence) =
            best.map_or((Category::Generic, 0.0), |s| (s.category, s.ratio));

        let refinement = if category == Category::FunctionCall {
            token
                .tally
                .command
                .and_then(|i| self.commands.get(i))
                .map(|command| command.name.clone())
        } else {
            None
        };

        Classification {
            category,
            confidence,
            refinement,
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deobfuscate::context::ContextCollector;
    use crate::token::{ContextFlags, Occurrence, TokenForm};

    fn token_with(flags: &[(ContextFlags, &str)]) -> Token {
        let options = Options::default();
        let collector = ContextCollector::new(&options);
        let mut token = Token::new("kf@#");
        for (i, (flags, text)) in flags.iter().enumerate() {
            token.record(
                &Occurrence {
                    line: i,
                    text: *text,
                    before: "",
                    after: "",
                    form: TokenForm::Variable,
                    flags: *flags,
                    command: collector.line_context(text).command,
                },
                None,
            );
        }
        token
    }

    fn call() -> ContextFlags {
        ContextFlags {
            function_call: true,
            ..ContextFlags::default()
        }
    }

    #[test]
    fn test_function_call_majority() {
        let options = Options::default();
        let classifier = Classifier::new(&options);
        let mut uses = vec![(call(), "%kf@#%()"); 8];
        uses.extend([(ContextFlags::default(), "%kf@#%"); 2]);

        let result = classifier.classify(&token_with(&uses));

        assert_eq!(result.category, Category::FunctionCall);
        assert!((result.confidence - 0.8).abs() < 1e-9);
        assert_eq!(result.refinement, None);
    }

    #[test]
    fn test_no_flags_is_generic() {
        let options = Options::default();
        let classifier = Classifier::new(&options);

        let result = classifier.classify(&token_with(&[(ContextFlags::default(), "x")]));

        assert_eq!(result.category, Category::Generic);
        assert_eq!(result.confidence, 0.0);
        assert!(result.scores.is_empty());
    }

    #[test]
    fn test_empty_token_is_generic() {
        let options = Options::default();
        let classifier = Classifier::new(&options);

        assert_eq!(
            classifier.classify(&Token::new("kk")).category,
            Category::Generic
        );
    }

    #[test]
    fn test_exact_tie_uses_precedence() {
        let options = Options::default();
        let classifier = Classifier::new(&options);
        let both = ContextFlags {
            coordinate: true,
            color: true,
            ..ContextFlags::default()
        };

        let result = classifier.classify(&token_with(&[(both, "a"), (both, "b")]));

        assert_eq!(result.category, Category::Coordinate);
        assert_eq!(result.scores.len(), 2);
    }

    #[test]
    fn test_custom_precedence_changes_tie_break() {
        let mut options = Options::default();
        options.precedence = vec![
            Category::Color,
            Category::Coordinate,
            Category::FunctionCall,
            Category::ControlLabel,
            Category::Hotkey,
            Category::QuotedString,
            Category::Generic,
        ];
        let classifier = Classifier::new(&options);
        let both = ContextFlags {
            coordinate: true,
            color: true,
            ..ContextFlags::default()
        };

        let result = classifier.classify(&token_with(&[(both, "a")]));

        assert_eq!(result.category, Category::Color);
    }

    #[test]
    fn test_higher_ratio_beats_precedence() {
        let options = Options::default();
        let classifier = Classifier::new(&options);
        let label = ContextFlags {
            label: true,
            ..ContextFlags::default()
        };

        let result = classifier.classify(&token_with(&[
            (call(), "a"),
            (label, "Goto, b"),
            (label, "Goto, c"),
        ]));

        assert_eq!(result.category, Category::ControlLabel);
    }

    #[test]
    fn test_refinement_uses_first_matching_command() {
        let options = Options::default();
        let classifier = Classifier::new(&options);

        let result = classifier.classify(&token_with(&[
            (call(), "%kf@#%(x) ; then Sleep"),
            (call(), "PIXELSEARCH via %kf@#%(y)"),
        ]));

        assert_eq!(result.category, Category::FunctionCall);
        assert_eq!(result.refinement.as_deref(), Some("PixelSearch"));
    }

    #[test]
    fn test_refinement_only_for_function_calls() {
        let options = Options::default();
        let classifier = Classifier::new(&options);
        let coordinate = ContextFlags {
            coordinate: true,
            ..ContextFlags::default()
        };

        let result = classifier.classify(&token_with(&[(coordinate, "MouseClick, Left, 520, 150")]));

        assert_eq!(result.category, Category::Coordinate);
        assert_eq!(result.refinement, None);
    }
}
