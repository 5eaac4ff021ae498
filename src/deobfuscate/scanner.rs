use crate::Result;
use crate::options::Options;
use crate::token::{Site, TokenForm};
use regex::Regex;

/// Candidate tokens found on a single line, in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineScan {
    pub sites: Vec<(String, Site)>,
    pub declaration: Option<String>,
}

pub struct Scanner<'o> {
    options: &'o Options,
    literal_re: Regex,
    declaration_re: Regex,
}

fn alphabet_class(options: &Options) -> String {
    let escaped: String = options
        .alphabet
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    format!("[{escaped}]")
}

/// True when `pos` is preceded by an odd run of `escape` characters.
pub(crate) fn is_escaped(line: &str, pos: usize, escape: Option<char>) -> bool {
    let Some(escape) = escape else {
        return false;
    };
    line[..pos].chars().rev().take_while(|c| *c == escape).count() % 2 == 1
}

/// Matches a trimmed line made only of alphabet characters and a colon.
pub(crate) fn declaration_regex(options: &Options) -> Result<Regex> {
    Ok(Regex::new(&format!("^{}+:$", alphabet_class(options)))?)
}

impl<'o> Scanner<'o> {
    pub fn new(options: &'o Options) -> Result<Self> {
        let class = alphabet_class(options);
        let quote = regex::escape(&options.quote_char.to_string());

        let literal_re = Regex::new(&format!(
            "{quote}({class}{{{min},}}){quote}",
            min = options.min_literal_len
        ))?;
        let declaration_re = declaration_regex(options)?;

        Ok(Self {
            options,
            literal_re,
            declaration_re,
        })
    }

    pub fn scan_line(&self, index: usize, line: &str) -> LineScan {
        let trimmed = line.trim();
        if self.declaration_re.is_match(trimmed) {
            return LineScan {
                sites: Vec::new(),
                declaration: Some(trimmed[..trimmed.len() - 1].to_string()),
            };
        }

        let mut sites = self.variable_sites(index, line);

        for caps in self.literal_re.captures_iter(line) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            sites.push((
                inner.as_str().to_string(),
                Site {
                    line: index,
                    start: whole.start(),
                    end: whole.end(),
                    form: TokenForm::Literal,
                },
            ));
        }

        sites.sort_by_key(|(_, site)| site.start);

        LineScan {
            sites,
            declaration: None,
        }
    }

    /// Pairs up unescaped variable markers left to right. A rejected pair
    /// re-uses its closing marker as the next opening one.
    fn variable_sites(&self, index: usize, line: &str) -> Vec<(String, Site)> {
        let marker = self.options.variable_marker;
        let positions: Vec<usize> = line
            .char_indices()
            .filter(|(i, c)| *c == marker && !is_escaped(line, *i, self.options.escape_char))
            .map(|(i, _)| i)
            .collect();

        let mut sites = Vec::new();
        let mut i = 0;
        while i + 1 < positions.len() {
            let open = positions[i];
            let close = positions[i + 1];
            let inner = &line[open + marker.len_utf8()..close];

            if !self.is_variable_reference(inner) {
                i += 1;
                continue;
            }
            if !self.is_preserved(inner) {
                sites.push((
                    inner.to_string(),
                    Site {
                        line: index,
                        start: open,
                        end: close + marker.len_utf8(),
                        form: TokenForm::Variable,
                    },
                ));
            }
            i += 2;
        }
        sites
    }

    fn is_variable_reference(&self, inner: &str) -> bool {
        !inner.trim().is_empty() && !inner.contains(self.options.quote_char)
    }

    fn is_preserved(&self, inner: &str) -> bool {
        self.options
            .preserved_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && inner.starts_with(prefix.as_str()))
    }
}
