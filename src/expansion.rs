//! Static synonym expansion of questions before embedding.
//!
//! Domain vocabulary often differs between the question and the document
//! ("IVF" vs "in vitro fertilization"). Expanding the question into
//! synonym variants and averaging their embeddings makes vector search
//! robust to that mismatch. The table is immutable configuration data, not
//! code, so deployments can swap it for their own domain.

use std::collections::HashSet;

/// Immutable term → alternates table driving question expansion.
#[derive(Clone, Debug)]
pub struct SynonymTable {
    entries: Vec<(String, Vec<String>)>,
}

impl SynonymTable {
    /// Builds a table from `(term, alternates)` pairs.
    pub fn new<T, A>(entries: impl IntoIterator<Item = (T, Vec<A>)>) -> Self
    where
        T: Into<String>,
        A: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(term, alts)| {
                    (term.into(), alts.into_iter().map(Into::into).collect())
                })
                .collect(),
        }
    }

    /// An empty table; [`expand`](Self::expand) then only returns the
    /// original question.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Expands `question` into itself plus one variant per alternate of
    /// every table term found in the question.
    ///
    /// Term detection is a case-insensitive substring match; the variant is
    /// produced by replacing the term as written in the table, so a
    /// differently-cased occurrence yields an unchanged variant that the
    /// final deduplication removes. The original question is always first.
    pub fn expand(&self, question: &str) -> Vec<String> {
        let lowered = question.to_lowercase();
        let mut seen = HashSet::new();
        let mut expanded = Vec::new();

        let mut push = |candidate: String, out: &mut Vec<String>| {
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        };

        push(question.to_string(), &mut expanded);
        for (term, alternates) in &self.entries {
            if lowered.contains(&term.to_lowercase()) {
                for alternate in alternates {
                    push(question.replace(term.as_str(), alternate), &mut expanded);
                }
            }
        }
        expanded
    }
}

impl Default for SynonymTable {
    /// The stock medical/insurance vocabulary the engine ships with.
    fn default() -> Self {
        Self::new([
            (
                "IVF",
                vec![
                    "in vitro fertilization",
                    "assisted reproduction",
                    "ART",
                    "infertility treatment",
                ],
            ),
            ("settled", vec!["paid", "reimbursed", "processed"]),
            (
                "hospitalization",
                vec!["hospital admission", "inpatient care"],
            ),
        ])
    }
}
