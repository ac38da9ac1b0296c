//! Request-parameter resolution via `{{name}}` placeholder substitution.

use indexmap::IndexMap;
use regex::{Captures, Regex};

/// Resolves declared parameter templates against a per-cycle context.
///
/// Templates are the statically declared request parameters; the context
/// carries watermark bounds, pagination counters, and the session key for
/// the current cycle. Placeholders with no context value are left intact
/// so a misconfigured name is visible in the outgoing request rather than
/// silently blanked.
#[derive(Debug)]
pub struct ParameterResolver {
    templates: IndexMap<String, String>,
    placeholder: Regex,
}

impl ParameterResolver {
    pub fn new(templates: IndexMap<String, String>) -> Self {
        Self {
            templates,
            placeholder: Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap(),
        }
    }

    /// Substitute every `{{name}}` in every declared template.
    pub fn resolve(&self, context: &IndexMap<String, String>) -> IndexMap<String, String> {
        self.templates
            .iter()
            .map(|(name, template)| {
                let resolved = self
                    .placeholder
                    .replace_all(template, |caps: &Captures| {
                        match context.get(&caps[1]) {
                            Some(value) => value.clone(),
                            None => caps[0].to_string(),
                        }
                    })
                    .into_owned();
                (name.clone(), resolved)
            })
            .collect()
    }
}
