//! Locating form inputs from semantic hints

use tracing::debug;

use crate::driver::{Page, Query};

/// An XPath template with a `{q}` placeholder for the hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    template: String,
}

impl Strategy {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// The concrete query for `hint`
    pub fn render(&self, hint: &str) -> Query {
        Query::xpath(self.template.replace("{q}", &xpath_literal(hint)))
    }
}

pub fn default_strategies() -> Vec<String> {
    [
        "//label[contains(.,{q})]/following::input[1]",
        "//input[contains(@placeholder,{q})]",
        "//input[contains(@name,{q})]",
        "//input[@type='text' and contains(@aria-label,{q})]",
        "//input[@type='email' and contains(@aria-label,{q})]",
        "//input[@type='tel' and contains(@aria-label,{q})]",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Quote `s` as an XPath 1.0 string literal.
///
/// XPath 1.0 has no escape sequences, so a value holding both quote kinds
/// is assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }

    let parts: Vec<String> = s
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

pub struct LocatorResolver {
    strategies: Vec<Strategy>,
}

impl LocatorResolver {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn from_templates(templates: &[String]) -> Self {
        Self::new(templates.iter().map(Strategy::new).collect())
    }

    /// First element found across hints (outer) × strategies (inner).
    ///
    /// A probe that errors counts as a miss; `None` means nothing matched.
    pub async fn resolve<P: Page>(&self, page: &P, hints: &[String]) -> Option<P::Element> {
        for hint in hints {
            for strategy in &self.strategies {
                let query = strategy.render(hint);
                match page.find(&query).await {
                    Ok(Some(element)) => {
                        debug!("Resolved '{}' via {}", hint, query);
                        return Some(element);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Probe {} failed: {}", query, e),
                }
            }
        }
        None
    }
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::from_templates(&default_strategies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_plain() {
        assert_eq!(xpath_literal("First Name"), "'First Name'");
    }

    #[test]
    fn test_literal_single_quote() {
        assert_eq!(xpath_literal("O'Neil"), "\"O'Neil\"");
    }

    #[test]
    fn test_literal_both_quotes() {
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let s = Strategy::new("//input[contains(@name,{q}) or contains(@id,{q})]");
        assert_eq!(
            s.render("City"),
            Query::xpath("//input[contains(@name,'City') or contains(@id,'City')]")
        );
    }

    #[test]
    fn test_default_strategies_all_have_placeholder() {
        assert!(default_strategies().iter().all(|s| s.contains("{q}")));
        assert_eq!(
            Strategy::new(&default_strategies()[0]).render("Email"),
            Query::xpath("//label[contains(.,'Email')]/following::input[1]")
        );
    }
}
