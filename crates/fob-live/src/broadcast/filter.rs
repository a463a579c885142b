use crate::config::{OverlaySetting, PatternFilter, SeverityFilter};
use crate::error::ConfigError;
use crate::protocol::Diagnostic;
use regex::Regex;

/// Compiled overlay filters applied to transmitted diagnostics.
///
/// Filtering only narrows the `data` lists of `errors`/`warnings` messages.
/// Which terminal message is sent, and its status flags, always follow the
/// unfiltered build result.
#[derive(Debug, Clone)]
pub struct DiagnosticFilter {
    errors: SeverityRule,
    warnings: SeverityRule,
}

#[derive(Debug, Clone)]
enum SeverityRule {
    All,
    Nothing,
    Patterns {
        include: Vec<Regex>,
        exclude: Vec<Regex>,
    },
}

impl Default for DiagnosticFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl DiagnosticFilter {
    pub fn allow_all() -> Self {
        Self {
            errors: SeverityRule::All,
            warnings: SeverityRule::All,
        }
    }

    /// Compile the filters of `client.overlay`. A plain `true`/`false`
    /// filters nothing.
    pub fn from_overlay(setting: &OverlaySetting) -> Result<Self, ConfigError> {
        let Some(filters) = setting.filters() else {
            return Ok(Self::allow_all());
        };

        Ok(Self {
            errors: SeverityRule::compile("errors", &filters.errors)?,
            warnings: SeverityRule::compile("warnings", &filters.warnings)?,
        })
    }

    pub fn errors(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        self.errors.apply(diagnostics)
    }

    pub fn warnings(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        self.warnings.apply(diagnostics)
    }
}

impl SeverityRule {
    fn compile(field: &str, filter: &SeverityFilter) -> Result<Self, ConfigError> {
        match filter {
            SeverityFilter::Enabled(true) => Ok(SeverityRule::All),
            SeverityFilter::Enabled(false) => Ok(SeverityRule::Nothing),
            SeverityFilter::Patterns(PatternFilter { include, exclude }) => Ok(SeverityRule::Patterns {
                include: compile_patterns(field, "include", include)?,
                exclude: compile_patterns(field, "exclude", exclude)?,
            }),
        }
    }

    fn keeps(&self, diagnostic: &Diagnostic) -> bool {
        match self {
            SeverityRule::All => true,
            SeverityRule::Nothing => false,
            SeverityRule::Patterns { include, exclude } => {
                let message = diagnostic.message.as_str();
                (include.is_empty() || include.iter().any(|re| re.is_match(message)))
                    && !exclude.iter().any(|re| re.is_match(message))
            }
        }
    }

    fn apply(&self, diagnostics: &[Diagnostic]) -> Vec<Diagnostic> {
        diagnostics
            .iter()
            .filter(|d| self.keeps(d))
            .cloned()
            .collect()
    }
}

pub(crate) fn compile_patterns(field: &str, kind: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
                field: format!("client.overlay.{}.{}", field, kind),
                value: pattern.clone(),
                hint: format!("Not a valid regular expression: {}", e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlayFilters;

    fn diags(messages: &[&str]) -> Vec<Diagnostic> {
        messages.iter().map(|m| Diagnostic::new(*m)).collect()
    }

    fn messages(list: Vec<Diagnostic>) -> Vec<String> {
        list.into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_booleans_filter_nothing() {
        let list = diags(&["a", "b"]);
        for setting in [OverlaySetting::Enabled(true), OverlaySetting::Enabled(false)] {
            let filter = DiagnosticFilter::from_overlay(&setting).unwrap();
            assert_eq!(filter.errors(&list), list);
            assert_eq!(filter.warnings(&list), list);
        }
    }

    #[test]
    fn test_patterns() {
        let setting = OverlaySetting::Filtered(OverlayFilters {
            warnings: SeverityFilter::Patterns(PatternFilter {
                include: vec!["^Module".to_string()],
                exclude: vec!["DEP0\\d+".to_string()],
            }),
            errors: SeverityFilter::Enabled(false),
            ..OverlayFilters::default()
        });
        let filter = DiagnosticFilter::from_overlay(&setting).unwrap();

        let warnings = diags(&["Module a DEP0005", "Module b", "other"]);
        assert_eq!(messages(filter.warnings(&warnings)), vec!["Module b"]);
        assert!(filter.errors(&diags(&["boom"])).is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let setting = OverlaySetting::Filtered(OverlayFilters {
            errors: SeverityFilter::Patterns(PatternFilter {
                include: vec![],
                exclude: vec!["[".to_string()],
            }),
            ..OverlayFilters::default()
        });
        let err = DiagnosticFilter::from_overlay(&setting).unwrap_err();
        assert!(err.to_string().contains("client.overlay.errors.exclude"));
    }
}
