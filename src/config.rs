//! Configuration for page analysis.
//!
//! `AnalyzeConfig` carries the tuning knobs for every pipeline step plus
//! the heuristic rule tables (consent phrases, deferred-source attribute
//! names, script-state probes, volatile query parameters). The tables are
//! data: extend or replace them instead of patching the algorithms.

use crate::error::{Error, Result};

/// One consent-overlay detection rule.
///
/// Rules are evaluated in table order. `selectors` name accept buttons
/// structurally (consent-framework markup); `phrases` are matched
/// case-insensitively against the visible text and labelling attributes
/// of interactive elements.
#[derive(Debug, Clone)]
pub struct ConsentRule {
    /// Locale tag, informational ("any" for locale-neutral rules).
    pub locale: String,
    /// Accept-button text fragments, lowercase.
    pub phrases: Vec<String>,
    /// CSS selectors for known accept buttons.
    pub selectors: Vec<String>,
}

impl ConsentRule {
    fn new(locale: &str, phrases: &[&str], selectors: &[&str]) -> Self {
        Self {
            locale: locale.to_string(),
            phrases: phrases.iter().map(|s| (*s).to_string()).collect(),
            selectors: selectors.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// A named probe into script-exposed page state.
///
/// The probe script must evaluate to JSON: either an array of strings or
/// a nested structure that is harvested depth-first for string values.
#[derive(Debug, Clone)]
pub struct ScriptStatePattern {
    /// Name of the harvested global, used in logs.
    pub name: String,
    /// Read-only script evaluated in the document context.
    pub probe: String,
}

impl ScriptStatePattern {
    /// Build the standard depth-limited harvest probe for one global.
    #[must_use]
    pub fn for_global(name: &str) -> Self {
        let probe = format!(
            r#"(function() {{
  function walk(v, d, out) {{
    if (v == null || d > 4 || out.length >= 200) {{ return; }}
    if (typeof v === 'string') {{ out.push(v); }}
    else if (Array.isArray(v)) {{ for (var i = 0; i < v.length; i++) {{ walk(v[i], d + 1, out); }} }}
    else if (typeof v === 'object') {{
      for (var k in v) {{
        if (/(image|img|thumb|src|source|url|background|photo|media|gallery|slide)/i.test(k)) {{
          walk(v[k], d + 1, out);
        }}
      }}
    }}
  }}
  var out = [];
  walk(window["{name}"], 0, out);
  return out;
}})()"#
        );
        Self { name: name.to_string(), probe }
    }
}

/// Configuration options for `analyze_page`.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use pagesift::AnalyzeConfig;
///
/// let config = AnalyzeConfig {
///     lazy_load_scroll_steps: 12,
///     size_fetch_concurrency: 4,
///     ..AnalyzeConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Number of scroll increments used to trigger lazy loading.
    ///
    /// `0` disables the lazy-load pass. Default: `8`
    pub lazy_load_scroll_steps: u32,

    /// Pixels per scroll increment.
    ///
    /// Default: `600.0`
    pub lazy_load_scroll_distance: f64,

    /// Pause after each scroll increment, milliseconds.
    ///
    /// Default: `250`
    pub lazy_load_pause_ms: u64,

    /// Settle delay after a consent overlay was dismissed, milliseconds.
    ///
    /// Applied by the pipeline, not the resolver: dismissal animations
    /// and the following reflow need to finish before extraction reads
    /// layout-dependent state.
    ///
    /// Default: `500`
    pub consent_settle_ms: u64,

    /// Minimum byte size for the `images_above` presentation filter.
    ///
    /// The core always returns the full normalized set; this threshold
    /// only affects the filtered view.
    ///
    /// Default: `0`
    pub min_image_size_bytes: u64,

    /// Timeout per byte-size lookup, milliseconds.
    ///
    /// Default: `3000`
    pub size_fetch_timeout_ms: u64,

    /// Maximum in-flight byte-size lookups.
    ///
    /// Default: `8`
    pub size_fetch_concurrency: usize,

    /// Overall budget for the normalization step, milliseconds.
    ///
    /// When exceeded, unresolved sizes stay `None` and the result is
    /// marked truncated.
    ///
    /// Default: `15000`
    pub normalize_budget_ms: u64,

    /// Maximum nesting depth for shadow roots and nested documents.
    ///
    /// The main document is depth 0. Default: `4`
    pub max_context_depth: usize,

    /// Maximum number of document contexts visited.
    ///
    /// Default: `64`
    pub max_contexts: usize,

    /// Collapse responsive size variants of the same image into the
    /// best-scoring one.
    ///
    /// Default: `true`
    pub collapse_responsive_variants: bool,

    /// Consent-overlay rules, evaluated in order.
    pub consent_rules: Vec<ConsentRule>,

    /// Attribute names that hold deferred (lazy-load) image sources.
    ///
    /// When present on an element, these win over the live `src`.
    pub deferred_source_attrs: Vec<String>,

    /// Script-state probes, evaluated in order.
    pub script_state_patterns: Vec<ScriptStatePattern>,

    /// Query parameter names stripped when computing comparison keys.
    ///
    /// A trailing `*` matches by prefix.
    pub volatile_query_params: Vec<String>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            lazy_load_scroll_steps: 8,
            lazy_load_scroll_distance: 600.0,
            lazy_load_pause_ms: 250,
            consent_settle_ms: 500,
            min_image_size_bytes: 0,
            size_fetch_timeout_ms: 3000,
            size_fetch_concurrency: 8,
            normalize_budget_ms: 15_000,
            max_context_depth: 4,
            max_contexts: 64,
            collapse_responsive_variants: true,
            consent_rules: default_consent_rules(),
            deferred_source_attrs: default_deferred_attrs(),
            script_state_patterns: default_script_state_patterns(),
            volatile_query_params: default_volatile_params(),
        }
    }
}

impl AnalyzeConfig {
    /// Validate the configuration, failing fast on programmer errors.
    pub fn validate(&self) -> Result<()> {
        if self.size_fetch_concurrency == 0 {
            return Err(Error::BadConfig(
                "size_fetch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.size_fetch_timeout_ms == 0 {
            return Err(Error::BadConfig(
                "size_fetch_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.normalize_budget_ms == 0 {
            return Err(Error::BadConfig(
                "normalize_budget_ms must be at least 1".to_string(),
            ));
        }
        if self.max_contexts == 0 {
            return Err(Error::BadConfig("max_contexts must be at least 1".to_string()));
        }
        if self.lazy_load_scroll_steps > 0 && self.lazy_load_scroll_distance <= 0.0 {
            return Err(Error::BadConfig(
                "lazy_load_scroll_distance must be positive when scrolling is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_consent_rules() -> Vec<ConsentRule> {
    vec![
        // Framework buttons are locale-neutral and checked first.
        ConsentRule::new(
            "any",
            &[],
            &[
                "#onetrust-accept-btn-handler",
                "#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll",
                "#didomi-notice-agree-button",
                ".fc-cta-consent",
                ".cmplz-accept",
                "#sp-cc-accept",
                r#".qc-cmp2-summary-buttons button[mode="primary"]"#,
            ],
        ),
        ConsentRule::new(
            "en",
            &[
                "accept all",
                "accept cookies",
                "allow all",
                "allow cookies",
                "i accept",
                "i agree",
                "got it",
            ],
            &[],
        ),
        ConsentRule::new(
            "de",
            &[
                "alle akzeptieren",
                "alles akzeptieren",
                "allen zustimmen",
                "akzeptieren",
                "zustimmen",
                "einverstanden",
            ],
            &[],
        ),
        ConsentRule::new("fr", &["tout accepter", "j'accepte", "accepter"], &[]),
        ConsentRule::new("es", &["aceptar todo", "aceptar"], &[]),
        ConsentRule::new("it", &["accetta tutto", "accetta"], &[]),
        ConsentRule::new("nl", &["alles accepteren", "accepteren", "akkoord"], &[]),
        ConsentRule::new("pt", &["aceitar tudo", "aceitar"], &[]),
        ConsentRule::new("pl", &["zaakceptuj wszystkie", "akceptuj", "zgadzam si\u{119}"], &[]),
        // Generic fragments last: "accept" alone would shadow the
        // locale-specific phrases above ("j'accepte" contains it).
        ConsentRule::new("any", &["accept", "agree"], &[]),
    ]
}

fn default_deferred_attrs() -> Vec<String> {
    [
        "data-src",
        "data-original",
        "data-lazy",
        "data-lazy-src",
        "data-srcset",
        "data-bg",
        "data-background",
        "data-poster",
        "data-full",
        "data-image",
        "data-thumb",
        "data-large",
        "data-slide-bg",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_script_state_patterns() -> Vec<ScriptStatePattern> {
    [
        "images",
        "gallery",
        "galleryItems",
        "photos",
        "slides",
        "carouselItems",
        "productImages",
        "thumbnails",
    ]
    .iter()
    .map(|name| ScriptStatePattern::for_global(name))
    .collect()
}

fn default_volatile_params() -> Vec<String> {
    [
        "v", "ver", "version", "t", "ts", "timestamp", "cb", "cache", "cachebust", "bust",
        "rand", "random", "_", "utm_*",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AnalyzeConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.lazy_load_scroll_steps, 8);
        assert_eq!(config.consent_settle_ms, 500);
        assert_eq!(config.size_fetch_concurrency, 8);
        assert_eq!(config.max_context_depth, 4);
        assert!(config.collapse_responsive_variants);
        assert!(!config.consent_rules.is_empty());
        assert!(!config.deferred_source_attrs.is_empty());
        assert!(!config.script_state_patterns.is_empty());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = AnalyzeConfig {
            size_fetch_concurrency: 0,
            ..AnalyzeConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::BadConfig(_))));
    }

    #[test]
    fn zero_scroll_steps_disable_scrolling_without_error() {
        let config = AnalyzeConfig {
            lazy_load_scroll_steps: 0,
            lazy_load_scroll_distance: 0.0,
            ..AnalyzeConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_scroll_distance_is_rejected_when_scrolling() {
        let config = AnalyzeConfig {
            lazy_load_scroll_distance: -1.0,
            ..AnalyzeConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::BadConfig(_))));
    }

    #[test]
    fn framework_rule_precedes_locale_rules() {
        let rules = default_consent_rules();
        assert_eq!(rules[0].locale, "any");
        assert!(rules[0].phrases.is_empty());
        assert!(rules.iter().any(|r| r.locale == "de"));
    }

    #[test]
    fn probe_embeds_global_name() {
        let pattern = ScriptStatePattern::for_global("gallery");
        assert_eq!(pattern.name, "gallery");
        assert!(pattern.probe.contains(r#"window["gallery"]"#));
    }
}
