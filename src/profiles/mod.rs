//! Site profiles: which selectors and search rules apply to a storefront.

use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use url::Url;

use crate::utils::error::{AppError, Result};

pub mod builtin;

/// Ordered list of CSS selectors, evaluated first-match-wins.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    entries: Vec<(String, Selector)>,
}

impl SelectorChain {
    pub fn parse(selectors: &[&str]) -> Result<Self> {
        let mut entries = Vec::with_capacity(selectors.len());
        for raw in selectors {
            let selector = Selector::parse(raw).map_err(|_| AppError::InvalidSelector {
                selector: raw.to_string(),
            })?;
            entries.push((raw.to_string(), selector));
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.entries.iter().map(|(raw, sel)| (raw.as_str(), sel))
    }

    /// Raw selector strings in priority order, for the automation layer.
    pub fn sources(&self) -> Vec<&str> {
        self.entries.iter().map(|(raw, _)| raw.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All elements matched by the first selector that matches anything in
    /// the document, together with that selector.
    pub fn select_all<'a>(&self, document: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.iter().find_map(|(raw, selector)| {
            let found: Vec<ElementRef<'a>> = document.select(selector).collect();
            if found.is_empty() { None } else { Some((raw, found)) }
        })
    }
}

/// Where a field's value is read from once its element is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Text,
    /// Attribute names tried in order.
    Attribute(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub selectors: SelectorChain,
    pub source: FieldSource,
}

impl FieldRule {
    pub fn text(selectors: &[&str]) -> Result<Self> {
        Ok(Self {
            selectors: SelectorChain::parse(selectors)?,
            source: FieldSource::Text,
        })
    }

    pub fn attribute(selectors: &[&str], attributes: &'static [&'static str]) -> Result<Self> {
        Ok(Self {
            selectors: SelectorChain::parse(selectors)?,
            source: FieldSource::Attribute(attributes),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FieldSelectors {
    pub name: FieldRule,
    pub price: FieldRule,
    pub link: FieldRule,
    pub image: FieldRule,
}

/// Builds a search-results URL from the storefront URL and the keywords.
pub type SearchUrlBuilder = fn(&str, &str) -> String;

#[derive(Debug, Clone)]
pub enum SearchStrategy {
    /// Keywords are ignored.
    None,
    /// The storefront exposes search results at a predictable URL.
    DirectUrl(SearchUrlBuilder),
    /// Type the keywords into the first search box found on the page.
    InPage { inputs: SelectorChain },
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: &'static str,
    pub matcher: fn(&Url) -> bool,
    pub container_selectors: SelectorChain,
    pub fields: FieldSelectors,
    pub next_page: SelectorChain,
    pub search: SearchStrategy,
    /// Relative product links are joined onto this origin.
    pub link_origin: Option<Url>,
    /// Scroll to the bottom and wait before reading the page.
    pub lazy_load: bool,
}

impl SiteProfile {
    pub fn matches(&self, url: &Url) -> bool {
        (self.matcher)(url)
    }
}

/// Result of resolving a target: the profile, the URL to open, and the
/// query to type after navigation when the site needs an in-page search.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub profile: Arc<SiteProfile>,
    pub working_url: String,
    pub in_page_query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Arc<SiteProfile>>,
    fallback: Arc<SiteProfile>,
}

impl ProfileRegistry {
    pub fn new(fallback: SiteProfile) -> Self {
        Self {
            profiles: Vec::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Registry with the built-in storefront profiles.
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new(builtin::generic()?);
        registry.register(builtin::noon()?);
        registry.register(builtin::woocommerce()?);
        Ok(registry)
    }

    /// Profiles are consulted in registration order.
    pub fn register(&mut self, profile: SiteProfile) {
        self.profiles.push(Arc::new(profile));
    }

    pub fn profile_names(&self) -> Vec<&'static str> {
        self.profiles
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|p| p.name)
            .collect()
    }

    /// First registered profile whose matcher accepts the URL, otherwise the
    /// fallback. Unparseable URLs also get the fallback.
    pub fn resolve(&self, url: &str) -> Arc<SiteProfile> {
        let Ok(parsed) = Url::parse(url) else {
            return Arc::clone(&self.fallback);
        };
        self.profiles
            .iter()
            .find(|p| p.matches(&parsed))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn plan_target(&self, url: &str, keywords: Option<&str>) -> ResolvedTarget {
        let profile = self.resolve(url);
        let keywords = keywords.map(str::trim).filter(|k| !k.is_empty());

        let (working_url, in_page_query) = match (&profile.search, keywords) {
            (SearchStrategy::DirectUrl(build), Some(k)) => (build(url, k), None),
            (SearchStrategy::InPage { .. }, Some(k)) => (url.to_string(), Some(k.to_string())),
            _ => (url.to_string(), None),
        };

        tracing::debug!(
            profile = profile.name,
            working_url = %working_url,
            in_page_search = in_page_query.is_some(),
            "Resolved site profile"
        );

        ResolvedTarget {
            profile,
            working_url,
            in_page_query,
        }
    }
}
