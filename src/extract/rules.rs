//! Selector rule tables
//!
//! Every product field is described by an ordered list of rules; the first
//! rule that yields a non-empty value wins. Rules are plain data so a new
//! catalog dialect only needs a new `SiteProfile`.

use crate::{CatalogError, Platform};
use scraper::{ElementRef, Html, Selector};

/// One way of reading a field out of a product node
#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// Whitespace-normalized text of the first matching element
    Text(&'static str),

    /// Attribute value of the first matching element
    Attr {
        selector: &'static str,
        attr: &'static str,
    },

    /// Integer and fractional parts rendered in separate elements of one
    /// price container; thousands separators are dropped from the integer part
    SplitPrice {
        container: &'static str,
        whole: &'static str,
        fraction: &'static str,
    },
}

/// Page-level element whose presence means "no results"
#[derive(Debug, Clone, Copy)]
pub struct NoResultsRule {
    pub selector: &'static str,
    /// Text the element must contain to count
    pub contains: Option<&'static str>,
}

/// Page-level "next page" control
#[derive(Debug, Clone, Copy)]
pub struct NextPageRule {
    pub selector: &'static str,
    /// Class that marks the control as disabled
    pub disabled_class: Option<&'static str>,
}

/// Markup dialect of one catalog site
#[derive(Debug, Clone, Copy)]
pub struct SiteProfile {
    pub platform: Platform,
    /// Origin used to resolve relative links and images
    pub origin: &'static str,
    /// Selector of a product node within a listing page
    pub product: &'static str,
    pub title: &'static [FieldRule],
    pub price: &'static [FieldRule],
    pub link: &'static [FieldRule],
    pub image: &'static [FieldRule],
    /// Tokens removed from the extracted price (currency, separators)
    pub price_strip: &'static [&'static str],
    pub no_results: Option<NoResultsRule>,
    pub next_page: Option<NextPageRule>,
}

fn compile(selector: &str) -> Result<Selector, CatalogError> {
    Selector::parse(selector).map_err(|e| CatalogError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// A `FieldRule` with its selectors parsed
#[derive(Debug)]
pub(crate) enum CompiledRule {
    Text(Selector),
    Attr(Selector, &'static str),
    SplitPrice {
        container: Selector,
        whole: Selector,
        fraction: Selector,
    },
}

impl CompiledRule {
    fn new(rule: &FieldRule) -> Result<Self, CatalogError> {
        Ok(match rule {
            FieldRule::Text(s) => CompiledRule::Text(compile(s)?),
            FieldRule::Attr { selector, attr } => CompiledRule::Attr(compile(selector)?, attr),
            FieldRule::SplitPrice {
                container,
                whole,
                fraction,
            } => CompiledRule::SplitPrice {
                container: compile(container)?,
                whole: compile(whole)?,
                fraction: compile(fraction)?,
            },
        })
    }

    /// Applies the rule to a node; empty values count as a miss
    fn apply(&self, node: ElementRef<'_>) -> Option<String> {
        let value = match self {
            CompiledRule::Text(sel) => node.select(sel).next().map(element_text),
            CompiledRule::Attr(sel, attr) => node
                .select(sel)
                .find_map(|el| el.value().attr(attr))
                .map(|v| v.trim().to_string()),
            CompiledRule::SplitPrice {
                container,
                whole,
                fraction,
            } => {
                let container = node.select(container).next()?;
                let whole = container.select(whole).next().map(element_text)?;
                let mut price = whole.replace(',', "");
                if let Some(fraction) = container.select(fraction).next() {
                    price.push_str(&element_text(fraction));
                }
                Some(price)
            }
        };

        value.filter(|v| !v.is_empty())
    }
}

/// Runs a fallback chain, returning the first hit
pub(crate) fn first_match(rules: &[CompiledRule], node: ElementRef<'_>) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(node))
}

/// Runs a fallback chain, returning every hit in order
pub(crate) fn all_matches<'a>(
    rules: &'a [CompiledRule],
    node: ElementRef<'a>,
) -> impl Iterator<Item = String> + 'a {
    rules.iter().filter_map(move |rule| rule.apply(node))
}

/// Collects the text of an element with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A `SiteProfile` with every selector parsed
#[derive(Debug)]
pub(crate) struct CompiledProfile {
    pub product: Selector,
    pub title: Vec<CompiledRule>,
    pub price: Vec<CompiledRule>,
    pub link: Vec<CompiledRule>,
    pub image: Vec<CompiledRule>,
    pub no_results: Option<(Selector, Option<&'static str>)>,
    pub next_page: Option<(Selector, Option<&'static str>)>,
}

impl CompiledProfile {
    pub fn new(profile: &SiteProfile) -> Result<Self, CatalogError> {
        let chain = |rules: &[FieldRule]| -> Result<Vec<CompiledRule>, CatalogError> {
            rules.iter().map(CompiledRule::new).collect()
        };

        Ok(Self {
            product: compile(profile.product)?,
            title: chain(profile.title)?,
            price: chain(profile.price)?,
            link: chain(profile.link)?,
            image: chain(profile.image)?,
            no_results: profile
                .no_results
                .map(|r| compile(r.selector).map(|s| (s, r.contains)))
                .transpose()?,
            next_page: profile
                .next_page
                .map(|r| compile(r.selector).map(|s| (s, r.disabled_class)))
                .transpose()?,
        })
    }

    /// Whether the page carries the site's explicit "no results" marker
    pub fn has_no_results_marker(&self, document: &Html) -> bool {
        let Some((selector, contains)) = &self.no_results else {
            return false;
        };

        document.select(selector).any(|el| match contains {
            Some(needle) => element_text(el).contains(needle),
            None => true,
        })
    }

    /// Whether the page offers an enabled "next page" control
    pub fn has_next_page(&self, document: &Html) -> bool {
        let Some((selector, disabled_class)) = &self.next_page else {
            return false;
        };

        document.select(selector).any(|el| match disabled_class {
            Some(class) => !el.value().classes().any(|c| c == *class),
            None => true,
        })
    }
}
