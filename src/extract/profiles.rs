//! Markup dialects of the supported catalog sites

use crate::extract::rules::{FieldRule, NextPageRule, NoResultsRule, SiteProfile};
use crate::Platform;

/// Catalog-A: search-result cards, split price rendering, explicit
/// "no results" banner and a pagination bar
pub static SITE_A: SiteProfile = SiteProfile {
    platform: Platform::SiteA,
    origin: "https://www.amazon.eg",
    product: r#"div[data-component-type="s-search-result"]"#,
    title: &[FieldRule::Text("h2 span.a-text-normal"), FieldRule::Text("h2")],
    price: &[
        FieldRule::SplitPrice {
            container: "span.a-price",
            whole: "span.a-price-whole",
            fraction: "span.a-price-fraction",
        },
        FieldRule::Text("span.a-price span.a-offscreen"),
    ],
    link: &[
        FieldRule::Attr {
            selector: "a.a-link-normal[href]",
            attr: "href",
        },
        FieldRule::Attr {
            selector: "h2 a[href]",
            attr: "href",
        },
    ],
    image: &[FieldRule::Attr {
        selector: "img.s-image",
        attr: "src",
    }],
    price_strip: &["EGP", "\u{a0}"],
    no_results: Some(NoResultsRule {
        selector: "div.s-no-results",
        contains: Some("No results for"),
    }),
    next_page: Some(NextPageRule {
        selector: "a.s-pagination-next",
        disabled_class: Some("s-pagination-disabled"),
    }),
};

/// Catalog-B: article cards with lazy-loaded images
pub static SITE_B: SiteProfile = SiteProfile {
    platform: Platform::SiteB,
    origin: "https://www.jumia.com.eg",
    product: "article.prd",
    title: &[FieldRule::Text("h3.name")],
    price: &[FieldRule::Text("div.prc")],
    link: &[FieldRule::Attr {
        selector: "a.core",
        attr: "href",
    }],
    image: &[
        FieldRule::Attr {
            selector: "img.img",
            attr: "data-src",
        },
        FieldRule::Attr {
            selector: "img.img",
            attr: "src",
        },
    ],
    price_strip: &["EGP"],
    no_results: None,
    next_page: None,
};

/// Catalog-C: list items with a special-price block that overrides the
/// regular price
pub static SITE_C: SiteProfile = SiteProfile {
    platform: Platform::SiteC,
    origin: "https://2b.com.eg",
    product: "li.item.product.product-item",
    title: &[FieldRule::Text("a.product-item-link")],
    price: &[
        FieldRule::Text("span.special-price span.price"),
        FieldRule::Text("span.price"),
    ],
    link: &[FieldRule::Attr {
        selector: "a.product-item-link",
        attr: "href",
    }],
    image: &[
        FieldRule::Attr {
            selector: "img.product-image-photo",
            attr: "src",
        },
        FieldRule::Attr {
            selector: "img.product-image-photo",
            attr: "data-src",
        },
    ],
    price_strip: &["\u{a0}", "EGP"],
    no_results: None,
    next_page: None,
};

/// Returns the built-in profile of a platform
pub fn profile_for(platform: Platform) -> &'static SiteProfile {
    match platform {
        Platform::SiteA => &SITE_A,
        Platform::SiteB => &SITE_B,
        Platform::SiteC => &SITE_C,
    }
}
