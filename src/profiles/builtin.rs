use url::Url;
use url::form_urlencoded;

use super::{FieldRule, FieldSelectors, SearchStrategy, SelectorChain, SiteProfile};
use crate::utils::error::Result;

const HREF: &[&str] = &["href"];
const IMAGE_SOURCES: &[&str] = &["src", "data-src", "data-lazy-src"];

const SEARCH_INPUTS: &[&str] = &[
    "input.wp-block-search__input",
    r#"input[name="s"][type="search"]"#,
    "input.dgwt-wcas-search-input",
];

// Next-page controls must be live: the browser clicks the first match.
const WOO_NEXT: &str =
    r#"a.next.page-numbers:not(.disabled):not([disabled]):not([aria-disabled="true"])"#;
const REL_NEXT: &str = r#"a[rel="next"]:not(.disabled):not([disabled]):not([aria-disabled="true"])"#;

const NAME_SELECTORS: &[&str] = &[
    r#"[data-qa="product-name"]"#,
    "h3.heading-title.product-name a",
    "h2 a",
    "h2.woocommerce-loop-product__title",
    "h3",
];

const PRICE_SELECTORS: &[&str] = &[
    "strong.Price_amount__2sXa7",
    ".price bdi",
    ".woocommerce-Price-amount.amount",
    ".price",
];

fn shared_fields() -> Result<FieldSelectors> {
    Ok(FieldSelectors {
        name: FieldRule::text(NAME_SELECTORS)?,
        price: FieldRule::text(PRICE_SELECTORS)?,
        link: FieldRule::attribute(&["a[href]"], HREF)?,
        image: FieldRule::attribute(&["img"], IMAGE_SOURCES)?,
    })
}

fn noon_search_url(base: &str, keywords: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", keywords)
        .finish();
    format!("{}/search?{}", base.trim_end_matches('/'), query)
}

/// noon.com: search results live at `/search?q=`, products load as the
/// page scrolls, and product links are site-relative.
pub fn noon() -> Result<SiteProfile> {
    Ok(SiteProfile {
        name: "noon",
        matcher: |url| {
            url.host_str()
                .is_some_and(|host| host == "noon.com" || host.ends_with(".noon.com"))
        },
        container_selectors: SelectorChain::parse(&[
            "div.ProductBoxVertical_rocketBadgeBevel__lM0Ee",
            r#"div[data-qa="product-box"]"#,
        ])?,
        fields: shared_fields()?,
        next_page: SelectorChain::parse(&[
            r#"a.PlpPagination_arrowLink__QSqKF[aria-disabled="false"]"#,
        ])?,
        search: SearchStrategy::DirectUrl(noon_search_url),
        link_origin: Some(Url::parse("https://www.noon.com")?),
        lazy_load: true,
    })
}

/// WooCommerce-style shops, recognised by the usual path words.
pub fn woocommerce() -> Result<SiteProfile> {
    Ok(SiteProfile {
        name: "woocommerce",
        matcher: |url| {
            let url = url.as_str();
            ["product", "shop", "store"].iter().any(|hint| url.contains(hint))
        },
        container_selectors: SelectorChain::parse(&[
            ".product-wrapper",
            "li.entry.has-media",
            ".product",
        ])?,
        fields: shared_fields()?,
        next_page: SelectorChain::parse(&[WOO_NEXT])?,
        search: SearchStrategy::InPage {
            inputs: SelectorChain::parse(SEARCH_INPUTS)?,
        },
        link_origin: None,
        lazy_load: false,
    })
}

pub fn generic() -> Result<SiteProfile> {
    Ok(SiteProfile {
        name: "generic",
        matcher: |_| true,
        container_selectors: SelectorChain::parse(&[
            ".product-wrapper",
            "li.entry.has-media",
            ".product",
            r#"[itemtype$="schema.org/Product"]"#,
            "li.product-item",
        ])?,
        fields: shared_fields()?,
        next_page: SelectorChain::parse(&[WOO_NEXT, REL_NEXT])?,
        search: SearchStrategy::InPage {
            inputs: SelectorChain::parse(SEARCH_INPUTS)?,
        },
        link_origin: None,
        lazy_load: false,
    })
}
