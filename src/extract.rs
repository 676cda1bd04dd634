//! Per-container field extraction with ordered selector fallback.

use scraper::ElementRef;
use url::Url;

use crate::models::ScrapedItem;
use crate::profiles::{FieldRule, FieldSource, SiteProfile};

/// Extracts one product from its container. A field whose selectors all
/// miss (or only hit blank elements) comes back as the sentinel; a missing
/// field never drops the record.
pub fn extract(container: ElementRef<'_>, profile: &SiteProfile) -> ScrapedItem {
    let fields = &profile.fields;

    let name = first_value(container, &fields.name);
    let price = first_value(container, &fields.price);
    let link = first_value(container, &fields.link)
        .map(|href| normalize_link(&href, profile.link_origin.as_ref()));
    let image = first_value(container, &fields.image);

    ScrapedItem::new(name, price, link, image)
}

fn first_value(container: ElementRef<'_>, rule: &FieldRule) -> Option<String> {
    rule.selectors.iter().find_map(|(_, selector)| {
        container
            .select(selector)
            .next()
            .and_then(|element| read_value(element, rule.source))
    })
}

fn read_value(element: ElementRef<'_>, source: FieldSource) -> Option<String> {
    match source {
        FieldSource::Text => {
            let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            (!text.is_empty()).then_some(text)
        }
        FieldSource::Attribute(names) => names.iter().find_map(|name| {
            element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Joins relative links onto the profile's origin. Absolute links, and
/// every link when the profile has no origin, are returned unchanged.
pub fn normalize_link(link: &str, origin: Option<&Url>) -> String {
    let Some(origin) = origin else {
        return link.to_string();
    };
    match Url::parse(link) {
        Ok(_) => link.to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => origin
            .join(link)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| link.to_string()),
        Err(_) => link.to_string(),
    }
}
