use regex::Regex;
use std::sync::LazyLock;

/// Fields extracted from a source deal post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDeal {
    pub product_name: String,
    pub price_before: String,
    pub price_after: String,
    pub original_link: String,
}

/// Deal post layout: product line, optional detail lines, price line with an
/// arrow between the two amounts, then a link line.
///
/// The product name ends at the first line break that starts a detail or
/// price section, so multi-line names survive as long as no such marker
/// appears in them.
static DEAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)",
        r"(?:📦\s*)?product:\s*(?P<product_name>.+?)\s*\n[ \t]*",
        r"(?:(?:💡|details?\b|deal\b).*?)?",
        r"(?:💰\s*)?price:\s*",
        r"₹?\s*(?P<price_before>[0-9][0-9,]*(?:\.[0-9]+)?)\s*",
        r"(?:→|->)\s*",
        r"₹?\s*(?P<price_after>[0-9][0-9,]*(?:\.[0-9]+)?)",
        r".*?",
        r"link:\s*(?P<link>https?://\S+)",
    ))
    .expect("deal pattern must compile")
});

/// Extract a deal from free-form post text.
///
/// Returns None when any field is missing or the fields appear out of order.
pub fn parse(text: &str) -> Option<ParsedDeal> {
    let caps = DEAL_PATTERN.captures(text)?;

    Some(ParsedDeal {
        product_name: caps["product_name"].trim().to_string(),
        price_before: caps["price_before"].trim().to_string(),
        price_after: caps["price_after"].trim().to_string(),
        original_link: caps["link"].trim().to_string(),
    })
}
