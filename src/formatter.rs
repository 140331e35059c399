use teloxide::utils::markdown::{escape, escape_link_url};

use crate::affiliate::ResolvedLink;
use crate::parser::ParsedDeal;

/// Render a deal as a Telegram MarkdownV2 post.
///
/// Everything interpolated from the source post is escaped, so product names
/// containing `*`, `_`, brackets or dots cannot break the rendering. Line
/// breaks inside the product name are folded into spaces to keep the post at
/// three lines.
pub fn format_deal(deal: &ParsedDeal, resolved: &ResolvedLink) -> String {
    let link_label = if resolved.used_fallback {
        "Link:"
    } else {
        "Affiliate Link:"
    };

    let product_name = deal.product_name.split_whitespace().collect::<Vec<_>>().join(" ");

    format!(
        "📦 *Product:* {}\n💰 *Price:* ₹{} → ₹{}\n🔗 *{}* [Buy Now]({})",
        escape(&product_name),
        escape(&deal.price_before),
        escape(&deal.price_after),
        link_label,
        escape_link_url(&resolved.affiliate_link),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(name: &str) -> ParsedDeal {
        ParsedDeal {
            product_name: name.to_string(),
            price_before: "1,999".to_string(),
            price_after: "999".to_string(),
            original_link: "https://example.com/item".to_string(),
        }
    }

    fn converted(link: &str) -> ResolvedLink {
        ResolvedLink {
            affiliate_link: link.to_string(),
            used_fallback: false,
        }
    }

    #[test]
    fn test_three_line_layout() {
        let out = format_deal(&deal("Wireless Mouse"), &converted("https://aff.example/x"));
        assert_eq!(
            out,
            "📦 *Product:* Wireless Mouse\n\
             💰 *Price:* ₹1,999 → ₹999\n\
             🔗 *Affiliate Link:* [Buy Now](https://aff.example/x)"
        );
    }

    #[test]
    fn test_fallback_label() {
        let resolved = ResolvedLink {
            affiliate_link: "https://example.com/item".to_string(),
            used_fallback: true,
        };
        let out = format_deal(&deal("Wireless Mouse"), &resolved);
        assert!(out.ends_with("🔗 *Link:* [Buy Now](https://example.com/item)"));
    }

    #[test]
    fn test_product_name_is_escaped() {
        let out = format_deal(
            &deal("Mouse [2-pack] *new* v1.5_pro"),
            &converted("https://aff.example/x"),
        );
        assert!(out.contains(r"📦 *Product:* Mouse \[2\-pack\] \*new\* v1\.5\_pro"));
    }

    #[test]
    fn test_multiline_product_name_stays_on_one_line() {
        let out = format_deal(
            &deal("Wireless Mouse\nBrand: Logi  \n  2.4GHz"),
            &converted("https://aff.example/x"),
        );
        assert_eq!(out.lines().count(), 3);
        assert!(out.starts_with(r"📦 *Product:* Wireless Mouse Brand: Logi 2\.4GHz"));
    }

    #[test]
    fn test_decimal_price_is_escaped() {
        let mut d = deal("Cable");
        d.price_before = "1,299.50".to_string();
        d.price_after = "999.00".to_string();
        let out = format_deal(&d, &converted("https://aff.example/x"));
        assert!(out.contains(r"₹1,299\.50 → ₹999\.00"));
    }

    #[test]
    fn test_link_url_parenthesis_is_escaped() {
        let out = format_deal(&deal("Cable"), &converted("https://aff.example/x_(y)"));
        assert!(out.ends_with(r"[Buy Now](https://aff.example/x_(y\))"));
    }
}
