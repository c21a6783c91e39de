use crate::config::ListingSelectors;
use crate::extractors::ExtractionError;
use crate::results::{ImageUrlSet, ScrapeResult};
use scraper::{Html, Selector};
use url::Url;

/// Parses a rendered or raw listing page into its fields
///
/// Fields whose selector matches nothing are left empty. Image sources are
/// resolved against `page_url` the way a browser resolves `img.src`.
pub fn parse_listing(
    html: &str,
    page_url: &Url,
    selectors: &ListingSelectors,
) -> Result<ScrapeResult, ExtractionError> {
    let doc = Html::parse_document(html);

    let title_selector = compile(&selectors.title)?;
    let price_selector = compile(&selectors.price)?;
    let image_selector = compile(&selectors.image)?;

    let title = first_text(&doc, &title_selector);
    let price = first_text(&doc, &price_selector);

    let image_urls = doc
        .select(&image_selector)
        .filter_map(|img| {
            let zoom = img.value().attr(&selectors.zoom_attribute);
            let src = img.value().attr("src");
            pick_image_source(zoom, src)
        })
        .map(|raw| resolve_against(page_url, &raw))
        .collect::<ImageUrlSet>();

    if title.is_empty() {
        ::log::warn!("No title matched `{}` on {}", selectors.title, page_url);
    }
    if price.is_empty() {
        ::log::warn!("No price matched `{}` on {}", selectors.price, page_url);
    }
    ::log::debug!("Listing parser found {} image URLs", image_urls.len());

    Ok(ScrapeResult::new(title, price, image_urls))
}

/// Choose the high-resolution attribute when present, falling back to `src`
///
/// Empty values count as absent.
pub fn pick_image_source<Z, S>(zoom: Option<Z>, src: Option<S>) -> Option<String>
where
    Z: AsRef<str>,
    S: AsRef<str>,
{
    let zoom = zoom
        .map(|z| z.as_ref().trim().to_string())
        .filter(|z| !z.is_empty());

    zoom.or_else(|| {
        src.map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

pub(crate) fn compile(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn first_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Resolve an image reference the way a browser resolves `img.src`
///
/// Unparseable references are kept verbatim and rejected later at download.
pub fn resolve_against(page_url: &Url, raw: &str) -> String {
    match page_url.join(raw) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}
