use chrono::{DateTime, Weekday};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Publish-date layout accepted for `<pubDate>`: RFC 1123 with a numeric zone,
/// e.g. `Mon, 02 Jan 2006 15:04:05 -0700`.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// [`PUB_DATE_FORMAT`] after the weekday prefix.
const PUB_DATE_BODY_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// An RSS 2.0 document: `<rss><channel>…</channel></rss>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssDocument {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

/// One `<item>`. Missing elements are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

// Element names are matched on their local part, so `<atom:link>` and
// `<itunes:title>` land in the same slot as `<link>` and `<title>`. Every
// slot is a list and the first non-empty value wins.

/// Character data of one element. Child elements and attributes are
/// skipped, so inline markup such as `<b>` inside a description keeps only
/// the surrounding text.
#[derive(Default)]
struct ElementText(String);

impl<'de> Deserialize<'de> for ElementText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextVisitor;

        impl<'de> Visitor<'de> for TextVisitor {
            type Value = ElementText;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an element with text content")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ElementText, E> {
                Ok(ElementText(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<ElementText, E> {
                Ok(ElementText(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<ElementText, E> {
                Ok(ElementText::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ElementText, A::Error> {
                let mut text = String::new();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "$text" {
                        text.push_str(&map.next_value::<String>()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(ElementText(text))
            }
        }

        deserializer.deserialize_struct("ElementText", &["$text"], TextVisitor)
    }
}

#[derive(Deserialize)]
struct RawDocument {
    channel: RawChannel,
}

#[derive(Deserialize)]
struct RawChannel {
    #[serde(default)]
    title: Vec<ElementText>,
    #[serde(default)]
    link: Vec<ElementText>,
    #[serde(default)]
    description: Vec<ElementText>,
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    title: Vec<ElementText>,
    #[serde(default)]
    link: Vec<ElementText>,
    #[serde(default)]
    description: Vec<ElementText>,
    #[serde(rename = "pubDate", default)]
    pub_date: Vec<ElementText>,
}

fn first_non_empty(values: Vec<ElementText>) -> String {
    values
        .into_iter()
        .map(|ElementText(text)| text)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

impl From<RawDocument> for RssDocument {
    fn from(raw: RawDocument) -> Self {
        let RawChannel {
            title,
            link,
            description,
            items,
        } = raw.channel;
        RssDocument {
            channel: RssChannel {
                title: first_non_empty(title),
                link: first_non_empty(link),
                description: first_non_empty(description),
                items: items
                    .into_iter()
                    .map(|item| RssItem {
                        title: first_non_empty(item.title),
                        link: first_non_empty(item.link),
                        description: first_non_empty(item.description),
                        pub_date: first_non_empty(item.pub_date),
                    })
                    .collect(),
            },
        }
    }
}

impl RssItem {
    /// The description, or `None` when it is absent or empty.
    pub fn description(&self) -> Option<&str> {
        if self.description.is_empty() {
            None
        } else {
            Some(&self.description)
        }
    }

    /// Parse `pub_date` with [`PUB_DATE_FORMAT`] into unix seconds.
    pub fn published_at(&self) -> Result<i64, chrono::ParseError> {
        parse_pub_date(&self.pub_date)
    }
}

/// Parse an RSS 2.0 document from raw bytes.
///
/// SEC-002: quick-xml (0.37) never expands `<!ENTITY>` declarations, so
/// documents carrying custom entities fail to parse instead of resolving them.
pub fn parse_document(bytes: &[u8]) -> Result<RssDocument, quick_xml::DeError> {
    let raw: RawDocument = quick_xml::de::from_reader(bytes)?;
    Ok(raw.into())
}

/// Parse a publish date in the single accepted layout into unix seconds.
///
/// The weekday must be a valid three-letter name but is not checked against
/// the date: `Mon, 03 Jan 2006 …` parses as 3 January.
pub fn parse_pub_date(text: &str) -> Result<i64, chrono::ParseError> {
    let text = text.trim();
    let parsed = match text.split_once(", ") {
        Some((weekday, body)) if weekday.len() == 3 && weekday.parse::<Weekday>().is_ok() => {
            DateTime::parse_from_str(body, PUB_DATE_BODY_FORMAT)
        }
        _ => DateTime::parse_from_str(text, PUB_DATE_FORMAT),
    };
    parsed.map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
    <title>Example Blog</title>
    <link>https://example.com/</link>
    <description>Recent posts</description>
    <atom:link href="https://example.com/index.xml" rel="self" type="application/rss+xml"/>
    <language>en-us</language>
    <item>
        <title>First</title>
        <link>https://example.com/first</link>
        <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
        <guid>https://example.com/first</guid>
        <description>Hello &amp; welcome</description>
    </item>
    <item>
        <title>Second</title>
        <link>https://example.com/second</link>
        <pubDate>Fri, 13 Oct 2023 12:00:00 +0000</pubDate>
        <description></description>
    </item>
    <item>
        <title>Third</title>
        <link>https://example.com/third</link>
        <pubDate>Wed, 01 Nov 2023 08:30:00 +0000</pubDate>
    </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_document_channel_and_items() {
        let doc = parse_document(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.channel.title, "Example Blog");
        assert_eq!(doc.channel.link, "https://example.com/");
        assert_eq!(doc.channel.description, "Recent posts");

        let titles: Vec<&str> = doc.channel.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        let first = &doc.channel.items[0];
        assert_eq!(first.link, "https://example.com/first");
        assert_eq!(first.description(), Some("Hello & welcome"));
        assert_eq!(first.pub_date, "Mon, 02 Jan 2006 15:04:05 -0700");
    }

    #[test]
    fn test_empty_and_missing_description_are_none() {
        let doc = parse_document(SAMPLE.as_bytes()).unwrap();
        assert_eq!(doc.channel.items[1].description(), None);
        assert_eq!(doc.channel.items[2].description(), None);
    }

    #[test]
    fn test_cdata_description() {
        let xml = r#"<rss><channel><title>T</title>
            <item><title>A</title><link>https://e.com/a</link>
            <description><![CDATA[<p>Rich</p>]]></description>
            <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate></item>
        </channel></rss>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(doc.channel.items[0].description(), Some("<p>Rich</p>"));
    }

    #[test]
    fn test_inline_markup_keeps_surrounding_text() {
        let xml = r#"<rss><channel><title>T</title>
            <item><title>Marked up</title><link>https://e.com/a</link>
            <description>x <b>bold</b> y</description>
            <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate></item>
            <item><title>Plain</title><link>https://e.com/b</link>
            <description>plain</description>
            <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate></item>
        </channel></rss>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(doc.channel.items.len(), 2);

        let marked = doc.channel.items[0].description().unwrap();
        assert!(marked.starts_with('x'));
        assert!(marked.ends_with('y'));
        assert!(!marked.contains("bold"));
        assert_eq!(doc.channel.items[1].description(), Some("plain"));
    }

    #[test]
    fn test_namespaced_duplicates_do_not_clobber() {
        let xml = r#"<rss xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
                          xmlns:atom="http://www.w3.org/2005/Atom"><channel>
            <title>Podcast</title>
            <item>
                <atom:link href="https://e.com/self" rel="self"/>
                <title>Episode 1</title>
                <itunes:title>Ep. 1</itunes:title>
                <link>https://e.com/ep1</link>
                <pubDate>Mon, 02 Jan 2006 15:04:05 -0700</pubDate>
            </item>
        </channel></rss>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        let item = &doc.channel.items[0];
        assert_eq!(item.title, "Episode 1");
        assert_eq!(item.link, "https://e.com/ep1");
    }

    #[test]
    fn test_channel_without_items() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        let doc = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(doc.channel.title, "Empty");
        assert!(doc.channel.items.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_document(b"<not valid xml").is_err());
    }

    #[test]
    fn test_non_rss_document_is_error() {
        let html = b"<html><head><title>Nope</title></head><body></body></html>";
        assert!(parse_document(html).is_err());
    }

    #[test]
    fn test_parse_pub_date_numeric_zone() {
        // 2006-01-02T22:04:05Z
        assert_eq!(
            parse_pub_date("Mon, 02 Jan 2006 15:04:05 -0700").unwrap(),
            1_136_239_445
        );
        assert_eq!(
            parse_pub_date("Fri, 13 Oct 2023 12:00:00 +0000").unwrap(),
            1_697_198_400
        );
    }

    #[test]
    fn test_parse_pub_date_ignores_weekday_value() {
        // 3 January 2006 was a Tuesday
        assert_eq!(
            parse_pub_date("Mon, 03 Jan 2006 15:04:05 -0700").unwrap(),
            1_136_239_445 + 86_400
        );
        assert_eq!(
            parse_pub_date("Sun, 13 Oct 2023 12:00:00 +0000").unwrap(),
            1_697_198_400
        );
    }

    #[test]
    fn test_parse_pub_date_requires_weekday_name() {
        assert!(parse_pub_date("Xyz, 02 Jan 2006 15:04:05 -0700").is_err());
        assert!(parse_pub_date("02 Jan 2006 15:04:05 -0700").is_err());
        assert!(parse_pub_date("Monday, 02 Jan 2006 15:04:05 -0700").is_err());
    }

    #[test]
    fn test_parse_pub_date_rejects_other_layouts() {
        assert!(parse_pub_date("2023-10-13T12:00:00Z").is_err());
        assert!(parse_pub_date("Fri, 13 Oct 2023 12:00:00 GMT").is_err());
        assert!(parse_pub_date("").is_err());
        assert!(parse_pub_date("yesterday").is_err());
    }

    proptest! {
        #[test]
        fn prop_description_none_iff_empty(desc in ".{0,40}") {
            let item = RssItem { description: desc.clone(), ..Default::default() };
            prop_assert_eq!(item.description().is_none(), desc.is_empty());
        }

        #[test]
        fn prop_pub_date_matches_timestamp(secs in 0i64..4_000_000_000) {
            let dt = DateTime::from_timestamp(secs, 0).unwrap();
            let text = dt.format(PUB_DATE_FORMAT).to_string();
            prop_assert_eq!(parse_pub_date(&text).unwrap(), secs);
        }
    }
}
