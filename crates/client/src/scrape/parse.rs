//! HTML parsing for the guide index and per-build detail pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use buildguide_core::{BuildRecord, BuildStep, BuildType, Difficulty};

use crate::fetch::resolve_link;

static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").expect("invalid selector"));
static SECTION_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3, h4").expect("invalid selector"));
static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div, article").expect("invalid selector"));
static ITEM_NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3, h4, h5, strong, b").expect("invalid selector"));
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").expect("invalid selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("invalid selector"));
static STEP_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("ol > li").expect("invalid selector"));

static SECTION_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new("section|build").expect("invalid regex"));
static ITEM_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new("build|card|item").expect("invalid regex"));
static DESC_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new("desc").expect("invalid regex"));

static FEUDAL_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Feudal Age (\d+)").expect("invalid regex"));
static CASTLE_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Castle Age (\d+)").expect("invalid regex"));
static IMPERIAL_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Imperial Age (\d+)").expect("invalid regex"));
static CLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\+?").expect("invalid regex"));

/// A build found on the index page, with the link to its detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub record: BuildRecord,
    pub detail_url: Option<Url>,
}

/// Age-up times mentioned in `text`, in minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeTimes {
    pub feudal: Option<u32>,
    pub castle: Option<u32>,
    pub imperial: Option<u32>,
}

/// Parse the guide index page into build listings.
///
/// Duplicates (same name and type) are dropped; the first occurrence wins.
pub fn parse_index(html: &str, base: &Url) -> Vec<Listing> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for section in document.select(&DIV).filter(|el| has_class(el, &SECTION_CLASS)) {
        let Some(title) = section.select(&SECTION_TITLE).next() else {
            continue;
        };
        let Some(build_type) = build_type_from_title(&text_of(&title)) else {
            continue;
        };

        for item in section
            .select(&ITEM)
            .filter(|el| el.id() != section.id() && has_class(el, &ITEM_CLASS))
        {
            let Some(listing) = parse_item(&item, build_type, base) else {
                continue;
            };
            if seen.insert((listing.record.name.clone(), build_type)) {
                listings.push(listing);
            }
        }
    }

    tracing::debug!(count = listings.len(), "parsed guide index");
    listings
}

fn parse_item(item: &ElementRef<'_>, build_type: BuildType, base: &Url) -> Option<Listing> {
    let name = item.select(&ITEM_NAME).next().map(|el| text_of(&el))?;
    if name.is_empty() {
        return None;
    }

    let description = item
        .select(&PARAGRAPH)
        .next()
        .or_else(|| item.select(&DIV).find(|el| has_class(el, &DESC_CLASS)))
        .map(|el| text_of(&el))
        .unwrap_or_default();

    let difficulty = difficulty_from_text(&format!("{description} {name}"));
    let times = age_times(&description);

    let detail_url = item
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| resolve_link(base, href));

    let record = BuildRecord {
        feudal_age_time: times.feudal,
        castle_age_time: times.castle,
        imperial_age_time: times.imperial,
        ..BuildRecord::new(name, build_type, difficulty).with_description(description)
    };

    Some(Listing { record, detail_url })
}

/// Parse a build detail page into ordered steps and any age times it
/// mentions.
pub fn parse_detail(html: &str) -> (Vec<BuildStep>, AgeTimes) {
    let document = Html::parse_document(html);
    let mut age = String::from("Dark Age");
    let mut steps = Vec::new();

    for (li, step_number) in document.select(&STEP_ITEM).zip(1u32..) {
        let text = text_of(&li);
        if text.is_empty() {
            continue;
        }
        if let Some(label) = age_label(&text) {
            age = label.to_string();
        }

        let action = text.split_once(". ").map_or(text.as_str(), |(head, _)| head).to_string();
        steps.push(BuildStep {
            step_number,
            age: age.clone(),
            time: CLOCK.find(&text).map(|m| m.as_str().to_string()),
            action,
            details: text,
            resources_needed: None,
        });
    }

    // Renumber in case empty items were skipped.
    for (step, n) in steps.iter_mut().zip(1u32..) {
        step.step_number = n;
    }

    let body = document.root_element().text().collect::<Vec<_>>().join(" ");
    (steps, age_times(&body))
}

pub fn build_type_from_title(title: &str) -> Option<BuildType> {
    let title = title.to_lowercase();
    if title.contains("feudal rush") {
        Some(BuildType::FeudalRush)
    } else if title.contains("fast castle") {
        Some(BuildType::FastCastle)
    } else if title.contains("dark age rush") || title.contains("drush") {
        Some(BuildType::DarkAgeRush)
    } else if title.contains("water") {
        Some(BuildType::WaterMaps)
    } else {
        None
    }
}

pub fn difficulty_from_text(text: &str) -> Difficulty {
    let text = text.to_lowercase();
    if text.contains("beginner") {
        Difficulty::Beginner
    } else if text.contains("advanced") {
        Difficulty::Advanced
    } else {
        Difficulty::Intermediate
    }
}

pub fn age_times(text: &str) -> AgeTimes {
    let first = |re: &Regex| re.captures(text).and_then(|c| c[1].parse::<u32>().ok());
    AgeTimes { feudal: first(&FEUDAL_TIME), castle: first(&CASTLE_TIME), imperial: first(&IMPERIAL_TIME) }
}

fn age_label(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    ["Imperial Age", "Castle Age", "Feudal Age", "Dark Age"]
        .into_iter()
        .find(|label| text.contains(&label.to_lowercase()))
}

fn has_class(el: &ElementRef<'_>, pattern: &Regex) -> bool {
    el.value().classes().any(|class| pattern.is_match(class))
}

/// Whitespace-collapsed text content.
fn text_of(el: &ElementRef<'_>) -> String {
    el.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}
