use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use scraper::{ElementRef, Html};
use sethu_core::{Doctor, Error, Result};
use std::time::Duration;

use super::{BASE_URL, SITE};
use crate::client::HtmlClient;
use crate::sanitize::{sanitize_html, PROFILE_RULES};
use crate::scrapers::utils;
use crate::scrapers::{Scraped, Scraper, SourceMetadata};

const PROFILE_PARENTS: &[&str] = &["doctor", "doctors", "team", "our-doctor", "our-doctors"];
const LISTING_PAGES: &[&str] = &["/doctors/", "/our-doctors/", "/team/", "/medical-team/"];
const SECTION_HEADINGS: &[&str] = &["h2", "h3", "h4"];
const DEGREES: &[&str] = &["MBBS", "MD", "MS", "DNB", "DGO", "FRCOG", "MRCOG", "FNB"];
const SITEMAP_PAUSE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct MedcyDoctorsScraper {
    client: HtmlClient,
}

impl MedcyDoctorsScraper {
    pub fn new(client: HtmlClient) -> Self {
        Self { client }
    }

    async fn collect_from_sitemap(&self, max: usize) -> Result<Vec<String>> {
        let index = self.client.get_html(&format!("{}/sitemap_index.xml", BASE_URL)).await?;
        let mut urls = Vec::new();

        for sitemap in sitemap_locs(&index)? {
            let xml = match self.client.get_html(&sitemap).await {
                Ok(xml) => xml,
                Err(e) => {
                    tracing::debug!("Skipping sitemap {}: {}", sitemap, e);
                    continue;
                }
            };
            urls.extend(
                sitemap_locs(&xml)?
                    .into_iter()
                    .filter(|url| is_profile_url(url))
                    .map(|url| utils::normalize_url(&url)),
            );
            urls = utils::dedupe(urls);
            if urls.len() >= max {
                break;
            }
            tokio::time::sleep(SITEMAP_PAUSE).await;
        }

        urls.truncate(max);
        Ok(urls)
    }

    async fn collect_from_listings(&self, max: usize) -> Result<Vec<String>> {
        let pages: Vec<String> = LISTING_PAGES.iter().map(|path| format!("{}{}", BASE_URL, path)).collect();
        let fetched = join_all(pages.iter().map(|page| self.client.get_html(page))).await;

        let mut urls = Vec::new();
        for (page, html) in pages.iter().zip(fetched) {
            match html {
                Ok(html) => urls.extend(parse_profile_links(page, &html)?),
                Err(e) => tracing::debug!("Skipping listing {}: {}", page, e),
            }
        }
        let mut urls = utils::dedupe(urls);
        urls.truncate(max);
        Ok(urls)
    }
}

/// Profile pages look like `/doctors/<slug>/`, `/team/<slug>/` or `/our-doctors/<slug>/`.
pub fn is_profile_url(url: &str) -> bool {
    let Ok(parsed) = utils::parse_url(url) else {
        return false;
    };
    let on_site = parsed
        .host_str()
        .is_some_and(|host| host.to_ascii_lowercase().ends_with(SITE));
    if !on_site {
        return false;
    }
    let segments: Vec<String> = utils::path_segments(&parsed)
        .into_iter()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    segments.len() >= 2 && PROFILE_PARENTS.contains(&segments[segments.len() - 2].as_str())
}

/// `<loc>` entries of a sitemap or sitemap index.
pub fn sitemap_locs(xml: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(xml);
    let selector = utils::selector("loc")?;
    Ok(document
        .select(&selector)
        .map(|loc| loc.text().collect::<String>().trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect())
}

pub fn parse_profile_links(page_url: &str, html: &str) -> Result<Vec<String>> {
    let base = utils::parse_url(page_url)?;
    let document = Html::parse_document(html);
    Ok(utils::links(&document, &base)?
        .into_iter()
        .filter(|url| is_profile_url(url))
        .map(|url| utils::normalize_url(&url))
        .collect())
}

/// Reads "12+ years", "15 Years" and the like.
pub fn parse_experience(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    lower.match_indices("year").find_map(|(i, _)| {
        let before = lower[..i].trim_end();
        let before = before.strip_suffix('+').unwrap_or(before).trim_end();
        let digits: String = before
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        digits.parse().ok()
    })
}

fn is_section_heading(element: &ElementRef<'_>) -> bool {
    SECTION_HEADINGS.contains(&element.value().name())
}

/// Elements after `heading` up to the next section heading.
fn section_after<'a>(heading: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !is_section_heading(el))
        .collect()
}

fn headings_matching<'a>(content: ElementRef<'a>, words: &[&str]) -> Vec<ElementRef<'a>> {
    content
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(is_section_heading)
        .filter(|h| {
            let text = h.text().collect::<String>().to_lowercase();
            words.iter().any(|w| text.contains(w))
        })
        .collect()
}

fn parse_specialties(content: ElementRef<'_>) -> Result<Vec<String>> {
    let li = utils::selector("li")?;
    let mut specialties = Vec::new();
    for heading in headings_matching(content, &["special", "expert"]) {
        for el in section_after(heading) {
            specialties.extend(
                el.select(&li)
                    .map(|item| utils::collapse_whitespace(&item.text().collect::<String>()))
                    .filter(|item| !item.is_empty()),
            );
        }
    }
    Ok(specialties)
}

fn parse_qualifications(content: ElementRef<'_>) -> Option<String> {
    let from_heading = headings_matching(content, &["qualification", "education"])
        .into_iter()
        .filter_map(|heading| {
            let text: String = section_after(heading)
                .iter()
                .map(|el| el.text().collect::<String>())
                .collect::<Vec<_>>()
                .join(" ");
            let text = utils::collapse_whitespace(&text);
            (!text.is_empty()).then_some(text)
        })
        .last();
    if from_heading.is_some() {
        return from_heading;
    }

    let lines: Vec<String> = content
        .text()
        .flat_map(|chunk| chunk.lines())
        .map(utils::collapse_whitespace)
        .filter(|line| {
            line.split(|c: char| !c.is_ascii_alphanumeric())
                .any(|word| DEGREES.contains(&word))
        })
        .collect();
    (!lines.is_empty()).then(|| utils::dedupe(lines).join(" | "))
}

pub fn parse_doctor(url: &str, html: &str) -> Result<Doctor> {
    let base = utils::parse_url(url)?;
    let document = Html::parse_document(html);

    let name = [
        utils::first_text(&document, "h1.entry-title")?,
        utils::first_text(&document, "h1")?,
        utils::meta_content(&document, r#"meta[property="og:title"]"#)?,
        utils::first_text(&document, "title")?,
    ]
    .into_iter()
    .flatten()
    .next()
    .ok_or_else(|| Error::Scraping(format!("No doctor name found at {}", url)))?;

    let designation = [
        utils::first_text(&document, ".entry-content strong")?,
        utils::first_text(&document, ".entry-content em")?,
        utils::first_text(&document, ".entry-subtitle")?,
        utils::first_text(&document, ".subtitle")?,
    ]
    .into_iter()
    .flatten()
    .next();

    let content = utils::first_match(&document, &[".entry-content", ".post-content", ".content", "article"])?;

    let image_url = match utils::meta_content(&document, r#"meta[property="og:image"]"#)? {
        Some(image) => Some(image),
        None => match utils::meta_content(&document, r#"meta[name="twitter:image"]"#)? {
            Some(image) => Some(image),
            None => match content {
                Some(content) => utils::first_image(content, &base)?,
                None => None,
            },
        },
    };

    let (about_html, specialties, qualifications, experience_years) = match content {
        Some(content) => {
            let about = sanitize_html(content, &PROFILE_RULES);
            let about_doc = Html::parse_fragment(&about);
            let text = about_doc.root_element().text().collect::<String>();
            (
                (!about.is_empty()).then_some(about),
                parse_specialties(content)?,
                parse_qualifications(content),
                parse_experience(&text),
            )
        }
        None => (None, Vec::new(), None, None),
    };

    let content_hash = utils::content_hash(&format!(
        "{}|{}|{}",
        about_html.as_deref().unwrap_or_default(),
        name,
        designation.as_deref().unwrap_or_default()
    ));

    Ok(Doctor {
        source_site: SITE.to_string(),
        slug: utils::slug_from_url(url),
        name,
        designation,
        specialties,
        qualifications,
        experience_years,
        languages: Vec::new(),
        location: None,
        image_url,
        profile_url: utils::normalize_url(url),
        about_html,
        content_hash,
        scraped_at: Utc::now(),
    })
}

#[async_trait]
impl Scraper for MedcyDoctorsScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Medcy IVF Doctors",
            emoji: "🩺",
            site: SITE,
        }
    }

    fn can_handle(&self, url: &str) -> bool {
        is_profile_url(url)
    }

    fn cli_names(&self) -> Vec<&str> {
        vec!["medcy-doctors", "doctors"]
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(800)
    }

    async fn collect_urls(&self, max: usize) -> Result<Vec<String>> {
        let urls = match self.collect_from_sitemap(max).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("Sitemap crawl failed ({}), trying listing pages", e);
                Vec::new()
            }
        };
        if !urls.is_empty() {
            return Ok(urls);
        }
        self.collect_from_listings(max).await
    }

    async fn scrape(&self, url: &str) -> Result<Scraped> {
        let html = self.client.get_html(url).await?;
        Ok(Scraped::Doctor(parse_doctor(url, &html)?))
    }
}
