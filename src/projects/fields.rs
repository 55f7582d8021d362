//! Typed detail fields of a project and the parsing shim for legacy input.
//!
//! Older clients send list-shaped fields as one string: either a
//! JSON-encoded array or plain text split by newlines (features, images),
//! commas (tech stack) or `text|url` lines (links). Both shapes are accepted
//! here; storage and responses always use the typed lists.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// CSS `object-fit` used when rendering the project's main image.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "image_fit", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ImageSize {
    #[default]
    Cover,
    Contain,
    Fill,
    ScaleDown,
    None,
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "cover" => Ok(ImageSize::Cover),
            "contain" => Ok(ImageSize::Contain),
            "fill" => Ok(ImageSize::Fill),
            "scale-down" => Ok(ImageSize::ScaleDown),
            "none" => Ok(ImageSize::None),
            other => Err(format!("unknown image_size: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    #[serde(alias = "title")]
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy)]
pub enum Fallback {
    Lines,
    Commas,
}

/// A list field as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    Items(Vec<String>),
    Text(String),
}

impl ListInput {
    pub fn into_items(self, fallback: Fallback) -> Vec<String> {
        let items = match self {
            ListInput::Items(items) => items,
            ListInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Vec::new()
                } else if let Ok(items) = serde_json::from_str::<Vec<String>>(text) {
                    items
                } else {
                    match fallback {
                        Fallback::Lines => text.lines().map(str::to_string).collect(),
                        Fallback::Commas => text.split(',').map(str::to_string).collect(),
                    }
                }
            }
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

/// The `links` field as sent by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LinksInput {
    Items(Vec<ProjectLink>),
    Text(String),
}

impl LinksInput {
    pub fn into_links(self) -> Vec<ProjectLink> {
        let links = match self {
            LinksInput::Items(links) => links,
            LinksInput::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Vec::new()
                } else if let Ok(links) = serde_json::from_str::<Vec<ProjectLink>>(text) {
                    links
                } else {
                    text.lines().filter_map(parse_link_line).collect()
                }
            }
        };
        links
            .into_iter()
            .map(|l| ProjectLink {
                text: l.text.trim().to_string(),
                url: l.url.trim().to_string(),
            })
            .filter(|l| !l.url.is_empty())
            .collect()
    }
}

fn parse_link_line(line: &str) -> Option<ProjectLink> {
    let mut parts = line.split('|');
    let text = parts.next()?;
    let url = parts.next()?;
    Some(ProjectLink {
        text: text.to_string(),
        url: url.to_string(),
    })
}

/// Main image shown in listings: the first uploaded image, if any.
pub fn main_image(project_images: &[String]) -> String {
    project_images.first().cloned().unwrap_or_default()
}
