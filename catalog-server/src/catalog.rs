use std::path::Path;

use seo_core::{CatalogFile, Image, ImagePage, PageQuery};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: Vec<Image>,
}

impl Catalog {
    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        CatalogFile::parse(content).map(Self::new)
    }

    pub async fn load(path: &Path) -> Result<Self, crate::error::ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_json(&content)?)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// `query.limit` is expected to be clamped already (see [`PageQuery::new`]).
    pub fn page(&self, query: &PageQuery) -> ImagePage {
        let needle = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<&Image> = self
            .images
            .iter()
            .filter(|image| match &needle {
                Some(needle) => matches_search(image, needle),
                None => true,
            })
            .collect();

        let total = matching.len() as u64;
        let offset = query.offset.min(total);
        let images = matching
            .into_iter()
            .skip(offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        ImagePage {
            images,
            total,
            offset,
            limit: query.limit,
        }
    }

    pub fn update_alt_text(&mut self, id: &str, alt_text: Option<String>) -> Option<Image> {
        let image = self.images.iter_mut().find(|image| image.id == id)?;
        image.alt_text = alt_text;
        Some(image.clone())
    }
}

fn matches_search(image: &Image, needle: &str) -> bool {
    image.id.to_lowercase().contains(needle)
        || image.alt().to_lowercase().contains(needle)
        || image
            .url
            .as_deref()
            .is_some_and(|url| url.to_lowercase().contains(needle))
}
