//! Product listing parameters.

/// Filters of a product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub per_page: u32,
    pub page: u32,
    /// Category slug; resolved to a category id before the request.
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            per_page: 12,
            page: 1,
            category: None,
            featured: None,
            search: None,
        }
    }
}

impl ProductQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    #[must_use]
    pub fn in_category(mut self, slug: impl Into<String>) -> Self {
        self.category = Some(slug.into());
        self
    }

    #[must_use]
    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    #[must_use]
    pub fn matching(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Stable key identifying this listing in the catalog cache.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "products:{}:{}:{}:{}:{}",
            self.per_page,
            self.page,
            self.category.as_deref().unwrap_or_default(),
            self.featured.map(|f| f.to_string()).unwrap_or_default(),
            self.search.as_deref().unwrap_or_default(),
        )
    }

    /// Query string parameters, with the category already resolved.
    #[must_use]
    pub fn params(&self, category_id: Option<u64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("per_page", self.per_page.to_string()),
            ("page", self.page.to_string()),
            ("status", "publish".to_string()),
        ];
        if let Some(id) = category_id {
            params.push(("category", id.to_string()));
        }
        if let Some(featured) = self.featured {
            params.push(("featured", featured.to_string()));
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_list_first_page_of_published_products() {
        let params = ProductQuery::new().params(None);
        assert_eq!(
            params,
            vec![
                ("per_page", "12".to_string()),
                ("page", "1".to_string()),
                ("status", "publish".to_string()),
            ]
        );
    }

    #[test]
    fn resolved_category_is_sent_as_id() {
        let query = ProductQuery::new().in_category("tags").matching("collar");
        let params = query.params(Some(17));
        assert!(params.contains(&("category", "17".to_string())));
        assert!(params.contains(&("search", "collar".to_string())));
    }

    #[test]
    fn cache_key_distinguishes_filters() {
        let plain = ProductQuery::new();
        let paged = ProductQuery::new().with_page(2);
        let featured = ProductQuery::new().featured(true);
        assert_ne!(plain.cache_key(), paged.cache_key());
        assert_ne!(plain.cache_key(), featured.cache_key());
        assert_eq!(plain.cache_key(), ProductQuery::default().cache_key());
    }
}
