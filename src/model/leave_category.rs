use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter)]
pub enum LeaveCategory {
    #[strum(serialize = "Sick Leave")]
    Sick,
    #[strum(serialize = "Casual Leave")]
    Casual,
    #[strum(serialize = "Annual Leave")]
    Annual,
    #[strum(serialize = "Emergency Leave")]
    Emergency,
}

/// Built-in categories plus the ones added through `LEAVE_CATEGORIES_EXTRA`.
#[derive(Debug, Clone, Default)]
pub struct CategoryCatalog {
    extra: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryListResponse {
    #[schema(example = json!(["Sick Leave", "Casual Leave", "Annual Leave", "Emergency Leave"]))]
    pub categories: Vec<String>,
}

impl CategoryCatalog {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = CategoryCatalog::default();
        for name in extra {
            let name = name.as_ref().trim();
            if !name.is_empty() && catalog.resolve(name).is_none() {
                catalog.extra.push(name.to_string());
            }
        }
        catalog
    }

    /// Parses a comma separated list, e.g. `"Event Leave, Promotional for university"`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    /// Canonical spelling of `name`, matched case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let name = name.trim();
        LeaveCategory::iter()
            .map(|c| c.as_ref().to_string())
            .chain(self.extra.iter().cloned())
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<String> {
        LeaveCategory::iter()
            .map(|c| c.to_string())
            .chain(self.extra.iter().cloned())
            .collect()
    }
}
