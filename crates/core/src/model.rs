//! Domain types: build records, steps, query parameters and result pages.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Coarse strategy category of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildType {
    FeudalRush,
    FastCastle,
    DarkAgeRush,
    WaterMaps,
}

impl BuildType {
    pub const ALL: [BuildType; 4] =
        [BuildType::FeudalRush, BuildType::FastCastle, BuildType::DarkAgeRush, BuildType::WaterMaps];

    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::FeudalRush => "feudal_rush",
            BuildType::FastCastle => "fast_castle",
            BuildType::DarkAgeRush => "dark_age_rush",
            BuildType::WaterMaps => "water_maps",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown build type: {s}")))
    }
}

/// Skill level a build is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown difficulty: {s}")))
    }
}

/// One ordered instruction within a build's guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// 1-based, strictly increasing within a build.
    pub step_number: u32,
    pub age: String,
    #[serde(default)]
    pub time: Option<String>,
    pub action: String,
    pub details: String,
    #[serde(default)]
    pub resources_needed: Option<BTreeMap<String, i64>>,
}

/// A named strategy guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub build_type: BuildType,
    #[serde(default)]
    pub feudal_age_time: Option<u32>,
    #[serde(default)]
    pub castle_age_time: Option<u32>,
    #[serde(default)]
    pub imperial_age_time: Option<u32>,
    #[serde(default)]
    pub steps: Option<Vec<BuildStep>>,
}

impl BuildRecord {
    pub fn new(name: impl Into<String>, build_type: BuildType, difficulty: Difficulty) -> Self {
        Self {
            name: name.into(),
            difficulty,
            description: String::new(),
            build_type,
            feudal_age_time: None,
            castle_age_time: None,
            imperial_age_time: None,
            steps: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Case-insensitive substring match on name or description.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

/// Validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    /// Validate `page >= 1` and `1 <= size <= 100`.
    pub fn new(page: i64, size: i64) -> Result<Self, Error> {
        if page < 1 || page > i64::from(u32::MAX) {
            return Err(Error::Validation("page must be greater than 0".into()));
        }
        if size < 1 || size > i64::from(MAX_PAGE_SIZE) {
            return Err(Error::Validation(format!("size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        Ok(Self { page: page as u32, size: size as u32 })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.size as usize)
    }

    /// Slice `[offset, offset + size)` of `items`, clamped to its length.
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.offset().min(items.len());
        let end = start.saturating_add(self.size as usize).min(items.len());
        items[start..end].to_vec()
    }
}

/// A page of results together with the unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Clone> Page<T> {
    /// Paginate a full result list. `None` returns every item.
    pub fn from_full(items: &[T], pagination: Option<&Pagination>) -> Self {
        let total = items.len();
        let items = match pagination {
            Some(p) => p.slice(items),
            None => items.to_vec(),
        };
        Self { items, total }
    }
}

/// Pagination block of an HTTP response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub size: u32,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total: usize) -> Self {
        let page = pagination.page();
        let size = pagination.size() as usize;
        let total_pages = if total > 0 { total.div_ceil(size) } else { 1 };
        let has_next = (page as usize) < total_pages;
        let has_prev = page > 1;
        Self {
            page,
            size: pagination.size(),
            total,
            total_pages,
            has_next,
            has_prev,
            next_page: if has_next { page.checked_add(1) } else { None },
            prev_page: has_prev.then_some(page - 1),
        }
    }
}

/// Field a filtered query may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    Difficulty,
    BuildType,
    FeudalAgeTime,
    CastleAgeTime,
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortField::Name),
            "difficulty" => Ok(SortField::Difficulty),
            "build_type" => Ok(SortField::BuildType),
            "feudal_age_time" => Ok(SortField::FeudalAgeTime),
            "castle_age_time" => Ok(SortField::CastleAgeTime),
            other => Err(Error::Validation(format!(
                "sort_by must be one of: name, difficulty, build_type, feudal_age_time, castle_age_time (got {other})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::Validation(format!("sort_order must be \"asc\" or \"desc\" (got {other})"))),
        }
    }
}

/// Combined filter for the uncached filtered query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildFilters {
    pub build_type: Option<BuildType>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl BuildFilters {
    /// Parse raw query-string values, rejecting unknown enum or sort values.
    pub fn parse(
        build_type: Option<&str>, difficulty: Option<&str>, search: Option<&str>, sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<Self, Error> {
        Ok(Self {
            build_type: build_type.map(str::parse::<BuildType>).transpose()?,
            difficulty: difficulty.map(str::parse::<Difficulty>).transpose()?,
            search: search.map(str::to_string),
            sort_by: sort_by.map(str::parse::<SortField>).transpose()?.unwrap_or_default(),
            sort_order: sort_order.map(str::parse::<SortOrder>).transpose()?.unwrap_or_default(),
        })
    }
}
