//! Sort specification types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// A sortable column of the product table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Title,
    Price,
    Reviews,
    VideoCount,
    LastUpdated,
    Category,
}

impl SortColumn {
    pub const ALL: [SortColumn; 6] = [
        Self::Title,
        Self::Price,
        Self::Reviews,
        Self::VideoCount,
        Self::LastUpdated,
        Self::Category,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Reviews => "reviews",
            Self::VideoCount => "video_count",
            Self::LastUpdated => "last_updated",
            Self::Category => "category",
        }
    }

    /// Column header text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Price => "Price",
            Self::Reviews => "Reviews",
            Self::VideoCount => "Video Count",
            Self::LastUpdated => "Last Updated",
            Self::Category => "Category",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = ModelError;

    /// Accepts the snake_case name or the store's field key, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");

        match normalized.as_str() {
            "title" => Ok(Self::Title),
            "price" => Ok(Self::Price),
            "reviews" => Ok(Self::Reviews),
            "video_count" | "videocount" => Ok(Self::VideoCount),
            "last_updated" | "timestamp" => Ok(Self::LastUpdated),
            "category" => Ok(Self::Category),
            _ => Err(ModelError::UnknownSortColumn(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Arrow shown next to the active column header.
    pub const fn indicator(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
        }
    }
}

/// The single active ordering of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: SortColumn,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: SortColumn::Price,
            direction: SortDirection::Ascending,
        }
    }
}

impl SortSpec {
    pub const fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    /// Spec after a click on `column`'s header.
    ///
    /// Clicking the active column flips its direction; any other column
    /// starts ascending.
    #[must_use]
    pub fn select(self, column: SortColumn) -> Self {
        if self.column == column {
            Self::new(column, self.direction.flipped())
        } else {
            Self::new(column, SortDirection::Ascending)
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column.label(), self.direction.indicator())
    }
}
