use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseSortBy {
    CreatedAt,
    Title,
    Price,
}

// Query strings are flat: serde's `flatten` does not play well with numeric
// fields under `serde_urlencoded`, so paging fields are repeated per query type.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CourseQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive title search.
    pub q: Option<String>,
    pub published: Option<bool>,
    pub instructor_id: Option<Uuid>,
    pub category: Option<String>,
    pub sort_by: Option<CourseSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl CourseQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_page_and_size() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize(), (3, 10, 20));
        let p = Pagination {
            page: Some(-4),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
    }
}
