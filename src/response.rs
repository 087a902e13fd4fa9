use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
    pub total_pages: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
            total_pages: Some(total_pages),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
            total_pages: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
    /// Page paths whose cached renderings are stale after this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revalidate: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
            revalidate: None,
        }
    }

    /// Attach cache invalidation hints for the pages that display the mutated entity.
    pub fn revalidating<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        tracing::debug!(paths = ?paths, "revalidate");
        self.revalidate = Some(paths);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_rounds_total_pages_up() {
        let meta = Meta::new(1, 10, 21);
        assert_eq!(meta.total_pages, Some(3));
        assert_eq!(Meta::new(1, 10, 0).total_pages, Some(0));
    }

    #[test]
    fn revalidate_is_omitted_unless_set() {
        let plain = serde_json::to_value(ApiResponse::success("ok", 1, None)).unwrap();
        assert!(plain.get("revalidate").is_none());

        let hinted = ApiResponse::success("ok", 1, None).revalidating(["/admin/courses"]);
        let json = serde_json::to_value(hinted).unwrap();
        assert_eq!(json["revalidate"][0], "/admin/courses");
    }
}
