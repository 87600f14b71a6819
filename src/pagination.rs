use sea_orm::{
    DatabaseConnection, EntityTrait, FromQueryResult, ItemsAndPagesNumber, PaginatorTrait, Select,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// 1-based page-number pagination with a fixed page size.
#[derive(Clone, Copy, Debug)]
pub struct PageNumberPagination {
    page_size: u64,
}

impl PageNumberPagination {
    pub fn new(page_size: u64) -> Self {
        Self { page_size: page_size.max(1) }
    }

    /// Absent means the first page; anything but a positive integer is invalid.
    pub fn page_number(query: &PageQuery) -> AppResult<u64> {
        match query.page.as_deref().map(str::trim) {
            None | Some("") => Ok(1),
            Some(raw) => raw.parse::<u64>().ok().filter(|&n| n > 0).ok_or(AppError::InvalidPage),
        }
    }

    /// An empty collection still has a first page.
    pub fn check(page: u64, number_of_pages: u64) -> AppResult<()> {
        if page == 0 || page > number_of_pages.max(1) {
            return Err(AppError::InvalidPage);
        }
        Ok(())
    }

    pub async fn fetch<E, M>(
        &self,
        db: &DatabaseConnection,
        select: Select<E>,
        page: u64,
    ) -> AppResult<Page<M>>
    where
        E: EntityTrait<Model = M>,
        M: FromQueryResult + Sized + Send + Sync + 'static,
    {
        let paginator = select.paginate(db, self.page_size);
        let ItemsAndPagesNumber { number_of_items, number_of_pages } =
            paginator.num_items_and_pages().await?;
        Self::check(page, number_of_pages)?;

        let results = paginator.fetch_page(page - 1).await?;
        Ok(Page {
            count: number_of_items,
            next: (page < number_of_pages).then_some(page + 1),
            previous: (page > 1).then_some(page - 1),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(raw: Option<&str>) -> AppResult<u64> {
        PageNumberPagination::page_number(&PageQuery { page: raw.map(str::to_string) })
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(page(None).unwrap(), 1);
        assert_eq!(page(Some("")).unwrap(), 1);
        assert_eq!(page(Some("3")).unwrap(), 3);
    }

    #[test]
    fn non_positive_or_garbled_page_is_invalid() {
        for raw in ["0", "-1", "two", "1.5"] {
            assert!(matches!(page(Some(raw)), Err(AppError::InvalidPage)), "{raw}");
        }
    }

    #[test]
    fn empty_collection_has_one_page() {
        assert!(PageNumberPagination::check(1, 0).is_ok());
        assert!(PageNumberPagination::check(2, 0).is_err());
        assert!(PageNumberPagination::check(3, 3).is_ok());
        assert!(PageNumberPagination::check(4, 3).is_err());
    }
}
