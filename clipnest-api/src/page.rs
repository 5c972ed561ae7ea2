use std::str::FromStr;

use crate::Error;

/// Sort direction accepted by every listing endpoint. Anything other
/// than "asc" or "dsc" is an invalid-input error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Dsc,
}

impl Default for SortOrder {
    fn default() -> SortOrder {
        SortOrder::Asc
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<SortOrder, Error> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "dsc" => Ok(SortOrder::Dsc),
            other => Err(Error::invalid_input(format!(
                "sort order must be \"asc\" or \"dsc\", got {other:?}"
            ))),
        }
    }
}

/// Offset pagination parameters, 1-based. Defaults to the first page
/// of 10 items.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Pagination {
        Pagination { page: 1, limit: 10 }
    }
}

impl Pagination {
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Result<Pagination, Error> {
        let d = Pagination::default();
        let res = Pagination {
            page: page.unwrap_or(d.page),
            limit: limit.unwrap_or(d.limit),
        };
        if res.page == 0 {
            return Err(Error::invalid_input("page must be a positive integer"));
        }
        if res.limit == 0 {
            return Err(Error::invalid_input("limit must be a positive integer"));
        }
        // limit and the derived offset are bound as SQL bigints
        match (res.page - 1).checked_mul(res.limit) {
            Some(offset) if i64::try_from(offset).is_ok() && i64::try_from(res.limit).is_ok() => {
                Ok(res)
            }
            _ => Err(Error::invalid_input("page and limit are out of range")),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// One page of a listing, along with the metadata callers need to
/// iterate the whole result set. `total_count` always comes from a
/// dedicated count query, never from the (possibly truncated) page.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_count: u64,
}

impl<T> PageOf<T> {
    pub fn new(items: Vec<T>, total_count: u64, pagination: Pagination) -> PageOf<T> {
        PageOf {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total_pages: (total_count + pagination.limit - 1) / pagination.limit,
            total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_order_parses_only_asc_and_dsc() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("dsc".parse::<SortOrder>().unwrap(), SortOrder::Dsc);
        for bad in ["desc", "ASC", "descending", ""] {
            assert!(matches!(
                bad.parse::<SortOrder>(),
                Err(Error::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn pagination_defaults_and_offset() {
        let p = Pagination::new(None, None).unwrap();
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(Some(3), Some(25)).unwrap();
        assert_eq!(p.offset(), 50);

        assert!(Pagination::new(Some(0), None).is_err());
        assert!(Pagination::new(None, Some(0)).is_err());
    }

    #[test]
    fn pagination_rejects_out_of_range_values() {
        for (page, limit) in [
            (u64::MAX, 10),
            (2, u64::MAX),
            (u64::MAX, u64::MAX),
            (i64::MAX as u64, 2),
        ] {
            assert!(
                matches!(
                    Pagination::new(Some(page), Some(limit)),
                    Err(Error::InvalidInput(_))
                ),
                "page={page} limit={limit}"
            );
        }
        let p = Pagination::new(Some(1_000_000), Some(100)).unwrap();
        assert_eq!(p.offset(), 99_999_900);
    }

    #[test]
    fn page_metadata_rounds_up() {
        let p = Pagination { page: 1, limit: 10 };
        assert_eq!(PageOf::<u8>::new(vec![], 0, p).total_pages, 0);
        assert_eq!(PageOf::<u8>::new(vec![], 10, p).total_pages, 1);
        assert_eq!(PageOf::<u8>::new(vec![], 11, p).total_pages, 2);
    }
}
