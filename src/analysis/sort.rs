//! Report ordering selected by an integer sort option
//!
//! Each tool has a fixed list of sortable fields. Option `k` below the number
//! of fields sorts by field `k` ascending, the next block of codes sorts by
//! the same fields descending.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::Serialize;

use crate::error::ConfigError;

/// Sortable column of a tool's report
pub trait SortField: Copy + Debug + 'static {
    /// Fields in option-code order
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F: SortField> SortSpec<F> {
    pub fn from_code(code: usize) -> Result<Self, ConfigError> {
        let n = F::ALL.len();
        let (index, order) = if code < n {
            (code, SortOrder::Ascending)
        } else if code < 2 * n {
            (code - n, SortOrder::Descending)
        } else {
            return Err(ConfigError::SortOption {
                option: code,
                max: 2 * n,
            });
        };
        Ok(Self {
            field: F::ALL[index],
            order,
        })
    }

    pub fn describe(&self) -> String {
        let order = match self.order {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        };
        format!("{} in {} order", self.field.label(), order)
    }

    /// Stable sort of `rows`; `compare` orders two rows by a field ascending
    pub fn apply<T, C>(&self, rows: &mut [T], compare: C)
    where
        C: Fn(F, &T, &T) -> Ordering,
    {
        let field = self.field;
        match self.order {
            SortOrder::Ascending => rows.sort_by(|a, b| compare(field, a, b)),
            SortOrder::Descending => rows.sort_by(|a, b| compare(field, b, a)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Column {
        Size,
        Name,
    }

    impl SortField for Column {
        const ALL: &'static [Self] = &[Column::Size, Column::Name];

        fn label(&self) -> &'static str {
            match self {
                Column::Size => "fragment size",
                Column::Name => "organism name",
            }
        }
    }

    fn compare(field: Column, a: &(usize, &str), b: &(usize, &str)) -> Ordering {
        match field {
            Column::Size => a.0.cmp(&b.0),
            Column::Name => a.1.cmp(b.1),
        }
    }

    #[test]
    fn test_codes_map_to_fields_and_orders() {
        let spec = SortSpec::<Column>::from_code(0).unwrap();
        assert_eq!(spec, SortSpec { field: Column::Size, order: SortOrder::Ascending });
        let spec = SortSpec::<Column>::from_code(3).unwrap();
        assert_eq!(spec, SortSpec { field: Column::Name, order: SortOrder::Descending });
        assert_eq!(spec.describe(), "organism name in descending order");
        assert_eq!(
            SortSpec::<Column>::from_code(4),
            Err(ConfigError::SortOption { option: 4, max: 4 })
        );
    }

    #[test]
    fn test_apply_is_stable() {
        let mut rows = vec![(3, "c"), (1, "a"), (3, "b"), (2, "a")];
        SortSpec::<Column>::from_code(0).unwrap().apply(&mut rows, compare);
        assert_eq!(rows, vec![(1, "a"), (2, "a"), (3, "c"), (3, "b")]);

        SortSpec::<Column>::from_code(2).unwrap().apply(&mut rows, compare);
        assert_eq!(rows, vec![(3, "c"), (3, "b"), (2, "a"), (1, "a")]);

        SortSpec::<Column>::from_code(3).unwrap().apply(&mut rows, compare);
        assert_eq!(rows, vec![(3, "c"), (3, "b"), (2, "a"), (1, "a")]);
    }
}
