//! Integer calendar spanned by the tree.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use crate::error::{MigrationError, Result};

/// Take the second-to-last distinct isolate as the most recent sample.
/// In annotated tables the internal nodes carry a placeholder isolate (`NA`)
/// which sorts after every year-prefixed label.
pub const DEFAULT_YEAR_RANK: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calendar {
    root_height: f64,
    root_year: i64,
    most_current_year: i64,
}

impl Calendar {
    /// `year_rank` counts from the end of the sorted, deduplicated isolate list (1 = last).
    pub fn from_isolates<'a, I>(root_height: f64, isolates: I, year_rank: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let sorted: Vec<&str> = isolates.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let needed = year_rank.max(2);
        if year_rank == 0 || sorted.len() < needed {
            return Err(MigrationError::Calendar(format!(
                "need at least {} distinct isolates to take rank {} from the end, found {}",
                needed,
                year_rank,
                sorted.len()
            )));
        }
        let isolate = sorted[sorted.len() - year_rank];
        let most_current_year = year_prefix(isolate).ok_or_else(|| {
            MigrationError::Calendar(format!(
                "isolate '{}' does not start with a 4-digit year",
                isolate
            ))
        })?;
        Ok(Self::new(root_height, most_current_year))
    }

    pub fn new(root_height: f64, most_current_year: i64) -> Self {
        Calendar {
            root_height,
            root_year: most_current_year - root_height.ceil() as i64,
            most_current_year,
        }
    }

    pub fn root_height(&self) -> f64 {
        self.root_height
    }

    pub fn root_year(&self) -> i64 {
        self.root_year
    }

    pub fn most_current_year(&self) -> i64 {
        self.most_current_year
    }

    pub fn years(&self) -> RangeInclusive<i64> {
        self.root_year..=self.most_current_year
    }

    pub fn len(&self) -> usize {
        (self.most_current_year - self.root_year + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, year: i64) -> bool {
        self.years().contains(&year)
    }

    /// Column of `year`, if inside the calendar.
    pub fn index_of(&self, year: i64) -> Option<usize> {
        if self.contains(year) {
            Some((year - self.root_year) as usize)
        } else {
            None
        }
    }
}

fn year_prefix(isolate: &str) -> Option<i64> {
    let prefix = isolate.get(..4)?;
    if prefix.bytes().all(|b| b.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_to_last_isolate() {
        let isolates = ["2015_tipY", "", "2010_tipX", "2010_tipX"];
        let calendar = Calendar::from_isolates(5.2, isolates, DEFAULT_YEAR_RANK).unwrap();
        assert_eq!(calendar.most_current_year(), 2010);
        assert_eq!(calendar.root_year(), 2004);
        assert_eq!(calendar.years().collect::<Vec<_>>(), (2004..=2010).collect::<Vec<_>>());
        assert_eq!(calendar.len(), 7);
        assert_eq!(calendar.index_of(2004), Some(0));
        assert_eq!(calendar.index_of(2010), Some(6));
        assert_eq!(calendar.index_of(2011), None);
        assert_eq!(calendar.index_of(2003), None);
    }

    #[test]
    fn test_placeholder_isolate_is_skipped() {
        let isolates = ["NA", "2019_a", "2021_b"];
        let calendar = Calendar::from_isolates(3.0, isolates, DEFAULT_YEAR_RANK).unwrap();
        assert_eq!(calendar.most_current_year(), 2021);
        assert_eq!(calendar.root_year(), 2018);
    }

    #[test]
    fn test_last_isolate_rank() {
        let calendar = Calendar::from_isolates(0.5, ["2019_a", "2021_b"], 1).unwrap();
        assert_eq!(calendar.most_current_year(), 2021);
        assert_eq!(calendar.root_year(), 2020);
    }

    #[test]
    fn test_too_few_isolates() {
        let err = Calendar::from_isolates(1.0, ["2019_a", "2019_a"], DEFAULT_YEAR_RANK).unwrap_err();
        assert!(matches!(err, MigrationError::Calendar(_)));
        let err = Calendar::from_isolates(1.0, ["2019_a", "2020_b"], 0).unwrap_err();
        assert!(matches!(err, MigrationError::Calendar(_)));
    }

    #[test]
    fn test_unparseable_year() {
        let err = Calendar::from_isolates(1.0, ["x201_a", "zzz"], DEFAULT_YEAR_RANK).unwrap_err();
        assert!(matches!(err, MigrationError::Calendar(ref m) if m.contains("x201_a")));
    }
}
