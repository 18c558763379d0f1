//! Placement of each branch on the calendar and its location pair.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use itertools::iproduct;
use log::debug;

use crate::attributes::AttributeTable;
use crate::calendar::Calendar;
use crate::error::{MigrationError, Result};
use crate::tree::{NodeId, Tree};

/// Ordered set of discrete locations. Its square is the row space of the matrix.
#[derive(Debug, Clone)]
pub struct LocationSet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LocationSet {
    pub fn from_labels(labels: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(MigrationError::Parse(format!(
                    "location '{}' is listed more than once",
                    label
                )));
            }
        }
        Ok(LocationSet { labels, index })
    }

    /// Sorted distinct locations of the table.
    pub fn from_table(table: &AttributeTable) -> Self {
        let labels = table.locations();
        let index = labels.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        LocationSet { labels, index }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn index_of(&self, location: &str) -> Option<usize> {
        self.index.get(location).copied()
    }

    /// Row of the `from -> to` pair.
    pub fn pair_index(&self, from: &str, to: &str) -> Option<usize> {
        Some(self.index_of(from)? * self.len() + self.index_of(to)?)
    }

    /// All ordered pairs, self-pairs included, row by row.
    pub fn pair_labels(&self) -> Vec<String> {
        iproduct!(self.labels.iter(), self.labels.iter())
            .map(|(from, to)| pair_label(from, to))
            .collect()
    }
}

pub fn pair_label(from: &str, to: &str) -> String {
    format!("{}_to_{}", from, to)
}

/// Offsets, in whole years after the root year, of a branch's first and last year.
///
/// The end rounds both heights up while the start only floors the branch
/// length, so the interval can be one year longer or shorter than `length`.
pub fn interval_offsets(root_height: f64, height: f64, length: f64) -> (i64, i64) {
    let end = root_height.ceil() as i64 - height.ceil() as i64;
    let start = end - length.floor() as i64;
    (start, end)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub node: NodeId,
    pub pair: String,
    pub row: usize,
    pub start: i64,
    pub end: i64,
}

impl Placement {
    /// Years covered. Empty when `start > end` (negative branch lengths).
    pub fn years(&self) -> RangeInclusive<i64> {
        self.start..=self.end
    }

    pub fn n_years(&self) -> u64 {
        (self.end - self.start + 1).max(0) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

/// Place the branch leading into `node`, which must not be the root.
pub fn place_branch(
    tree: &Tree,
    node: NodeId,
    table: &AttributeTable,
    locations: &LocationSet,
    calendar: &Calendar,
) -> Result<Placement> {
    let label = tree.label(node);
    let attributes = tree
        .name(node)
        .and_then(|name| table.get(name))
        .ok_or_else(|| MigrationError::MissingAttribute(label.clone()))?;
    let height = attributes.height(&label)?;
    let length = attributes.length(&label)?;

    let parent_location = tree
        .parent(node)
        .and_then(|p| tree.name(p))
        .and_then(|name| table.get(name))
        .map(|a| a.location.as_str())
        .ok_or_else(|| MigrationError::MissingParentLocation(label.clone()))?;

    let row = locations
        .pair_index(parent_location, &attributes.location)
        .ok_or_else(|| MigrationError::UnknownLocation {
            node: label.clone(),
            parent: parent_location.to_string(),
            child: attributes.location.clone(),
        })?;

    let (start, end) = interval_offsets(calendar.root_height(), height, length);
    let placement = Placement {
        node,
        pair: pair_label(parent_location, &attributes.location),
        row,
        start: calendar.root_year() + start,
        end: calendar.root_year() + end,
    };
    debug!(
        "Branch into {} ({}): {}..={}",
        label, placement.pair, placement.start, placement.end
    );
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Tree, AttributeTable, Calendar) {
        let tree = Tree::from_newick("((X:1.0,Y:4.2)N1:1.0,Z:2.0)R;").unwrap();
        let table = AttributeTable::from_reader(
            "name,height,length,location,countryprob,isolate
R,5.2,NA,A,1,
N1,4.2,1.0,A,0.95,
X,1.0,2.3,B,0.8,2010_tipX
Y,0.0,4.2,C,0.7,2015_tipY
Z,3.2,2.0,A,0.6,
"
            .as_bytes(),
            b',',
        )
        .unwrap();
        let calendar = Calendar::new(tree.height(), 2010);
        (tree, table, calendar)
    }

    fn find(tree: &Tree, name: &str) -> NodeId {
        tree.descendants().find(|&id| tree.name(id) == Some(name)).unwrap()
    }

    #[test]
    fn test_interval_offsets() {
        assert_eq!(interval_offsets(5.2, 1.0, 2.3), (3, 5));
        assert_eq!(interval_offsets(5.2, 2.0, 0.4), (4, 4));
        assert_eq!(interval_offsets(5.2, 2.0, -1.5), (6, 4));
    }

    #[test]
    fn test_pair_rows() {
        let locations = LocationSet::from_labels(vec!["A".into(), "B".into(), "C".into()]).unwrap();
        assert_eq!(
            locations.pair_labels(),
            vec!["A_to_A", "A_to_B", "A_to_C", "B_to_A", "B_to_B", "B_to_C", "C_to_A", "C_to_B", "C_to_C"]
        );
        assert_eq!(locations.pair_index("B", "C"), Some(5));
        assert_eq!(locations.pair_index("B", "D"), None);
        assert!(LocationSet::from_labels(vec!["A".into(), "A".into()]).is_err());
    }

    #[test]
    fn test_place_branch() {
        let (tree, table, calendar) = fixture();
        let locations = LocationSet::from_table(&table);
        let x = find(&tree, "X");
        let placement = place_branch(&tree, x, &table, &locations, &calendar).unwrap();
        assert_eq!(placement.pair, "A_to_B");
        assert_eq!(placement.row, 1);
        assert_eq!((placement.start, placement.end), (2007, 2009));
        assert_eq!(placement.n_years(), 3);
    }

    #[test]
    fn test_root_without_row() {
        let (tree, _, calendar) = fixture();
        let table = AttributeTable::from_reader(
            "name,height,length,location,countryprob,isolate
N1,4.2,1.0,A,0.95,
Z,3.2,2.0,A,0.6,
"
            .as_bytes(),
            b',',
        )
        .unwrap();
        let locations = LocationSet::from_table(&table);
        let z = find(&tree, "Z");
        let err = place_branch(&tree, z, &table, &locations, &calendar).unwrap_err();
        assert!(matches!(err, MigrationError::MissingParentLocation(ref n) if n == "Z"));
    }

    #[test]
    fn test_unknown_location() {
        let (tree, table, calendar) = fixture();
        let locations = LocationSet::from_labels(vec!["A".into(), "C".into()]).unwrap();
        let x = find(&tree, "X");
        let err = place_branch(&tree, x, &table, &locations, &calendar).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UnknownLocation { ref node, ref parent, ref child }
                if node == "X" && parent == "A" && child == "B"
        ));
    }
}
