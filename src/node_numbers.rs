//! Numbering of internal nodes in a raw annotated tree.
//!
//! Tips of a translated tree are integers followed by their `[...]`
//! annotation. Every closing parenthesis gets the next free integer, in order
//! of appearance, so that internal nodes can be matched with attribute rows.

use regex::{Captures, Regex};

use crate::error::{MigrationError, Result};

pub fn insert_node_numbers(text: &str) -> Result<String> {
    let numbered = Regex::new(r"(\d+)\[").map_err(|e| MigrationError::Parse(e.to_string()))?;
    let mut highest: Option<u64> = None;
    for caps in numbered.captures_iter(text) {
        let value: u64 = caps[1]
            .parse()
            .map_err(|_| MigrationError::Parse(format!("node number '{}' is too large", &caps[1])))?;
        highest = highest.max(Some(value));
    }
    let highest = highest.ok_or_else(|| {
        MigrationError::Parse("no numbered nodes (digits followed by '[') in tree".to_string())
    })?;

    let closing = Regex::new(r"\)").map_err(|e| MigrationError::Parse(e.to_string()))?;
    let mut next = highest + 1;
    let labelled = closing.replace_all(text, |_: &Captures| {
        let label = format!("){}", next);
        next += 1;
        label
    });
    Ok(labelled.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_follow_highest_tip() {
        let text = "tree TREE1 = [&R] ((1[&state=\"A\"]:1.0,3[&state=\"B\"]:2.0)[&state=\"A\"]:1.0,2[&state=\"A\"]:0.5)[&state=\"A\"];";
        let out = insert_node_numbers(text).unwrap();
        assert_eq!(
            out,
            "tree TREE1 = [&R] ((1[&state=\"A\"]:1.0,3[&state=\"B\"]:2.0)4[&state=\"A\"]:1.0,2[&state=\"A\"]:0.5)5[&state=\"A\"];"
        );
    }

    #[test]
    fn test_no_numbered_nodes() {
        let err = insert_node_numbers("((A,B),C);").unwrap_err();
        assert!(matches!(err, MigrationError::Parse(_)));
    }
}
