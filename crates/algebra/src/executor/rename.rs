//! Attribute renaming.

use relvar_core::{check_name, Error, Header, Relation, RelationType, Result, Row};

/// Renames attributes of `relation` by `(old, new)` pairs.
///
/// Every old name must exist; the renaming must not produce two attributes
/// with the same name. Renames apply simultaneously, so `a -> b, b -> a` swaps.
pub fn rename<I, O, N>(relation: &Relation, renames: I) -> Result<Relation>
where
    I: IntoIterator<Item = (O, N)>,
    O: AsRef<str>,
    N: Into<String>,
{
    let header = relation.header();
    let mut mapping: Vec<(String, String)> = Vec::new();
    for (old, new) in renames {
        let old = old.as_ref();
        let new = new.into();
        if !header.contains(old) {
            return Err(Error::unknown_attribute(old, header));
        }
        check_name(&new, false)?;
        if mapping.iter().any(|(_, n)| *n == new) {
            return Err(Error::DuplicateAttribute { name: new });
        }
        if mapping.iter().any(|(o, _)| o == old) {
            return Err(Error::DuplicateAttribute {
                name: old.to_string(),
            });
        }
        mapping.push((old.to_string(), new));
    }

    let renamed = |name: &str| -> String {
        mapping
            .iter()
            .find(|(o, _)| o == name)
            .map(|(_, n)| n.clone())
            .unwrap_or_else(|| name.to_string())
    };
    let result_header = Header::with_reserved(
        header
            .iter()
            .map(|(name, ty)| (renamed(name), ty.clone())),
    )?;

    // source position of each result attribute
    let sources: Vec<usize> = result_header
        .names()
        .filter_map(|new| {
            header
                .names()
                .position(|old| renamed(old) == new)
        })
        .collect();
    let result_type = RelationType::new(result_header);
    let row_type = result_type.row_type();

    let rows = relation
        .iter()
        .map(|row| {
            let values = row.values();
            Row::from_ordered(row_type, sources.iter().map(|&i| values[i].clone()).collect())
        })
        .collect::<Result<Vec<Row>>>()?;
    Relation::build(&result_type, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relvar_core::Value;

    fn parts() -> Relation {
        Relation::literal(vec![
            Row::literal([("pid", Value::from("P1")), ("qty", Value::Int64(10))]).unwrap(),
            Row::literal([("pid", Value::from("P2")), ("qty", Value::Int64(5))]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_rename() {
        let r = rename(&parts(), [("pid", "part")]).unwrap();
        assert_eq!(r.header().names().collect::<Vec<_>>(), vec!["part", "qty"]);
        assert!(r
            .iter()
            .any(|row| row.get("part").unwrap() == &Value::from("P1")));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_rename_swap() {
        let r = rename(&parts(), [("pid", "qty"), ("qty", "pid")]).unwrap();
        let row = r
            .iter()
            .find(|row| row.get("pid").unwrap() == &Value::Int64(10))
            .unwrap();
        assert_eq!(row.get("qty").unwrap(), &Value::from("P1"));
    }

    #[test]
    fn test_rename_round_trip() {
        let there = rename(&parts(), [("pid", "part")]).unwrap();
        let back = rename(&there, [("part", "pid")]).unwrap();
        assert_eq!(back, parts());
    }

    #[test]
    fn test_rename_errors() {
        let err = rename(&parts(), [("pid", "a"), ("qty", "a")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateAttribute { name } if name == "a"));

        let err = rename(&parts(), [("pid", "qty")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateAttribute { name } if name == "qty"));

        let err = rename(&parts(), [("weight", "w")]).unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute { .. }));

        assert!(rename(&parts(), [("pid", "_pid")]).is_err());
    }
}
