//! Aggregate operators.
//!
//! [`compute`] lazily maps each row of a relation to a value; the folds in
//! this module consume such a sequence in a single pass without collecting
//! it first. Items are `Result`s so that an error raised while computing a
//! value stops the fold and is returned from it.

use relvar_core::{Error, Relation, Result, Row, Value};

/// Lazy sequence of one computed value per row, in no particular order.
pub struct Compute<'r, F> {
    rows: hashbrown::hash_set::Iter<'r, Row>,
    func: F,
}

impl<'r, F> Iterator for Compute<'r, F>
where
    F: Fn(&Row) -> Result<Value>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(&self.func)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// Computes `func` for every row of `relation`. Nothing is evaluated until
/// the sequence is consumed; calling `compute` again re-derives it.
pub fn compute<F>(relation: &Relation, func: F) -> Compute<'_, F>
where
    F: Fn(&Row) -> Result<Value>,
{
    Compute {
        rows: relation.into_iter(),
        func,
    }
}

fn numeric(value: &Value) -> Result<f64> {
    value.to_f64().ok_or_else(|| Error::NotNumeric {
        value: format!("{:?}", value),
    })
}

/// Arithmetic mean, accumulated incrementally. Fails on an empty sequence.
pub fn avg<I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let (total, count) = values
        .into_iter()
        .try_fold((0.0f64, 0u64), |(total, count), value| {
            Ok::<_, Error>((total + numeric(&value?)?, count + 1))
        })?;
    if count == 0 {
        return Err(Error::EmptyRelation { operation: "average" });
    }
    Ok(Value::Float64(total / count as f64))
}

/// Sum of a sequence. Integers sum to `Int64` (failing on overflow); any
/// `Float64` makes the sum `Float64`. The sum of nothing is `Int64(0)`.
pub fn sum<I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
{
    enum Acc {
        Int(i64),
        Float(f64),
    }
    let mut acc = Acc::Int(0);
    for value in values {
        let value = value?;
        acc = match (acc, value.base()) {
            (Acc::Int(total), Value::Int32(v)) => Acc::Int(checked(total, i64::from(*v))?),
            (Acc::Int(total), Value::Int64(v)) => Acc::Int(checked(total, *v)?),
            (Acc::Int(total), Value::Float64(v)) => Acc::Float(total as f64 + v),
            (Acc::Float(total), _) => Acc::Float(total + numeric(&value)?),
            (Acc::Int(_), _) => return Err(Error::NotNumeric { value: format!("{:?}", value) }),
        };
    }
    Ok(match acc {
        Acc::Int(total) => Value::Int64(total),
        Acc::Float(total) => Value::Float64(total),
    })
}

fn checked(total: i64, v: i64) -> Result<i64> {
    total
        .checked_add(v)
        .ok_or_else(|| Error::invalid_operation("integer overflow in sum"))
}

/// Number of values in a sequence, as `Int64`.
pub fn count<I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let mut n = 0i64;
    for value in values {
        value?;
        n += 1;
    }
    Ok(Value::Int64(n))
}

/// Largest value of a sequence. Fails on an empty sequence.
pub fn max<I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
{
    extreme(values, "max", |candidate, best| candidate > best)
}

/// Smallest value of a sequence. Fails on an empty sequence.
pub fn min<I>(values: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
{
    extreme(values, "min", |candidate, best| candidate < best)
}

fn extreme<I, F>(values: I, operation: &'static str, better: F) -> Result<Value>
where
    I: IntoIterator<Item = Result<Value>>,
    F: Fn(&Value, &Value) -> bool,
{
    let mut best: Option<Value> = None;
    for value in values {
        let value = value?;
        best = match best {
            Some(current) if !better(&value, &current) => Some(current),
            _ => Some(value),
        };
    }
    best.ok_or(Error::EmptyRelation { operation })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Result<Value>> {
        values.iter().map(|v| Ok(Value::Int64(*v))).collect()
    }

    fn parts() -> Relation {
        Relation::literal(vec![
            Row::literal([("pid", Value::from("P1")), ("qty", Value::Int64(10))]).unwrap(),
            Row::literal([("pid", Value::from("P2")), ("qty", Value::Int64(5))]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_compute_is_lazy_and_rederivable() {
        let r = parts();
        let calls = std::cell::Cell::new(0);
        let seq = compute(&r, |row| {
            calls.set(calls.get() + 1);
            row.get("qty").cloned()
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(seq.size_hint(), (2, Some(2)));
        let total = sum(seq).unwrap();
        assert_eq!(total, Value::Int64(15));
        assert_eq!(calls.get(), 2);

        let again = sum(compute(&r, |row| row.get("qty").cloned())).unwrap();
        assert_eq!(again, total);
    }

    #[test]
    fn test_avg() {
        assert_eq!(avg(ints(&[1, 2, 3, 6])).unwrap(), Value::Float64(3.0));
        assert!(matches!(
            avg(ints(&[])),
            Err(Error::EmptyRelation { operation: "average" })
        ));
        assert!(matches!(
            avg(vec![Ok(Value::from("x"))]),
            Err(Error::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_avg_stops_at_first_error() {
        let values = vec![Ok(Value::Int64(1)), Err(Error::invalid_operation("boom")), Ok(Value::Int64(3))];
        assert!(matches!(avg(values), Err(Error::InvalidOperation { .. })));
    }

    #[test]
    fn test_sum() {
        assert_eq!(sum(ints(&[])).unwrap(), Value::Int64(0));
        assert_eq!(sum(ints(&[1, 2])).unwrap(), Value::Int64(3));
        assert_eq!(
            sum(vec![Ok(Value::Int64(1)), Ok(Value::Float64(0.5))]).unwrap(),
            Value::Float64(1.5)
        );
        assert!(sum(ints(&[i64::MAX, 1])).is_err());
        assert!(sum(vec![Ok(Value::from("x"))]).is_err());
    }

    #[test]
    fn test_count_max_min() {
        assert_eq!(count(ints(&[4, 4, 4])).unwrap(), Value::Int64(3));
        assert_eq!(max(ints(&[3, 9, 1])).unwrap(), Value::Int64(9));
        assert_eq!(min(ints(&[3, 9, 1])).unwrap(), Value::Int64(1));
        assert!(max(ints(&[])).is_err());
        assert!(min(ints(&[])).is_err());
    }
}
