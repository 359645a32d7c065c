//! Project executor.

use relvar_core::{Error, Header, Relation, RelationType, Result, Row};

/// The attributes to keep in a projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Keep exactly these attributes.
    Names(Vec<String>),
    /// Keep every attribute except these.
    AllBut(Vec<String>),
}

impl Projection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn all_but<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::AllBut(names.into_iter().map(Into::into).collect())
    }

    /// The complementary projection: `all_but(all_but(x))` keeps `x`.
    pub fn invert(self) -> Self {
        match self {
            Projection::Names(names) => Projection::AllBut(names),
            Projection::AllBut(names) => Projection::Names(names),
        }
    }

    /// Resolves the projection against `header` into the kept attribute
    /// names. Every named attribute must exist.
    pub fn resolve(&self, header: &Header) -> Result<Vec<String>> {
        match self {
            Projection::Names(names) => {
                header.require(names.iter().map(String::as_str))?;
                Ok(names.clone())
            }
            Projection::AllBut(names) => {
                header.require(names.iter().map(String::as_str))?;
                Ok(header
                    .names()
                    .filter(|n| !names.iter().any(|x| x == n))
                    .map(String::from)
                    .collect())
            }
        }
    }
}

impl<S: AsRef<str>> From<&[S]> for Projection {
    fn from(names: &[S]) -> Self {
        Projection::names(names.iter().map(|s| s.as_ref().to_string()))
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Projection {
    fn from(names: [S; N]) -> Self {
        Projection::names(names.iter().map(|s| s.as_ref().to_string()))
    }
}

impl<S: AsRef<str>, const N: usize> From<&[S; N]> for Projection {
    fn from(names: &[S; N]) -> Self {
        Projection::names(names.iter().map(|s| s.as_ref().to_string()))
    }
}

impl From<Vec<String>> for Projection {
    fn from(names: Vec<String>) -> Self {
        Projection::Names(names)
    }
}

impl From<Vec<&str>> for Projection {
    fn from(names: Vec<&str>) -> Self {
        Projection::names(names)
    }
}

/// Project executor - keeps a subset of attributes and drops the rows that
/// become equal.
pub struct ProjectExecutor {
    source: Header,
    result_type: RelationType,
    /// Source positions, in result header order.
    positions: Vec<usize>,
}

impl ProjectExecutor {
    /// Plans a projection of relations with header `source`.
    pub fn new(source: &Header, projection: &Projection) -> Result<Self> {
        let names = projection.resolve(source)?;
        let header = source.project(names.iter().map(String::as_str))?;
        let positions = header.names().filter_map(|n| source.index_of(n)).collect();
        Ok(Self {
            source: source.clone(),
            result_type: RelationType::new(header),
            positions,
        })
    }

    pub fn result_type(&self) -> &RelationType {
        &self.result_type
    }

    /// Executes the projection on the input relation.
    pub fn execute(&self, input: &Relation) -> Result<Relation> {
        if input.header() != &self.source {
            return Err(Error::relation_type_mismatch(
                "project",
                &self.source,
                input.header(),
            ));
        }
        let row_type = self.result_type.row_type();
        let rows = input
            .iter()
            .map(|row| {
                let values = row.values();
                Row::from_ordered(
                    row_type,
                    self.positions.iter().map(|&i| values[i].clone()).collect(),
                )
            })
            .collect::<Result<Vec<Row>>>()?;
        Relation::build(&self.result_type, rows)
    }
}

/// Restricts `relation` to the attributes selected by `projection`.
pub fn project(relation: &Relation, projection: impl Into<Projection>) -> Result<Relation> {
    ProjectExecutor::new(relation.header(), &projection.into())?.execute(relation)
}

/// Removes the named attributes from `relation`.
pub fn project_away<I, S>(relation: &Relation, names: I) -> Result<Relation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    project(relation, Projection::all_but(names))
}
