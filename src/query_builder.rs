use crate::object::PropValue;
use crate::query::QueryNode;
use crate::query::QueryNode::*;

/// A convenience class for creating [`QueryNode`] objects. This enum should be used by calling
/// methods on [`Q`], rather than by creating a new [`QueryBuilder`] yourself.
///
/// A [`QueryBuilder`] starts out empty. Each call to [`.id()`](QueryBuilder::id),
/// [`.equal()`](QueryBuilder::equal), [`.like()`](QueryBuilder::like), or
/// [`.contains()`](QueryBuilder::contains) will add a new criteria to the query. All these
/// criteria are then ANDed together.
pub enum QueryBuilder {
    #[doc(hidden)]
    Empty,
    #[doc(hidden)]
    Single(QueryNode),
    #[doc(hidden)]
    And(Vec<QueryNode>),
}

/// A blank [`QueryBuilder`] object, to be used instead of constructing new [`QueryBuilder`]
/// objects.
pub const Q: QueryBuilder = QueryBuilder::Empty;

impl QueryBuilder {
    fn add(self, node: QueryNode) -> Self {
        match self {
            QueryBuilder::Empty => QueryBuilder::Single(node),
            QueryBuilder::Single(prev_node) => QueryBuilder::And(vec![prev_node, node]),
            QueryBuilder::And(mut nodes) => {
                nodes.push(node);
                QueryBuilder::And(nodes)
            }
        }
    }

    /// Add the criteria that the object have the given ID.
    pub fn id(self, value: impl Into<i64>) -> Self {
        self.add(PropEqual {
            name: "object-id".into(),
            value: value.into().into(),
        })
    }

    /// Add the criteria that the given field has exactly the given value.
    pub fn equal(self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.add(PropEqual {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Add the criteria that the given field have contents matching the given value.
    ///
    /// See [`PropLike`] for the supported syntax.
    pub fn like(self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.add(PropLike {
            name: name.into(),
            pattern: pattern.into(),
        })
    }

    /// Add the criteria that the given field be a list containing the given string.
    pub fn contains(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(PropContains {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Consume this [`QueryBuilder`] and build a [`QueryNode`].
    pub fn build(self) -> QueryNode {
        match self {
            QueryBuilder::Single(node) => node,
            QueryBuilder::And(nodes) => And(nodes),
            QueryBuilder::Empty => Empty,
        }
    }
}

impl Into<QueryNode> for QueryBuilder {
    fn into(self) -> QueryNode {
        self.build()
    }
}
