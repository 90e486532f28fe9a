//! The three set operators. Each is a pure strategy over the cursors' heads.

pub mod except;
pub mod intersect;
pub mod union;

use serde::{Deserialize, Serialize};

use crate::traits::SetOperator;

pub use except::Except;
pub use intersect::Intersect;
pub use union::Union;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Union,
    Intersect,
    Except,
}

impl OperatorKind {
    pub fn name(self) -> &'static str {
        match self {
            OperatorKind::Union => Union.name_static(),
            OperatorKind::Intersect => Intersect.name_static(),
            OperatorKind::Except => Except.name_static(),
        }
    }

    pub fn min_sources(self) -> usize {
        match self {
            OperatorKind::Union | OperatorKind::Intersect => 1,
            OperatorKind::Except => 2,
        }
    }

    pub fn into_operator<K>(self) -> Box<dyn SetOperator<K>> {
        match self {
            OperatorKind::Union => Box::new(Union),
            OperatorKind::Intersect => Box::new(Intersect),
            OperatorKind::Except => Box::new(Except),
        }
    }
}
