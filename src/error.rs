//! Fatal errors. Content problems in the metadata are never errors; they are
//! reported as [`Diagnostic`](crate::models::Diagnostic)s on the model.

use thiserror::Error;

use crate::models::ElementId;

/// The input tree is structurally malformed; no model can be built from it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Root {0} does not exist in the source tree")]
    UnknownRoot(ElementId),

    #[error("Element {parent} lists child {child}, which does not exist")]
    UnknownElement { parent: ElementId, child: ElementId },

    #[error("Element {element} contains itself through its children")]
    ContainmentCycle { element: ElementId },

    #[error("Element {element} is nested under more than one parent")]
    SharedChild { element: ElementId },

    #[error("Element {element} names parent {found:?} but is nested under {expected:?}")]
    ParentMismatch {
        element: ElementId,
        expected: Option<ElementId>,
        found: Option<ElementId>,
    },
}

/// Writing an exported model failed at the sink. The model itself is untouched
/// and can be exported again.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write exported model: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Io(e.into())
    }
}
