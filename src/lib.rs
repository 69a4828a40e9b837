//! Vellum - document model and change-tracking core for a rich-text editor
//!
//! This crate provides the tree of styled text runs ("leaves") grouped under
//! block containers ("nodes"), the chain/unchain/rechain mutation engine that
//! keeps the doubly-linked structure consistent under arbitrary edits, the
//! dirty-propagation queue that tells a view layer exactly which subtrees to
//! redraw, and the undo/redo history that reverses structural mutations
//! losslessly.
//!
//! Rendering itself is out of scope: a view layer subscribes through
//! [`ViewRegistry`] and is notified once per dirty entity when
//! [`EditorSession::render`] drains the queue.

pub mod chain;
pub mod dirty;
pub mod doc;
pub mod edit;
pub mod error;
pub mod history;
pub mod id;
pub mod leaf;
pub mod logging;
pub mod mutation;
pub mod node;
pub mod queue;
pub mod selection;
pub mod session;
pub mod style;
pub mod view;

// Re-export commonly used types
pub use chain::{LeafChain, LeafNullLink, NodeChain, NodeNullLink, PhantomChain, PhantomNode};
pub use dirty::{DirtyMark, DirtyState};
pub use doc::DocumentModel;
pub use edit::LeafStylePatch;
pub use error::{ModelError, Result};
pub use history::{ChildRef, History, RevOp};
pub use id::{EntityRef, IdAllocator, LeafId, NodeId};
pub use leaf::{Leaf, LeafKind, ZERO_LEAF_MARKER};
pub use mutation::SplitPoint;
pub use node::{FirstChild, Node, NodeType};
pub use queue::RenderQueue;
pub use selection::TextRange;
pub use session::EditorSession;
pub use style::{Alignment, LeafStyles, NodeStyles};
pub use view::{ViewHandle, ViewRegistry};
