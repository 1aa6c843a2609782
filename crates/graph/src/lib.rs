//! # Org Chart Graph
//!
//! Hierarchy resolution for records of an identity directory: given one
//! person or group, find its managers/owners, its direct reports and owned
//! groups, and its peers, then turn each of them into a display-ready node.
//!
//! ## Architecture
//!
//! ```text
//! record id
//!     │
//!     ├──> Descendant Resolver   (managed people + owned groups, one hop)
//!     ├──> Ancestor Resolver     (manager/owner climb, depth bound, cycle safe)
//!     ├──> Sibling Resolver      (parent's children, or the record alone)
//!     │
//!     └──> Tree Assembler
//!            ├─ Union + dedupe ids (children, ancestors, siblings)
//!            ├─ Resolve each id, skip and log failures
//!            └─ Node Enricher (person/group fields, counts, colors, icons)
//! ```
//!
//! The engine is synchronous and keeps no state between requests. The
//! directory, settings and connection rules are passed in explicitly.

mod ancestors;
mod assembler;
mod connections;
mod descendants;
mod details;
mod directory;
mod enricher;
mod error;
mod graph;
mod settings;
mod siblings;
mod types;

pub use ancestors::{resolve_ancestors, AncestorChain};
pub use assembler::{dedupe_ids, OrgTree, TreeAssembler};
pub use connections::{
    ConnectionOutcome, ConnectionResolver, ConnectionRule, RuleArgs, RuleEngine, StaticRule,
    StaticRuleEngine, LABEL_ARG, NO_RULE_MESSAGE,
};
pub use descendants::resolve_children;
pub use details::{DetailAttribute, Details, DetailsResolver};
pub use directory::{Directory, DirectorySnapshot, Filter, InMemoryDirectory};
pub use enricher::{member_names, NodeEnricher, ICON_ATTRIBUTE_KEY};
pub use error::{GraphError, Result};
pub use graph::ChartGraph;
pub use settings::{
    ColorCodes, OrgChartSettings, DEFAULT_COLOR_CODE, MAX_CARD_ATTRIBUTES,
};
pub use siblings::resolve_siblings;
pub use types::{
    Connection, Entitlement, GroupNode, Identity, Node, NodeBase, NodeKind, OwnedRole,
    PersonNode, PolicyViolation, RoleAssignment, RESERVED_NODE_KEYS, TYPE_NONE, TYPE_WORKGROUP,
};
