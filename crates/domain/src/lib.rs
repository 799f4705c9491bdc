//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod catalog;
mod change;
mod security;

pub use catalog::{
    Borrower, BorrowerInput, BorrowerPatch, CatalogEntity, Category, CategoryInput,
    CategoryPatch, Company, CompanyInput, CompanyPatch, Container, ContainerInput,
    ContainerPatch, EntityKind, Item, ItemInput, ItemPatch, Label, LabelInput, LabelPatch, Loan,
    LoanInput, LoanPatch, Location, LocationInput, LocationPatch, RecordMeta,
};
pub use change::{
    AlreadyReviewed, ChangeAction, ChangeReview, NewPendingChange, PendingChange,
    PendingChangeStatus, StoredPendingChange,
};
pub use security::{AuditAction, Permission, WorkspaceRole};
